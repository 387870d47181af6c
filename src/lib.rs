//! OAuth 2.0 authorization-code broker and token-refresh proxy for the Lark Open Platform.
//!
//! A [`flows::Broker`] owns one application's credentials: it runs the browser-driven
//! authorization-code flow, keeps the resulting token pair in a [`store::CredentialStore`],
//! refreshes access tokens single-flight before they expire, and backs the
//! [`gateway::ApiGateway`] that relays authenticated calls upstream. The `server` feature
//! wraps all of it in an axum HTTP surface gated by a shared API key.

#![deny(clippy::all, missing_docs)]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod auth;
pub mod clock;
#[cfg(feature = "server")] pub mod config;
pub mod error;
pub mod flows;
pub mod gateway;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(feature = "server")] pub mod server;
pub mod store;

#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or
	//! the `test` feature, which the crate's own dev-dependency turns on.

	pub use crate::_prelude::*;

	// self
	use crate::{
		clock::ManualClock,
		error::ConfigError,
		flows::ReqwestBroker,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::{LARK_DEFAULT_SCOPES, ProviderDescriptor},
		store::{CredentialStore, MemoryStore},
	};

	/// Application id used by the fixtures.
	pub const TEST_APP_ID: &str = "cli_a9e17200000000";
	/// Application secret used by the fixtures.
	pub const TEST_APP_SECRET: &str = "test-app-secret";
	/// Token endpoint path served by the mock provider.
	pub const MOCK_TOKEN_PATH: &str = "/open-apis/authen/v2/oauth/token";
	/// Authorization endpoint path on the mock provider.
	pub const MOCK_AUTHORIZE_PATH: &str = "/open-apis/authen/v1/authorize";
	/// API base path on the mock provider.
	pub const MOCK_API_PATH: &str = "/open-apis";

	/// Broker plus handles onto its store and clock.
	pub struct TestBroker {
		/// Broker under test.
		pub broker: Arc<ReqwestBroker>,
		/// Store backing the broker.
		pub store: Arc<MemoryStore>,
		/// Clock driving every expiry decision.
		pub clock: ManualClock,
	}

	/// Builds a reqwest client that accepts the self-signed certificates produced by
	/// `httpmock`.
	pub fn test_reqwest_http_client() -> Result<ReqwestHttpClient> {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(ReqwestHttpClient::with_client(client))
	}

	/// Descriptor whose endpoints all point at the mock server reachable at `base_url`.
	///
	/// The scheme is forced to `https` because descriptors reject plain HTTP.
	pub fn mock_descriptor(base_url: &str, pkce: bool) -> Result<ProviderDescriptor> {
		let base = base_url.trim_end_matches('/').replacen("http://", "https://", 1);

		Ok(ProviderDescriptor::builder()
			.authorization_endpoint(format!("{base}{MOCK_AUTHORIZE_PATH}"))
			.token_endpoint(format!("{base}{MOCK_TOKEN_PATH}"))
			.api_base(format!("{base}{MOCK_API_PATH}"))
			.scopes(LARK_DEFAULT_SCOPES)
			.pkce(pkce)
			.build()
			.map_err(ConfigError::from)?)
	}

	/// Builds a broker over an empty in-memory store and a manual clock set to `start`.
	pub fn build_test_broker(
		descriptor: ProviderDescriptor,
		start: OffsetDateTime,
	) -> Result<TestBroker> {
		let store = Arc::new(MemoryStore::default());
		let clock = ManualClock::new(start);
		let broker = ReqwestBroker::with_http_client(
			store.clone() as Arc<dyn CredentialStore>,
			descriptor,
			TEST_APP_ID,
			TEST_APP_SECRET,
			test_reqwest_http_client()?,
			ReqwestTransportErrorMapper,
		)
		.with_clock(Arc::new(clock.clone()));

		Ok(TestBroker { broker: Arc::new(broker), store, clock })
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(feature = "server")] use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
