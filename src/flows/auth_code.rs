//! Browser-driven authorization-code flow that seeds the credential store.
//!
//! [`Broker::begin_authorization`] issues a one-time `state` nonce and the authorize URL;
//! [`Broker::complete_authorization`] validates the callback against that nonce and
//! exchanges the code. Only the most recent attempt is honored, and every callback
//! consumes the pending nonce whether it succeeds or not.

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::{Broker, CredentialStatus},
	http::UpstreamHttpClient,
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
	store::PendingAuthorization,
};

/// Progress of the most recent authorization attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationPhase {
	/// No attempt has been started.
	Idle,
	/// An authorize URL was issued and its callback has not arrived yet.
	AwaitingCallback,
	/// The last callback exchanged its code successfully.
	Completed,
	/// The last callback was rejected or its exchange failed.
	Failed,
}

/// Query parameters delivered to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizationCallback {
	/// Authorization code issued by upstream.
	#[serde(default)]
	pub code: Option<String>,
	/// State value echoed back by upstream.
	#[serde(default)]
	pub state: Option<String>,
	/// Error reported by upstream when the user or provider denied the request.
	#[serde(default)]
	pub error: Option<String>,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts an authorization attempt for `redirect_uri`.
	///
	/// Any earlier pending attempt is discarded, so its callback will be rejected.
	pub fn begin_authorization(&self, redirect_uri: &str) -> Result<AuthorizationSession> {
		let _guard = FlowSpan::new(FlowKind::AuthorizationCode, "begin_authorization").entered();

		Url::parse(redirect_uri).map_err(|source| ConfigError::InvalidRedirect { source })?;

		let session = session::build_session(
			&self.descriptor,
			&self.client_id,
			redirect_uri.to_owned(),
			self.clock.now(),
		);

		let mut phase = self.phase.lock();

		self.pending.install(session.pending());
		*phase = AuthorizationPhase::AwaitingCallback;

		drop(phase);

		#[cfg(feature = "tracing")]
		tracing::info!(redirect_uri, "authorization started");

		Ok(session)
	}

	/// Validates a callback and exchanges its code for the initial token pair.
	///
	/// Checks run in order: upstream `error`, missing `code`, then `state`. On success the
	/// store is replaced atomically; on any failure it is left untouched. A newer attempt
	/// started while the exchange was in flight keeps its `AwaitingCallback` phase.
	pub async fn complete_authorization(
		&self,
		callback: AuthorizationCallback,
	) -> Result<CredentialStatus> {
		let pending = self.pending.take();
		let result = FlowSpan::new(FlowKind::AuthorizationCode, "complete_authorization")
			.run(self.exchange_callback(pending, callback))
			.await;

		let mut phase = self.phase.lock();

		if !self.pending.is_pending() {
			*phase = match &result {
				Ok(_) => AuthorizationPhase::Completed,
				Err(_) => AuthorizationPhase::Failed,
			};
		}

		drop(phase);

		result.map(|_| self.status())
	}

	/// Returns the progress of the most recent authorization attempt.
	pub fn phase(&self) -> AuthorizationPhase {
		*self.phase.lock()
	}

	async fn exchange_callback(
		&self,
		pending: Option<PendingAuthorization>,
		callback: AuthorizationCallback,
	) -> Result<()> {
		if let Some(error) = callback.error.filter(|error| !error.is_empty()) {
			return Err(Error::UpstreamDenied { error });
		}

		let code = callback.code.filter(|code| !code.is_empty()).ok_or(Error::MissingCode)?;
		let returned_state = callback.state.unwrap_or_default();
		let pending = pending
			.filter(|pending| pending.state_matches(&returned_state))
			.ok_or(Error::StateMismatch)?;
		let grant = self
			.token_client
			.exchange_authorization_code(
				&code,
				&pending.redirect_uri,
				pending.pkce_verifier.as_deref(),
			)
			.await?;
		let record = grant.into_record(self.clock.now(), None)?;

		self.store.replace(record);

		#[cfg(feature = "tracing")]
		tracing::info!("authorization completed; credentials stored");

		Ok(())
	}
}
