//! Transport primitives for token-endpoint and gateway calls.
//!
//! [`UpstreamHttpClient`] is the broker's only dependency on an HTTP stack. Both the token
//! grants and the gateway pass-through build plain [`HttpRequest`] values and dispatch
//! them through the [`AsyncHttpClient`] handle the transport hands out, so tests can swap
//! in a scripted transport without touching reqwest.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Upper bound applied to every upstream call unless configured otherwise.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Abstraction over HTTP transports capable of executing upstream calls.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared behind [`Arc`]
/// across request handlers, and the handles they return must own whatever state the
/// request future needs so that future stays `Send` for the lifetime of the call.
pub trait UpstreamHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single upstream call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle that dispatches requests on this transport.
	fn handle(&self) -> Self::Handle;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are never followed: token endpoints answer directly, and the gateway hands
/// upstream responses back verbatim. Every request is bounded by the client timeout.
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// The caller is responsible for configuring a timeout and disabling redirects.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client bounded by `timeout` that does not follow redirects.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Builds a client using [`DEFAULT_TIMEOUT`].
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_timeout(DEFAULT_TIMEOUT)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl UpstreamHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		InstrumentedHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`]; logs status and latency of each call.
#[derive(Clone)]
pub struct InstrumentedHandle(ReqwestClient);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			#[cfg(feature = "tracing")]
			let (method, host, started) = (
				request.method().clone(),
				request.uri().host().unwrap_or_default().to_owned(),
				std::time::Instant::now(),
			);
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			#[cfg(feature = "tracing")]
			tracing::debug!(
				%method,
				host,
				status = status.as_u16(),
				elapsed_ms = started.elapsed().as_millis() as u64,
				"upstream call completed"
			);

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builds_bounded_client() {
		let client = ReqwestHttpClient::with_timeout(StdDuration::from_secs(5));

		assert!(client.is_ok());
		assert!(ReqwestHttpClient::new().is_ok());
	}
}
