//! Broker-level error types shared across flows, the gateway, and the HTTP surface.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// The type is `Clone` so a single in-flight refresh can hand the same failure to every
/// waiter; underlying sources are shared behind [`Arc`].
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout). Transient; callers may retry later.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The store holds no refresh token; a human must authorize the broker.
	#[error("No refresh token is available; authorization is required.")]
	NoRefreshToken,
	/// Upstream rejected the refresh-token grant.
	#[error("Token refresh was rejected: {reason}.")]
	RefreshFailed {
		/// Upstream- or broker-supplied reason string.
		reason: String,
	},
	/// Upstream rejected the authorization-code grant.
	#[error("Authorization code exchange was rejected: {reason}.")]
	ExchangeFailed {
		/// Upstream- or broker-supplied reason string.
		reason: String,
	},
	/// The callback `state` did not match the pending authorization nonce.
	#[error("Authorization state does not match the pending request.")]
	StateMismatch,
	/// The callback carried neither an error nor an authorization code.
	#[error("Authorization callback is missing the code parameter.")]
	MissingCode,
	/// The user or upstream denied the authorization request.
	#[error("Authorization was denied upstream: {error}.")]
	UpstreamDenied {
		/// Upstream `error` parameter.
		error: String,
	},
	/// The caller's shared secret is missing or invalid.
	#[error("Caller is not authorized.")]
	Unauthorized,
	/// The gateway refused to forward a request path.
	#[error("API path `{path}` is not allowed.")]
	InvalidApiPath {
		/// Path supplied by the caller.
		path: String,
	},
}
impl Error {
	/// Returns `true` when a human must restart the authorization flow before tokens can be
	/// obtained again.
	pub fn need_reauth(&self) -> bool {
		matches!(self, Self::NoRefreshToken | Self::RefreshFailed { .. })
	}

	/// Returns `true` for failures that may succeed when retried later.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	/// Stable, machine-readable reason code.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Config(_) => "config_error",
			Self::Transport(_) => "transport_error",
			Self::NoRefreshToken => "no_refresh_token",
			Self::RefreshFailed { .. } => "refresh_failed",
			Self::ExchangeFailed { .. } => "exchange_failed",
			Self::StateMismatch => "state_mismatch",
			Self::MissingCode => "missing_code",
			Self::UpstreamDenied { .. } => "upstream_denied",
			Self::Unauthorized => "unauthorized",
			Self::InvalidApiPath { .. } => "invalid_api_path",
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying request builder failure.
		#[source]
		source: Arc<oauth2::http::Error>,
	},
	/// Token request body could not be encoded.
	#[error("Token request body could not be encoded.")]
	RequestEncode {
		/// Underlying serialization failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
	/// Descriptor contains an invalid URL.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Requested scopes cannot be normalized.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build credential record.")]
	CredentialBuild(#[from] crate::auth::CredentialRecordBuilderError),
	/// A required setting is empty.
	#[error("Setting `{name}` must not be empty.")]
	MissingSetting {
		/// Setting name (environment variable or flag).
		name: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		Self::RequestEncode { source: Arc::new(e) }
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Upstream endpoint label (`token` or `api`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Upstream endpoint label (`token` or `api`).
		endpoint: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the {endpoint} endpoint.")]
	Io {
		/// Upstream endpoint label (`token` or `api`).
		endpoint: &'static str,
		/// Underlying IO failure.
		#[source]
		source: Arc<std::io::Error>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { endpoint, source: Arc::new(src) }
	}

	/// Wraps an IO failure raised while calling `endpoint`.
	pub fn io(endpoint: &'static str, e: std::io::Error) -> Self {
		Self::Io { endpoint, source: Arc::new(e) }
	}

	/// Upstream endpoint label the failure is tied to.
	pub fn endpoint(&self) -> &'static str {
		match self {
			Self::Network { endpoint, .. }
			| Self::Timeout { endpoint }
			| Self::Io { endpoint, .. } => endpoint,
		}
	}

	/// Classifies a reqwest failure, separating timeouts from other network errors.
	pub fn from_reqwest(endpoint: &'static str, e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { endpoint } } else { Self::network(endpoint, e) }
	}
}
#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn reauth_classification_matches_taxonomy() {
		assert!(Error::NoRefreshToken.need_reauth());
		assert!(Error::RefreshFailed { reason: "expired".into() }.need_reauth());
		assert!(!Error::from(TransportError::Timeout { endpoint: "token" }).need_reauth());
		assert!(Error::from(TransportError::Timeout { endpoint: "token" }).is_transient());
		assert!(!Error::StateMismatch.need_reauth());
		assert!(!Error::Unauthorized.need_reauth());
	}

	#[test]
	fn codes_are_stable_snake_case() {
		assert_eq!(Error::NoRefreshToken.code(), "no_refresh_token");
		assert_eq!(Error::RefreshFailed { reason: String::new() }.code(), "refresh_failed");
		assert_eq!(
			Error::UpstreamDenied { error: "access_denied".into() }.code(),
			"upstream_denied"
		);
		assert_eq!(Error::InvalidApiPath { path: "../x".into() }.code(), "invalid_api_path");
	}

	#[test]
	fn cloned_transport_error_keeps_source() {
		let io = std::io::Error::other("connection reset");
		let err = Error::from(TransportError::io("token", io));
		let cloned = err.clone();
		let source = StdError::source(&cloned).expect("Cloned error should expose its source.");

		assert!(source.to_string().contains("connection reset"));
		assert_eq!(err.to_string(), cloned.to_string());
		assert!(matches!(cloned, Error::Transport(ref e) if e.endpoint() == "token"));
	}
}
