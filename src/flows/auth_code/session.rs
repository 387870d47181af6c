// self
use crate::{
	_prelude::*,
	flows::common,
	provider::ProviderDescriptor,
	store::PendingAuthorization,
};

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Authorization handshake metadata returned by [`Broker::begin_authorization`].
///
/// [`Broker::begin_authorization`]: crate::flows::Broker::begin_authorization
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the callback.
	pub state: String,
	/// Redirect URI embedded in the authorize URL.
	pub redirect_uri: String,
	/// Fully-formed authorize URL the end user should be sent to.
	pub authorize_url: Url,
	/// Instant the session was created.
	pub issued_at: OffsetDateTime,
	pkce: Option<PkcePair>,
}
impl AuthorizationSession {
	/// PKCE code challenge, when PKCE is enabled for the provider.
	pub fn code_challenge(&self) -> Option<&str> {
		self.pkce.as_ref().map(|pair| pair.challenge.as_str())
	}

	/// PKCE challenge method, when PKCE is enabled for the provider.
	pub fn code_challenge_method(&self) -> Option<PkceCodeChallengeMethod> {
		self.pkce.as_ref().map(|pair| pair.method)
	}

	pub(super) fn pending(&self) -> PendingAuthorization {
		PendingAuthorization {
			state: self.state.clone(),
			redirect_uri: self.redirect_uri.clone(),
			pkce_verifier: self.pkce.as_ref().map(|pair| pair.verifier.clone()),
			issued_at: self.issued_at,
		}
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("issued_at", &self.issued_at)
			.field("code_challenge", &self.code_challenge())
			.finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = common::random_string(common::PKCE_VERIFIER_LEN);
		let challenge = common::compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(super) fn build_session(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: String,
	issued_at: OffsetDateTime,
) -> AuthorizationSession {
	let state = common::random_string(common::STATE_LEN);
	let pkce = descriptor.quirks.pkce.then(PkcePair::generate);
	let authorize_url =
		build_authorize_url(descriptor, client_id, &redirect_uri, &state, pkce.as_ref());

	AuthorizationSession { state, redirect_uri, authorize_url, issued_at, pkce }
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &str,
	state: &str,
	pkce: Option<&PkcePair>,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri);
	pairs.append_pair("response_type", "code");

	if let Some(scope_value) = descriptor.scopes.join(descriptor.quirks.scope_delimiter) {
		pairs.append_pair("scope", &scope_value);
	}

	pairs.append_pair("state", state);

	if let Some(pkce) = pkce {
		pairs.append_pair("code_challenge", &pkce.challenge);
		pairs.append_pair("code_challenge_method", pkce.method.as_str());
	}

	drop(pairs);

	url
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const REDIRECT: &str = "https://broker.example.com/callback";

	fn query(url: &Url) -> HashMap<String, String> {
		url.query_pairs().into_owned().collect()
	}

	#[test]
	fn authorize_url_carries_standard_parameters() {
		let descriptor = ProviderDescriptor::lark().expect("Lark preset should validate.");
		let session = build_session(
			&descriptor,
			"cli_test",
			REDIRECT.into(),
			macros::datetime!(2025-01-01 00:00 UTC),
		);
		let params = query(&session.authorize_url);

		assert_eq!(session.authorize_url.path(), "/open-apis/authen/v1/authorize");
		assert_eq!(params["client_id"], "cli_test");
		assert_eq!(params["redirect_uri"], REDIRECT);
		assert_eq!(params["response_type"], "code");
		assert_eq!(params["scope"], "offline_access task:task:read");
		assert_eq!(params["state"], session.state);
		assert_eq!(session.state.len(), common::STATE_LEN);
		assert!(!params.contains_key("code_challenge"));
		assert!(session.pending().pkce_verifier.is_none());
	}

	#[test]
	fn pkce_quirk_adds_challenge_and_keeps_verifier_pending() {
		let descriptor = ProviderDescriptor::builder()
			.authorization_endpoint("https://auth.example.com/authorize")
			.token_endpoint("https://api.example.com/token")
			.api_base("https://api.example.com")
			.scopes("offline_access")
			.pkce(true)
			.build()
			.expect("PKCE descriptor should build.");
		let session = build_session(
			&descriptor,
			"cli_test",
			REDIRECT.into(),
			macros::datetime!(2025-01-01 00:00 UTC),
		);
		let params = query(&session.authorize_url);
		let pending = session.pending();
		let verifier = pending.pkce_verifier.clone().expect("Verifier should be kept for the exchange.");

		assert_eq!(params["code_challenge_method"], "S256");
		assert_eq!(params["code_challenge"], common::compute_pkce_challenge(&verifier));
		assert_eq!(session.code_challenge_method(), Some(PkceCodeChallengeMethod::S256));
		assert!(pending.state_matches(&session.state));
	}
}
