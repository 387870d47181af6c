//! Provider descriptor data structures shared by all flows and the gateway.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant identifiers sent to the token endpoint.
pub mod grant;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use grant::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Lark authorization endpoint (browser redirect target).
pub const LARK_AUTHORIZATION_ENDPOINT: &str =
	"https://accounts.larksuite.com/open-apis/authen/v1/authorize";
/// Lark v2 token endpoint serving both the code and refresh grants.
pub const LARK_TOKEN_ENDPOINT: &str = "https://open.larksuite.com/open-apis/authen/v2/oauth/token";
/// Base URL that gateway paths are appended to.
pub const LARK_API_BASE: &str = "https://open.larksuite.com/open-apis";
/// Scopes requested by default; `offline_access` is required for a refresh token.
pub const LARK_DEFAULT_SCOPES: &str = "offline_access task:task:read";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoints {
	/// Authorization endpoint used by the Authorization Code flow.
	pub authorization: Url,
	/// Token endpoint used for exchanges and refreshes.
	pub token: Url,
	/// Base URL of the upstream API proxied by the gateway.
	pub api_base: Url,
}

/// Immutable provider descriptor consumed by flows and the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested on the authorize URL.
	pub scopes: ScopeSet,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new, empty builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Descriptor for the Lark Open Platform with the default task scopes.
	pub fn lark() -> Result<Self, ProviderDescriptorError> {
		Self::builder()
			.authorization_endpoint(LARK_AUTHORIZATION_ENDPOINT)
			.token_endpoint(LARK_TOKEN_ENDPOINT)
			.api_base(LARK_API_BASE)
			.scopes(LARK_DEFAULT_SCOPES)
			.build()
	}
}
