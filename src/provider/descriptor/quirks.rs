// self
use crate::_prelude::*;

/// Provider-specific quirks that influence how flows behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderQuirks {
	/// Adds an S256 PKCE challenge to the authorize URL and the verifier to the code exchange.
	pub pkce: bool,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
	/// Access-token lifetime assumed when the token endpoint omits `expires_in`.
	pub default_expires_in: Duration,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { pkce: false, scope_delimiter: ' ', default_expires_in: Duration::seconds(7200) }
	}
}
