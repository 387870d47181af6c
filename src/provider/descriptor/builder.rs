// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ScopeValidationError},
	provider::{ProviderDescriptor, ProviderEndpoints, ProviderQuirks},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required for Authorization Code flows.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for all flows.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base URL is required by the gateway.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// An endpoint could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidUrl {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Configured scopes are malformed.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// A refresh token is only issued when `offline_access` is requested.
	#[error("The `offline_access` scope is required to obtain a refresh token.")]
	MissingOfflineAccess,
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
	/// The fallback token lifetime must be positive.
	#[error("The default expires_in must be positive.")]
	NonPositiveDefaultExpiry,
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	authorization_endpoint: Option<String>,
	token_endpoint: Option<String>,
	api_base: Option<String>,
	scopes: Option<String>,
	quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: impl Into<String>) -> Self {
		self.authorization_endpoint = Some(url.into());

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
		self.token_endpoint = Some(url.into());

		self
	}

	/// Sets the base URL the gateway forwards to.
	pub fn api_base(mut self, url: impl Into<String>) -> Self {
		self.api_base = Some(url.into());

		self
	}

	/// Sets the whitespace-delimited scope list.
	pub fn scopes(mut self, scopes: impl Into<String>) -> Self {
		self.scopes = Some(scopes.into());

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Toggles PKCE without touching the other quirks.
	pub fn pkce(mut self, enabled: bool) -> Self {
		self.quirks.pkce = enabled;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = parse_endpoint(
			"authorization",
			self.authorization_endpoint
				.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?,
		)?;
		let token = parse_endpoint(
			"token",
			self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?,
		)?;
		let api_base =
			parse_endpoint("api", self.api_base.ok_or(ProviderDescriptorError::MissingApiBase)?)?;
		let scopes = ScopeSet::from_str(self.scopes.as_deref().unwrap_or_default())?;
		let descriptor = ProviderDescriptor {
			endpoints: ProviderEndpoints { authorization, token, api_base },
			scopes,
			quirks: self.quirks,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("api", &self.endpoints.api_base)?;

		if !self.scopes.contains("offline_access") {
			return Err(ProviderDescriptorError::MissingOfflineAccess);
		}
		if self.quirks.scope_delimiter.is_control() {
			return Err(ProviderDescriptorError::InvalidScopeDelimiter {
				delimiter: self.quirks.scope_delimiter,
			});
		}
		if !self.quirks.default_expires_in.is_positive() {
			return Err(ProviderDescriptorError::NonPositiveDefaultExpiry);
		}

		Ok(())
	}
}

fn parse_endpoint(name: &'static str, raw: String) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw.trim())
		.map_err(|source| ProviderDescriptorError::InvalidUrl { endpoint: name, source })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
