//! Process configuration read from flags and environment variables.

// std
use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	time::Duration as StdDuration,
};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::ReqwestBroker,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::{
		LARK_API_BASE, LARK_AUTHORIZATION_ENDPOINT, LARK_DEFAULT_SCOPES, LARK_TOKEN_ENDPOINT,
		ProviderDescriptor,
	},
	store::MemoryStore,
};

/// Broker settings. Every flag falls back to the environment variable of the same name.
#[derive(Clone, Parser)]
#[command(author, version, about, args_override_self = true)]
pub struct Config {
	/// Lark application id.
	#[arg(long, env = "LARK_APP_ID")]
	pub app_id: String,
	/// Lark application secret.
	#[arg(long, env = "LARK_APP_SECRET", hide_env_values = true)]
	pub app_secret: String,
	/// Shared secret downstream clients must present.
	#[arg(long, env = "API_KEY", hide_env_values = true)]
	pub api_key: String,
	/// Public origin of this broker; the redirect URI is `<BASE_URL>/callback`.
	///
	/// When unset the redirect URI is derived from each request's `Host` header.
	#[arg(long, env = "BASE_URL")]
	pub base_url: Option<String>,
	/// Refresh token to seed the store with at startup.
	#[arg(long, env = "LARK_REFRESH_TOKEN", hide_env_values = true)]
	pub refresh_token: Option<String>,
	/// Address to bind.
	#[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub host: IpAddr,
	/// Port to bind.
	#[arg(long, env = "PORT", default_value_t = 3000)]
	pub port: u16,
	/// Authorization endpoint override.
	#[arg(long, env = "LARK_AUTHORIZE_URL", default_value = LARK_AUTHORIZATION_ENDPOINT)]
	pub authorize_url: String,
	/// Token endpoint override.
	#[arg(long, env = "LARK_TOKEN_URL", default_value = LARK_TOKEN_ENDPOINT)]
	pub token_url: String,
	/// API base URL the gateway forwards to.
	#[arg(long, env = "LARK_API_BASE_URL", default_value = LARK_API_BASE)]
	pub api_base_url: String,
	/// Whitespace-separated scopes requested on the authorize URL.
	#[arg(long, env = "LARK_SCOPES", default_value = LARK_DEFAULT_SCOPES)]
	pub scopes: String,
	/// Adds an S256 PKCE challenge to authorization requests.
	#[arg(long, env = "LARK_PKCE")]
	pub pkce: bool,
	/// Seconds before expiry at which a cached access token is refreshed.
	#[arg(long, env = "REFRESH_MARGIN_SECS", default_value_t = 300)]
	pub refresh_margin_secs: u32,
	/// Upper bound for every upstream HTTP call, in seconds.
	#[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
	pub http_timeout_secs: u32,
}
impl Config {
	/// Checks settings that clap cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (name, value) in [
			("LARK_APP_ID", &self.app_id),
			("LARK_APP_SECRET", &self.app_secret),
			("API_KEY", &self.api_key),
		] {
			if value.trim().is_empty() {
				return Err(ConfigError::MissingSetting { name });
			}
		}
		if self.http_timeout_secs == 0 {
			return Err(ConfigError::MissingSetting { name: "HTTP_TIMEOUT_SECS" });
		}

		self.redirect_uri().transpose()?;
		self.descriptor()?;

		Ok(())
	}

	/// Provider descriptor assembled from the endpoint and scope settings.
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		Ok(ProviderDescriptor::builder()
			.authorization_endpoint(&self.authorize_url)
			.token_endpoint(&self.token_url)
			.api_base(&self.api_base_url)
			.scopes(&self.scopes)
			.pkce(self.pkce)
			.build()?)
	}

	/// Fixed redirect URI derived from `BASE_URL`, if configured.
	pub fn redirect_uri(&self) -> Option<Result<String, ConfigError>> {
		let base = self.base_url.as_deref().map(str::trim).filter(|base| !base.is_empty())?;
		let redirect = format!("{}/callback", base.trim_end_matches('/'));

		Some(
			Url::parse(&redirect)
				.map(|_| redirect)
				.map_err(|source| ConfigError::InvalidRedirect { source }),
		)
	}

	/// Socket address the server binds to.
	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	/// Builds the broker, seeding the refresh token when one is configured.
	pub fn build_broker(&self) -> Result<ReqwestBroker> {
		self.validate()?;

		let http_client =
			ReqwestHttpClient::with_timeout(StdDuration::from_secs(self.http_timeout_secs.into()))?;
		let broker = ReqwestBroker::with_http_client(
			Arc::new(MemoryStore::default()),
			self.descriptor()?,
			self.app_id.trim(),
			self.app_secret.trim(),
			http_client,
			ReqwestTransportErrorMapper,
		)
		.with_refresh_margin(Duration::seconds(self.refresh_margin_secs.into()));

		if let Some(refresh_token) =
			self.refresh_token.as_deref().map(str::trim).filter(|token| !token.is_empty())
		{
			broker.seed_refresh_token(refresh_token);

			#[cfg(feature = "tracing")]
			tracing::info!("credential store seeded from configured refresh token");
		}

		Ok(broker)
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("app_id", &self.app_id)
			.field("base_url", &self.base_url)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("host", &self.host)
			.field("port", &self.port)
			.field("authorize_url", &self.authorize_url)
			.field("token_url", &self.token_url)
			.field("api_base_url", &self.api_base_url)
			.field("scopes", &self.scopes)
			.field("pkce", &self.pkce)
			.field("refresh_margin_secs", &self.refresh_margin_secs)
			.field("http_timeout_secs", &self.http_timeout_secs)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(args: &[&str]) -> Config {
		let base =
			["lark-token-broker", "--app-id", "cli_a9e172", "--app-secret", "s", "--api-key", "k"];

		Config::try_parse_from(base.iter().chain(args)).expect("Test arguments should parse.")
	}

	#[test]
	fn defaults_target_lark() {
		let config = parse(&["--host", "0.0.0.0", "--port", "3000"]);

		assert_eq!(config.refresh_margin_secs, 300);
		assert_eq!(config.token_url, LARK_TOKEN_ENDPOINT);
		assert!(!config.pkce);
		assert!(config.redirect_uri().is_none());
		assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
		assert!(config.validate().is_ok());
	}

	#[test]
	fn base_url_fixes_the_redirect_uri() {
		let config = parse(&["--base-url", "https://broker.example.com/"]);
		let redirect = config
			.redirect_uri()
			.expect("BASE_URL should yield a redirect URI.")
			.expect("BASE_URL should parse.");

		assert_eq!(redirect, "https://broker.example.com/callback");

		let config = parse(&["--base-url", "not a url"]);

		assert!(matches!(config.validate(), Err(ConfigError::InvalidRedirect { .. })));
	}

	#[test]
	fn blank_secrets_and_insecure_endpoints_are_rejected() {
		let config = parse(&["--api-key", " "]);

		assert!(matches!(config.validate(), Err(ConfigError::MissingSetting { name: "API_KEY" })));

		let config = parse(&["--token-url", "http://open.larksuite.com/token"]);

		assert!(matches!(config.validate(), Err(ConfigError::InvalidDescriptor(_))));
	}

	#[test]
	fn configured_refresh_token_seeds_the_store() {
		let broker = parse(&["--refresh-token", "u-seed", "--refresh-margin-secs", "120"])
			.build_broker()
			.expect("Broker should build from valid settings.");

		assert!(broker.status().authorized);
		assert_eq!(broker.refresh_margin, Duration::seconds(120));
	}
}
