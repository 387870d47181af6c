//! Token endpoint client shared by the authorization-code and refresh-token grants.
//!
//! Lark's v2 token endpoint takes a JSON body and answers with a flat JSON document. A
//! response is accepted when the HTTP status is 2xx and it carries a non-empty
//! `access_token`; the vendor `code` field only contributes to the rejection reason.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{Method, StatusCode, header},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, TokenSecret},
	error::{ConfigError, TransportError},
	http::{ReqwestHttpClient, UpstreamHttpClient},
	provider::{GrantType, ProviderDescriptor},
};

/// Endpoint label attached to token-endpoint transport failures.
pub const TOKEN_ENDPOINT: &str = "token";
/// Endpoint label attached to gateway transport failures.
pub const API_ENDPOINT: &str = "api";

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	fn map_transport_error(&self, endpoint: &'static str, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::io(endpoint, inner).into(),
			HttpClientError::Other(message) =>
				TransportError::io(endpoint, std::io::Error::other(message)).into(),
			_ => TransportError::io(endpoint, std::io::Error::other("unknown HTTP client failure"))
				.into(),
		}
	}
}

#[derive(Serialize)]
struct TokenRequest<'a> {
	grant_type: &'static str,
	client_id: &'a str,
	client_secret: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	code: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	redirect_uri: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	code_verifier: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	refresh_token: Option<&'a str>,
}
impl<'a> TokenRequest<'a> {
	fn new(grant: GrantType, client_id: &'a str, client_secret: &'a str) -> Self {
		Self {
			grant_type: grant.as_str(),
			client_id,
			client_secret,
			code: None,
			redirect_uri: None,
			code_verifier: None,
			refresh_token: None,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
struct TokenEndpointResponse {
	#[serde(default)]
	code: Option<serde_json::Value>,
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	refresh_token_expires_in: Option<i64>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
	#[serde(default)]
	msg: Option<String>,
}
impl TokenEndpointResponse {
	fn rejection_reason(&self, status: StatusCode) -> String {
		let described = [&self.error_description, &self.msg, &self.error]
			.into_iter()
			.flatten()
			.find(|value| !value.trim().is_empty());

		if let Some(description) = described {
			return description.trim().to_owned();
		}

		match &self.code {
			Some(code) if !is_zero_code(code) => format!("upstream code {code}"),
			_ if !status.is_success() =>
				format!("token endpoint returned HTTP {}", status.as_u16()),
			_ => "token response did not contain an access token".into(),
		}
	}
}

/// Successful token endpoint payload, normalized.
#[derive(Debug)]
pub(crate) struct TokenGrant {
	access_token: String,
	refresh_token: Option<String>,
	expires_in: Duration,
	refresh_expires_in: Option<Duration>,
}
impl TokenGrant {
	/// Converts the grant into a record stamped at `now`.
	///
	/// When upstream omits a new refresh token, `previous_refresh` is carried over.
	pub(crate) fn into_record(
		self,
		now: OffsetDateTime,
		previous_refresh: Option<&TokenSecret>,
	) -> Result<CredentialRecord> {
		let mut builder = CredentialRecord::builder()
			.access_token(self.access_token)
			.updated_at(now)
			.expires_in(self.expires_in);

		if let Some(refresh) = self
			.refresh_token
			.filter(|value| !value.is_empty())
			.or_else(|| previous_refresh.map(|secret| secret.expose().to_owned()))
		{
			builder = builder.refresh_token(refresh);
		}
		if let Some(delta) = self.refresh_expires_in {
			builder = builder.refresh_expires_in(delta);
		}

		builder.build().map_err(|e| ConfigError::from(e).into())
	}
}

/// Issues token grants against the provider's token endpoint.
pub(crate) struct TokenEndpointClient<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	token_url: Url,
	client_id: String,
	client_secret: TokenSecret,
	default_expires_in: Duration,
}
impl<C, M> TokenEndpointClient<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: TokenSecret,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Self {
		Self {
			http_client,
			error_mapper,
			token_url: descriptor.endpoints.token.clone(),
			client_id: client_id.into(),
			client_secret,
			default_expires_in: descriptor.quirks.default_expires_in,
		}
	}

	/// Exchanges an authorization code for the initial token pair.
	pub(crate) async fn exchange_authorization_code(
		&self,
		code: &str,
		redirect_uri: &str,
		pkce_verifier: Option<&str>,
	) -> Result<TokenGrant> {
		let mut body = TokenRequest::new(
			GrantType::AuthorizationCode,
			&self.client_id,
			self.client_secret.expose(),
		);

		body.code = Some(code);
		body.redirect_uri = Some(redirect_uri);
		body.code_verifier = pkce_verifier;

		self.request(GrantType::AuthorizationCode, &body).await
	}

	/// Redeems a refresh token for a new token pair.
	pub(crate) async fn refresh_token(&self, refresh_token: &TokenSecret) -> Result<TokenGrant> {
		let client_secret = self.client_secret.expose();
		let mut body = TokenRequest::new(GrantType::RefreshToken, &self.client_id, client_secret);

		body.refresh_token = Some(refresh_token.expose());

		self.request(GrantType::RefreshToken, &body).await
	}

	fn build_request(&self, body: &TokenRequest<'_>) -> Result<HttpRequest> {
		let payload = serde_json::to_vec(body).map_err(ConfigError::from)?;
		let request = oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(self.token_url.as_str())
			.header(header::CONTENT_TYPE, "application/json; charset=utf-8")
			.header(header::ACCEPT, "application/json")
			.body(payload)
			.map_err(ConfigError::from)?;

		Ok(request)
	}

	async fn request(&self, grant: GrantType, body: &TokenRequest<'_>) -> Result<TokenGrant> {
		let request = self.build_request(body)?;
		let handle = self.http_client.handle();
		let response = handle
			.call(request)
			.await
			.map_err(|e| self.error_mapper.map_transport_error(TOKEN_ENDPOINT, e))?;

		parse_token_response(grant, &response, self.default_expires_in)
	}
}

fn parse_token_response(
	grant: GrantType,
	response: &HttpResponse,
	default_expires_in: Duration,
) -> Result<TokenGrant> {
	let status = response.status();
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let parsed: TokenEndpointResponse = match serde_path_to_error::deserialize(&mut deserializer)
	{
		Ok(parsed) => parsed,
		Err(e) if status.is_success() => {
			let reason = format!("malformed token response at `{}`: {}", e.path(), e.inner());

			return Err(rejected(grant, reason));
		},
		Err(_) => {
			let reason = format!("token endpoint returned HTTP {}", status.as_u16());

			return Err(rejected(grant, reason));
		},
	};

	if !status.is_success() {
		return Err(rejected(grant, parsed.rejection_reason(status)));
	}

	let reason = parsed.rejection_reason(status);
	let Some(access_token) = parsed.access_token.filter(|token| !token.is_empty()) else {
		return Err(rejected(grant, reason));
	};
	let expires_in = parsed
		.expires_in
		.filter(|seconds| *seconds > 0)
		.map(Duration::seconds)
		.unwrap_or(default_expires_in);

	Ok(TokenGrant {
		access_token,
		refresh_token: parsed.refresh_token,
		expires_in,
		refresh_expires_in: parsed
			.refresh_token_expires_in
			.filter(|seconds| *seconds > 0)
			.map(Duration::seconds),
	})
}

fn rejected(grant: GrantType, reason: String) -> Error {
	match grant {
		GrantType::AuthorizationCode => Error::ExchangeFailed { reason },
		GrantType::RefreshToken => Error::RefreshFailed { reason },
	}
}

fn is_zero_code(code: &serde_json::Value) -> bool {
	match code {
		serde_json::Value::Number(n) => n.as_i64() == Some(0),
		serde_json::Value::String(s) => s == "0",
		_ => false,
	}
}

fn map_reqwest_error(endpoint: &'static str, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::from_reqwest(endpoint, err).into()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const DEFAULT_EXPIRY: Duration = Duration::seconds(7200);

	fn response(status: u16, body: &str) -> HttpResponse {
		oauth2::http::Response::builder()
			.status(status)
			.body(body.as_bytes().to_vec())
			.expect("Test response should build.")
	}

	#[test]
	fn success_ignores_vendor_code_when_access_token_is_present() {
		let grant = parse_token_response(
			GrantType::RefreshToken,
			&response(200, r#"{"code":20064,"access_token":"A2","expires_in":7200}"#),
			DEFAULT_EXPIRY,
		)
		.expect("A 2xx response with an access token is a success.");

		assert_eq!(grant.access_token, "A2");
		assert_eq!(grant.expires_in, Duration::seconds(7200));
		assert!(grant.refresh_token.is_none());
	}

	#[test]
	fn missing_or_non_positive_expiry_falls_back_to_default() {
		for body in [r#"{"access_token":"A"}"#, r#"{"access_token":"A","expires_in":0}"#] {
			let grant = parse_token_response(
				GrantType::AuthorizationCode,
				&response(200, body),
				DEFAULT_EXPIRY,
			)
			.expect("Access token alone should be accepted.");

			assert_eq!(grant.expires_in, DEFAULT_EXPIRY);
		}
	}

	#[test]
	fn rejection_reason_prefers_description_then_msg() {
		let err = parse_token_response(
			GrantType::RefreshToken,
			&response(
				400,
				r#"{"code":20037,"error":"invalid_grant","error_description":"refresh token expired"}"#,
			),
			DEFAULT_EXPIRY,
		)
		.expect_err("4xx responses must be rejected.");

		assert!(
			matches!(err, Error::RefreshFailed { ref reason } if reason == "refresh token expired")
		);

		let err = parse_token_response(
			GrantType::AuthorizationCode,
			&response(200, r#"{"code":20003,"msg":"code is invalid"}"#),
			DEFAULT_EXPIRY,
		)
		.expect_err("2xx without an access token must be rejected.");

		assert!(matches!(err, Error::ExchangeFailed { ref reason } if reason == "code is invalid"));

		let err = parse_token_response(
			GrantType::AuthorizationCode,
			&response(200, r#"{"code":20003}"#),
			DEFAULT_EXPIRY,
		)
		.expect_err("A bare non-zero code must be rejected.");

		assert!(matches!(err, Error::ExchangeFailed { ref reason } if reason.contains("20003")));
	}

	#[test]
	fn malformed_payloads_are_rejected_with_context() {
		let err = parse_token_response(
			GrantType::RefreshToken,
			&response(200, r#"{"access_token":"A","expires_in":"soon"}"#),
			DEFAULT_EXPIRY,
		)
		.expect_err("Type mismatches must be rejected.");

		assert!(matches!(
			err,
			Error::RefreshFailed { ref reason } if reason.contains("expires_in")
		));

		let err = parse_token_response(
			GrantType::RefreshToken,
			&response(502, "<html>bad gateway</html>"),
			DEFAULT_EXPIRY,
		)
		.expect_err("Non-JSON error pages must be rejected.");

		assert!(matches!(err, Error::RefreshFailed { ref reason } if reason.contains("502")));
		assert!(err.need_reauth());
	}

	#[test]
	fn refresh_grant_keeps_previous_refresh_token_when_omitted() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let previous = TokenSecret::new("R1");
		let grant = parse_token_response(
			GrantType::RefreshToken,
			&response(
				200,
				r#"{"code":0,"access_token":"A2","expires_in":7200,"refresh_token_expires_in":604800}"#,
			),
			DEFAULT_EXPIRY,
		)
		.expect("Refresh response should parse.");
		let record = grant.into_record(now, Some(&previous)).expect("Record should build.");

		assert_eq!(record.access_token.expose(), "A2");
		assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"));
		assert_eq!(record.access_token_expires_at, macros::datetime!(2025-01-01 02:00 UTC));
		assert_eq!(record.refresh_token_expires_at, Some(macros::datetime!(2025-01-08 00:00 UTC)));
	}

	#[test]
	fn request_body_is_json_with_grant_fields() {
		let descriptor = ProviderDescriptor::lark().expect("Lark preset should validate.");
		let client = <TokenEndpointClient>::from_descriptor(
			&descriptor,
			"cli_test",
			TokenSecret::new("secret"),
			Arc::new(ReqwestHttpClient::new().expect("Client should build.")),
			Arc::new(ReqwestTransportErrorMapper),
		);
		let mut body = TokenRequest::new(GrantType::AuthorizationCode, "cli_test", "secret");

		body.code = Some("C");
		body.redirect_uri = Some("https://broker.example.com/callback");

		let request = client.build_request(&body).expect("Token request should build.");
		let json: serde_json::Value =
			serde_json::from_slice(request.body()).expect("Body should be JSON.");

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.uri().to_string(), descriptor.endpoints.token.as_str());
		assert_eq!(json["grant_type"], "authorization_code");
		assert_eq!(json["client_secret"], "secret");
		assert_eq!(json["redirect_uri"], "https://broker.example.com/callback");
		assert!(json.get("refresh_token").is_none());
		assert!(json.get("code_verifier").is_none());
	}

	#[test]
	fn io_failures_keep_their_endpoint_label() {
		let mapper = ReqwestTransportErrorMapper;
		let io = mapper.map_transport_error(
			TOKEN_ENDPOINT,
			HttpClientError::Io(std::io::Error::other("connection reset")),
		);
		let other =
			mapper.map_transport_error(API_ENDPOINT, HttpClientError::Other("closed".into()));

		assert!(matches!(io, Error::Transport(ref e) if e.endpoint() == TOKEN_ENDPOINT));
		assert!(matches!(other, Error::Transport(ref e) if e.endpoint() == API_ENDPOINT));
		assert!(io.is_transient());
	}
}
