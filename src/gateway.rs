//! Authenticated pass-through to the upstream API.
//!
//! Every call first obtains an access token through the broker; when that fails the
//! error is returned before anything is sent upstream. Upstream status, content type and
//! body are handed back verbatim.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{Method, header},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	flows::Broker,
	http::{ReqwestHttpClient, UpstreamHttpClient},
	oauth::{API_ENDPOINT, ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, FlowKind, FlowSpan},
};

/// Outbound request relayed by [`ApiGateway::call`].
#[derive(Clone, Debug)]
pub struct GatewayRequest {
	/// HTTP method forwarded upstream.
	pub method: Method,
	/// Path relative to the API base, e.g. `task/v2/tasks`.
	pub path: String,
	/// Query parameters passed through unchanged.
	pub query: Vec<(String, String)>,
	/// JSON body sent for methods other than `GET` and `HEAD`.
	pub body: Vec<u8>,
}
impl GatewayRequest {
	/// Creates a bodiless request for `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: Vec::new() }
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets the JSON body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}
}

/// Upstream response returned verbatim to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayResponse {
	/// Upstream HTTP status code.
	pub status: u16,
	/// Upstream `Content-Type`, if any.
	pub content_type: Option<String>,
	/// Raw upstream body.
	pub body: Vec<u8>,
}

/// Relays authenticated calls to the provider's API base URL.
pub struct ApiGateway<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	broker: Arc<Broker<C, M>>,
}
impl<C, M> ApiGateway<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a gateway backed by `broker`.
	pub fn new(broker: Arc<Broker<C, M>>) -> Self {
		Self { broker }
	}

	/// Broker supplying access tokens.
	pub fn broker(&self) -> &Arc<Broker<C, M>> {
		&self.broker
	}

	/// Forwards `request` upstream with a bearer access token.
	///
	/// Fails with [`Error::InvalidApiPath`] for empty paths, paths carrying a scheme and
	/// paths with dot segments. Token failures are returned before any upstream contact.
	pub async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse> {
		FlowSpan::new(FlowKind::Gateway, "call").run(self.relay(request)).await
	}

	async fn relay(&self, request: GatewayRequest) -> Result<GatewayResponse> {
		let url = resolve_api_url(&self.broker.descriptor.endpoints.api_base, &request)?;
		let token = self.broker.get_valid_access_token().await?;
		let outbound = build_outbound(&request, &url, &token)?;
		let handle = self.broker.http_client.handle();
		let response = handle
			.call(outbound)
			.await
			.map_err(|e| self.broker.transport_mapper.map_transport_error(API_ENDPOINT, e))?;
		let status = response.status().as_u16();
		let content_type = response
			.headers()
			.get(header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(ToOwned::to_owned);

		obs::record_gateway_status(status);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			method = %request.method,
			path = %request.path,
			status,
			"gateway call relayed"
		);

		Ok(GatewayResponse { status, content_type, body: response.into_body() })
	}
}
impl<C, M> Clone for ApiGateway<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { broker: self.broker.clone() }
	}
}

/// Joins a caller-supplied path onto `api_base`, rejecting anything that could escape it.
pub fn resolve_api_url(api_base: &Url, request: &GatewayRequest) -> Result<Url> {
	let invalid = || Error::InvalidApiPath { path: request.path.clone() };
	let relative = request.path.trim_start_matches('/');

	if relative.is_empty()
		|| relative.contains('\\')
		|| relative.contains(['?', '#'])
		|| Url::parse(relative).is_ok()
		|| relative.split('/').any(is_dot_segment)
	{
		return Err(invalid());
	}

	let joined = format!("{}/{relative}", api_base.as_str().trim_end_matches('/'));
	let mut url = Url::parse(&joined).map_err(|_| invalid())?;

	if url.origin() != api_base.origin() || !url.path().starts_with(api_base.path()) {
		return Err(invalid());
	}
	if !request.query.is_empty() {
		url.query_pairs_mut().extend_pairs(&request.query);
	}

	Ok(url)
}

fn is_dot_segment(segment: &str) -> bool {
	let decoded = segment.to_ascii_lowercase().replace("%2e", ".");

	decoded == "." || decoded == ".."
}

fn build_outbound(
	request: &GatewayRequest,
	url: &Url,
	token: &TokenSecret,
) -> Result<HttpRequest> {
	let mut builder = oauth2::http::Request::builder()
		.method(request.method.clone())
		.uri(url.as_str())
		.header(header::AUTHORIZATION, format!("Bearer {}", token.expose()))
		.header(header::ACCEPT, "application/json");
	let body = if matches!(request.method, Method::GET | Method::HEAD) {
		Vec::new()
	} else {
		builder = builder.header(header::CONTENT_TYPE, "application/json; charset=utf-8");

		request.body.clone()
	};

	builder.body(body).map_err(|e| ConfigError::from(e).into())
}
