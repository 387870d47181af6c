//! HTTP surface wiring the broker into an axum router.
//!
//! Browser routes (`/`, `/callback`) drive the authorization flow and render HTML.
//! Machine routes under `/api` require the shared API key, either as a bearer token or as
//! an `api_key` query parameter, and answer failures with
//! `{"error": <code>, "message": <text>, "need_reauth": <bool>}`.

pub mod pages;

// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::{Path, Query, RawQuery, State},
	http::{HeaderMap, HeaderValue, Method, StatusCode, header},
	response::{Html, IntoResponse, Response},
	routing::{any, get},
};
use serde_json::json;
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	flows::{AuthorizationCallback, ReqwestBroker},
	gateway::{ApiGateway, GatewayRequest, GatewayResponse},
	oauth::TOKEN_ENDPOINT,
};

const API_KEY_PARAM: &str = "api_key";
const FORWARDED_PROTO: &str = "x-forwarded-proto";
const APP_ID_HINT_LEN: usize = 10;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	broker: Arc<ReqwestBroker>,
	gateway: ApiGateway,
	api_key: TokenSecret,
	redirect_uri: Option<String>,
}
impl AppState {
	/// Creates the state for `broker`.
	///
	/// `redirect_uri` pins the callback URL; when `None` it is derived per request from the
	/// `Host` and `X-Forwarded-Proto` headers.
	pub fn new(
		broker: Arc<ReqwestBroker>,
		api_key: impl Into<String>,
		redirect_uri: Option<String>,
	) -> Self {
		let gateway = ApiGateway::new(broker.clone());

		Self { broker, gateway, api_key: TokenSecret::new(api_key), redirect_uri }
	}

	/// Broker backing the routes.
	pub fn broker(&self) -> &Arc<ReqwestBroker> {
		&self.broker
	}

	fn redirect_uri_for(&self, headers: &HeaderMap) -> Result<String> {
		if let Some(redirect_uri) = &self.redirect_uri {
			return Ok(redirect_uri.clone());
		}

		let host = header_str(headers, header::HOST.as_str())
			.filter(|host| !host.is_empty())
			.ok_or(ConfigError::MissingSetting { name: "BASE_URL" })?;
		let scheme = header_str(headers, FORWARDED_PROTO)
			.and_then(|proto| proto.split(',').next())
			.map(str::trim)
			.filter(|proto| matches!(*proto, "http" | "https"))
			.unwrap_or("http");

		Ok(format!("{scheme}://{host}/callback"))
	}

	fn authorize(&self, headers: &HeaderMap, query_key: Option<&str>) -> Result<(), ApiError> {
		let presented = bearer_token(headers).or(query_key);

		match presented {
			Some(key) if self.api_key.matches(key) => Ok(()),
			_ => {
				tracing::warn!("rejected request with a missing or invalid API key");

				Err(ApiError(Error::Unauthorized))
			},
		}
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("broker", &self.broker)
			.field("redirect_uri", &self.redirect_uri)
			.finish()
	}
}

/// JSON error response for the `/api` routes.
#[derive(Debug)]
pub struct ApiError(pub Error);
impl ApiError {
	/// HTTP status for the wrapped error.
	pub fn status(&self) -> StatusCode {
		match &self.0 {
			Error::Unauthorized | Error::NoRefreshToken | Error::RefreshFailed { .. } =>
				StatusCode::UNAUTHORIZED,
			// Token acquisition that could not reach upstream still means no usable token.
			Error::Transport(e) if e.endpoint() == TOKEN_ENDPOINT => StatusCode::UNAUTHORIZED,
			Error::Transport(_) | Error::ExchangeFailed { .. } => StatusCode::BAD_GATEWAY,
			Error::InvalidApiPath { .. }
			| Error::StateMismatch
			| Error::MissingCode
			| Error::UpstreamDenied { .. } => StatusCode::BAD_REQUEST,
			Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		Self(e)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		let body = json!({
			"error": self.0.code(),
			"message": self.0.to_string(),
			"need_reauth": self.0.need_reauth(),
		});

		(status, Json(body)).into_response()
	}
}

/// Builds the router for `state`.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(index))
		.route("/callback", get(callback))
		.route("/health", get(health))
		.route("/api/status", get(api_status))
		.route("/api/token", get(api_token))
		.route("/api/proxy/{*path}", any(api_proxy))
		.with_state(state)
}

/// Serves `state` on `listener` until Ctrl-C is received.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
	if let Ok(addr) = listener.local_addr() {
		tracing::info!(%addr, "broker listening");
	}

	axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("shutdown signal received"),
		Err(e) => {
			tracing::error!(error = %e, "failed to listen for the shutdown signal");

			std::future::pending::<()>().await;
		},
	}
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
	let session = state
		.redirect_uri_for(&headers)
		.and_then(|redirect_uri| state.broker.begin_authorization(&redirect_uri));

	match session {
		Ok(session) =>
			Html(pages::start(&session.authorize_url, &state.broker.status())).into_response(),
		Err(e) => page_error(e),
	}
}

async fn callback(
	State(state): State<AppState>,
	Query(callback): Query<AuthorizationCallback>,
) -> Response {
	match state.broker.complete_authorization(callback).await {
		Ok(status) => Html(pages::success(&status)).into_response(),
		Err(e) => page_error(e),
	}
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
	let app_id: String = state.broker.client_id.chars().take(APP_ID_HINT_LEN).collect();

	Json(json!({
		"status": "ok",
		"app_id": format!("{app_id}..."),
		"authorized": state.broker.status().authorized,
	}))
}

async fn api_status(
	State(state): State<AppState>,
	headers: HeaderMap,
	RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
	let query = ProxyQuery::parse(query.as_deref());

	state.authorize(&headers, query.api_key.as_deref())?;

	Ok(Json(state.broker.status()).into_response())
}

async fn api_token(
	State(state): State<AppState>,
	headers: HeaderMap,
	RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
	let query = ProxyQuery::parse(query.as_deref());

	state.authorize(&headers, query.api_key.as_deref())?;

	let valid = state.broker.get_valid_credentials().await?;

	Ok(Json(json!({
		"access_token": valid.token.expose(),
		"expires_at": valid.expires_at.unix_timestamp(),
		"expires_in": valid.expires_in(state.broker.clock.now()),
	}))
	.into_response())
}

async fn api_proxy(
	State(state): State<AppState>,
	method: Method,
	Path(path): Path<String>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Response, ApiError> {
	let query = ProxyQuery::parse(query.as_deref());

	state.authorize(&headers, query.api_key.as_deref())?;

	let mut request = GatewayRequest::new(method, path).body(body.to_vec());

	request.query = query.forwarded;

	let response = state.gateway.call(request).await?;

	Ok(relay(response))
}

/// Query string split into the API key and the parameters forwarded upstream.
#[derive(Debug, Default, PartialEq, Eq)]
struct ProxyQuery {
	api_key: Option<String>,
	forwarded: Vec<(String, String)>,
}
impl ProxyQuery {
	fn parse(raw: Option<&str>) -> Self {
		let mut query = Self::default();

		for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
			if key == API_KEY_PARAM {
				query.api_key = Some(value.into_owned());
			} else {
				query.forwarded.push((key.into_owned(), value.into_owned()));
			}
		}

		query
	}
}

fn relay(response: GatewayResponse) -> Response {
	let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
	let mut relayed = (status, response.body).into_response();
	let headers = relayed.headers_mut();

	headers.remove(header::CONTENT_TYPE);

	if let Some(value) =
		response.content_type.as_deref().and_then(|ct| HeaderValue::from_str(ct).ok())
	{
		headers.insert(header::CONTENT_TYPE, value);
	}

	relayed
}

fn page_error(e: Error) -> Response {
	let status = match &e {
		Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		Error::Transport(_) | Error::ExchangeFailed { .. } => StatusCode::BAD_GATEWAY,
		_ => StatusCode::BAD_REQUEST,
	};

	(status, Html(pages::failure(&e))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let (scheme, token) = header_str(headers, header::AUTHORIZATION.as_str())?.split_once(' ')?;

	scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name).and_then(|value| value.to_str().ok())
}
