// crates.io
use httpmock::prelude::*;
use time::macros;
// self
use lark_token_broker::{
	_preludet::*,
	auth::CredentialRecord,
	gateway::{ApiGateway, GatewayRequest},
	oauth::oauth2::http::Method,
	store::CredentialStore,
};

const START: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

fn setup(server: &MockServer) -> (TestBroker, ApiGateway) {
	let descriptor =
		mock_descriptor(&server.base_url(), false).expect("Mock descriptor should build.");
	let harness = build_test_broker(descriptor, START).expect("Test broker should build.");
	let gateway = ApiGateway::new(harness.broker.clone());

	(harness, gateway)
}

fn seed_active(harness: &TestBroker) {
	let record = CredentialRecord::builder()
		.access_token("A-live")
		.refresh_token("R0")
		.updated_at(START)
		.expires_in(Duration::seconds(7200))
		.build()
		.expect("Credential record fixture should build.");

	harness.store.replace(record);
}

#[tokio::test]
async fn forwards_bearer_query_and_body_verbatim() {
	let server = MockServer::start_async().await;
	let (harness, gateway) = setup(&server);

	seed_active(&harness);

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/open-apis/task/v2/tasks")
				.query_param("user_id_type", "open_id")
				.header("authorization", "Bearer A-live")
				.body(r#"{"summary":"write docs"}"#);
			then.status(201)
				.header("content-type", "application/json; charset=utf-8")
				.body(r#"{"code":0,"data":{"task":{"guid":"t-1"}}}"#);
		})
		.await;
	let response = gateway
		.call(
			GatewayRequest::new(Method::POST, "task/v2/tasks")
				.query("user_id_type", "open_id")
				.body(r#"{"summary":"write docs"}"#),
		)
		.await
		.expect("Gateway call should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status, 201);
	assert_eq!(response.content_type.as_deref(), Some("application/json; charset=utf-8"));
	assert_eq!(response.body, br#"{"code":0,"data":{"task":{"guid":"t-1"}}}"#);
}

#[tokio::test]
async fn upstream_errors_are_relayed_not_raised() {
	let server = MockServer::start_async().await;
	let (harness, gateway) = setup(&server);

	seed_active(&harness);

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/open-apis/task/v2/tasks/missing");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"code":1470404,"msg":"task not found"}"#);
		})
		.await;
	let response = gateway
		.call(GatewayRequest::new(Method::GET, "/task/v2/tasks/missing"))
		.await
		.expect("Upstream 4xx should be relayed as a response.");

	mock.assert_async().await;

	assert_eq!(response.status, 404);
	assert_eq!(response.body, br#"{"code":1470404,"msg":"task not found"}"#);
}

#[tokio::test]
async fn stale_token_is_refreshed_before_forwarding() {
	let server = MockServer::start_async().await;
	let (harness, gateway) = setup(&server);

	harness.broker.seed_refresh_token("R0");

	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(MOCK_TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"code":0,"access_token":"A-fresh","expires_in":7200}"#);
		})
		.await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/open-apis/task/v2/tasks")
				.header("authorization", "Bearer A-fresh");
			then.status(200).header("content-type", "application/json").body(r#"{"code":0}"#);
		})
		.await;
	let response = gateway
		.call(GatewayRequest::new(Method::GET, "task/v2/tasks"))
		.await
		.expect("Gateway call should succeed after refreshing.");

	token.assert_async().await;
	api.assert_async().await;

	assert_eq!(response.status, 200);
}

#[tokio::test]
async fn token_failure_short_circuits_before_upstream() {
	let server = MockServer::start_async().await;
	let (_harness, gateway) = setup(&server);
	let api = server
		.mock_async(|_, then| {
			then.status(200);
		})
		.await;
	let err = gateway
		.call(GatewayRequest::new(Method::GET, "task/v2/tasks"))
		.await
		.expect_err("Missing credentials must fail the call.");

	assert!(matches!(err, Error::NoRefreshToken));
	assert!(err.need_reauth());

	api.assert_calls_async(0).await;
}

#[tokio::test]
async fn escaping_paths_are_rejected_without_contacting_upstream() {
	let server = MockServer::start_async().await;
	let (harness, gateway) = setup(&server);

	seed_active(&harness);

	let api = server
		.mock_async(|_, then| {
			then.status(200);
		})
		.await;

	for path in ["../admin", "https://evil.example.com/steal", ""] {
		let err = gateway
			.call(GatewayRequest::new(Method::GET, path))
			.await
			.expect_err("Escaping paths must be rejected.");

		assert!(matches!(err, Error::InvalidApiPath { .. }), "Unexpected error for {path:?}.");
	}

	api.assert_calls_async(0).await;
}
