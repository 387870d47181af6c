// std
use std::{
	io::{Error as IoError, ErrorKind},
	sync::atomic::{AtomicUsize, Ordering},
};
// self
use lark_token_broker::{
	_preludet::*,
	auth::CredentialRecord,
	clock::ManualClock,
	error::TransportError,
	flows::Broker,
	gateway::{ApiGateway, GatewayRequest},
	http::UpstreamHttpClient,
	oauth::{
		API_ENDPOINT, TOKEN_ENDPOINT, TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::Method},
	},
	provider::ProviderDescriptor,
	store::{CredentialStore, MemoryStore},
};

type HandleFuture<'c> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<IoError>>> + Send + 'c>>;

/// Transport whose every call times out.
#[derive(Default)]
struct TimingOutClient {
	calls: Arc<AtomicUsize>,
}
impl UpstreamHttpClient for TimingOutClient {
	type Handle = TimingOutHandle;
	type TransportError = IoError;

	fn handle(&self) -> Self::Handle {
		TimingOutHandle(self.calls.clone())
	}
}

struct TimingOutHandle(Arc<AtomicUsize>);
impl<'c> AsyncHttpClient<'c> for TimingOutHandle {
	type Error = HttpClientError<IoError>;
	type Future = HandleFuture<'c>;

	fn call(&'c self, _: HttpRequest) -> Self::Future {
		self.0.fetch_add(1, Ordering::SeqCst);

		Box::pin(async {
			Err(HttpClientError::Reqwest(Box::new(IoError::new(ErrorKind::TimedOut, "timed out"))))
		})
	}
}

struct IoMapper;
impl TransportErrorMapper<IoError> for IoMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		error: HttpClientError<IoError>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(inner) if inner.kind() == ErrorKind::TimedOut =>
				TransportError::Timeout { endpoint }.into(),
			other => TransportError::network(endpoint, IoError::other(other.to_string())).into(),
		}
	}
}

fn descriptor() -> ProviderDescriptor {
	mock_descriptor("https://provider.example.com", false).expect("Mock descriptor should build.")
}

fn build(store: Arc<MemoryStore>) -> (Arc<Broker<TimingOutClient, IoMapper>>, Arc<AtomicUsize>) {
	let client = TimingOutClient::default();
	let calls = client.calls.clone();
	let broker = Broker::with_http_client(
		store as Arc<dyn CredentialStore>,
		descriptor(),
		TEST_APP_ID,
		TEST_APP_SECRET,
		client,
		IoMapper,
	)
	.with_clock(Arc::new(ManualClock::default()));

	(Arc::new(broker), calls)
}

#[tokio::test]
async fn refresh_timeout_surfaces_as_transport_error() {
	let store = Arc::new(MemoryStore::default());
	let (broker, calls) = build(store.clone());

	broker.seed_refresh_token("R0");

	let before = store.snapshot();
	let err = broker.refresh().await.expect_err("Timed out refresh must fail.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Timeout { endpoint }) if endpoint == TOKEN_ENDPOINT
	));
	assert!(err.is_transient());
	assert!(!err.need_reauth());
	assert_eq!(store.snapshot(), before);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn gateway_timeout_is_tagged_with_the_api_endpoint() {
	let store = Arc::new(MemoryStore::default());
	let record = CredentialRecord::builder()
		.access_token("A-live")
		.refresh_token("R0")
		.expires_in(Duration::hours(2))
		.build()
		.expect("Credential record fixture should build.");

	store.replace(record);

	let (broker, calls) = build(store);
	let gateway = ApiGateway::new(broker);
	let err = gateway
		.call(GatewayRequest::new(Method::GET, "task/v2/tasks"))
		.await
		.expect_err("Timed out gateway call must fail.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Timeout { endpoint }) if endpoint == API_ENDPOINT
	));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}
