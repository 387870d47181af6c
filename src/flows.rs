//! Token lifecycle orchestration built around a single [`Broker`].

pub mod accessor;
pub mod auth_code;
pub mod common;
pub mod refresh;

pub use auth_code::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenStatus},
	clock::{Clock, SystemClock},
	http::{ReqwestHttpClient, UpstreamHttpClient},
	oauth::{ReqwestTransportErrorMapper, TokenEndpointClient, TransportErrorMapper},
	provider::ProviderDescriptor,
	store::{CredentialStore, PendingSlot},
};

/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Safety margin applied before an access token's expiry.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(300);

/// Owns the credential lifecycle for one upstream application.
///
/// The broker holds the transport, the credential store, the provider descriptor and the
/// application credentials, so the authorization handlers, the refresher and the gateway
/// share one view of the token state. Refreshes are single-flight: concurrent callers
/// that need a new access token join whichever refresh is already running.
pub struct Broker<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound upstream request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Credential store holding the current token pair.
	pub store: Arc<dyn CredentialStore>,
	/// Provider descriptor that defines endpoints, scopes and quirks.
	pub descriptor: ProviderDescriptor,
	/// Application identifier sent with every grant and on the authorize URL.
	pub client_id: String,
	/// Clock consulted for every expiry decision.
	pub clock: Arc<dyn Clock>,
	/// Remaining lifetime below which a cached access token is refreshed instead of served.
	pub refresh_margin: Duration,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	token_client: TokenEndpointClient<C, M>,
	pending: PendingSlot,
	phase: Mutex<AuthorizationPhase>,
	refresh_flight: Mutex<Option<Arc<RefreshFlight>>>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let client_id = client_id.into();
		let http_client = http_client.into();
		let transport_mapper = mapper.into();
		let token_client = TokenEndpointClient::from_descriptor(
			&descriptor,
			client_id.clone(),
			TokenSecret::new(client_secret),
			http_client.clone(),
			transport_mapper.clone(),
		);

		Self {
			http_client,
			transport_mapper,
			store,
			descriptor,
			client_id,
			clock: Arc::new(SystemClock),
			refresh_margin: DEFAULT_REFRESH_MARGIN,
			refresh_metrics: Default::default(),
			token_client,
			pending: Default::default(),
			phase: Mutex::new(AuthorizationPhase::Idle),
			refresh_flight: Default::default(),
		}
	}

	/// Replaces the wall clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the refresh safety margin; negative values are treated as zero.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Seeds the store with an externally obtained refresh token.
	pub fn seed_refresh_token(&self, refresh_token: &str) {
		self.store.seed_refresh_token(refresh_token, self.clock.now());
	}

	/// Returns a secret-free summary of the current credential state.
	pub fn status(&self) -> CredentialStatus {
		let now = self.clock.now();
		let phase = self.phase();
		let pending_authorization = self.pending.is_pending();

		match self.store.snapshot() {
			Some(record) => CredentialStatus {
				authorized: record.has_refresh_token(),
				token_status: record.status_at(now, self.refresh_margin),
				access_token_expires_at: (!record.access_token.is_empty())
					.then_some(record.access_token_expires_at),
				access_token_expires_in: record.remaining_at(now).whole_seconds(),
				refresh_token_expires_at: record.refresh_token_expires_at,
				updated_at: Some(record.updated_at),
				phase,
				pending_authorization,
			},
			None => CredentialStatus {
				authorized: false,
				token_status: TokenStatus::Unissued,
				access_token_expires_at: None,
				access_token_expires_in: 0,
				refresh_token_expires_at: None,
				updated_at: None,
				phase,
				pending_authorization,
			},
		}
	}
}
impl ReqwestBroker {
	/// Creates a broker that provisions its own reqwest transport with the default timeout.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self> {
		Ok(Self::with_http_client(
			store,
			descriptor,
			client_id,
			client_secret,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("refresh_margin", &self.refresh_margin)
			.field("phase", &self.phase())
			.finish()
	}
}

/// Secret-free view of the credential state, suitable for status pages and APIs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
	/// `true` once a refresh token is held.
	pub authorized: bool,
	/// Access-token lifecycle status at the time of the snapshot.
	pub token_status: TokenStatus,
	/// Access-token expiry, if one has been issued.
	#[serde(with = "time::serde::rfc3339::option")]
	pub access_token_expires_at: Option<OffsetDateTime>,
	/// Whole seconds until the access token expires, clamped at zero.
	pub access_token_expires_in: i64,
	/// Refresh-token expiry reported by upstream, if any.
	#[serde(with = "time::serde::rfc3339::option")]
	pub refresh_token_expires_at: Option<OffsetDateTime>,
	/// Instant of the last exchange, refresh, or seed.
	#[serde(with = "time::serde::rfc3339::option")]
	pub updated_at: Option<OffsetDateTime>,
	/// Progress of the most recent authorization attempt.
	pub phase: AuthorizationPhase,
	/// `true` while an issued authorize URL still waits for its callback.
	pub pending_authorization: bool,
}
