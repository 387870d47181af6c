//! Refresh-token orchestration with a single-flight guard and metrics.
//!
//! At most one refresh-token grant is in flight per broker. The first caller that needs a
//! new access token opens a flight; callers arriving while it runs join that flight and
//! receive the same token or the same error. Once the flight settles it is retired, so a
//! later caller starts a fresh one instead of replaying a stale failure.
//!
//! Non-forced flights re-read the store before contacting upstream, so a caller that
//! arrives just after another refresh finished is served the new token without a second
//! grant. The store lock is never held across the network call, and the store is only
//! written after the token endpoint accepted the grant.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, ValidAccessToken},
	flows::Broker,
	http::UpstreamHttpClient,
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
};

/// Shared outcome of one refresh-token grant.
pub(crate) type RefreshFlight = OnceCell<Result<ValidAccessToken>>;

impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Redeems the stored refresh token for a new token pair.
	///
	/// Fails with [`Error::NoRefreshToken`] without any network traffic when the store holds
	/// no refresh token. Concurrent calls share a single grant.
	pub async fn refresh(&self) -> Result<TokenSecret> {
		self.refresh_with(true).await.map(|valid| valid.token)
	}

	/// Refreshes only if the cached access token is still unusable once the flight starts.
	pub(crate) async fn refresh_if_stale(&self) -> Result<ValidAccessToken> {
		self.refresh_with(false).await
	}

	async fn refresh_with(&self, force: bool) -> Result<ValidAccessToken> {
		let (flight, joined) = self.join_flight();

		if joined {
			self.refresh_metrics.record_coalesced();
		}

		let result = flight
			.get_or_init(|| {
				FlowSpan::new(FlowKind::Refresh, if force { "refresh" } else { "refresh_if_stale" })
					.run(self.perform_refresh(force))
			})
			.await
			.clone();

		self.retire_flight(&flight);

		result
	}

	/// Returns the current flight, opening a new one when none is running.
	fn join_flight(&self) -> (Arc<RefreshFlight>, bool) {
		let mut slot = self.refresh_flight.lock();

		if let Some(flight) = slot.as_ref().filter(|flight| !flight.is_initialized()) {
			return (flight.clone(), true);
		}

		let flight = Arc::new(RefreshFlight::new());

		*slot = Some(flight.clone());

		(flight, false)
	}

	fn retire_flight(&self, flight: &Arc<RefreshFlight>) {
		let mut slot = self.refresh_flight.lock();

		if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, flight)) {
			slot.take();
		}
	}

	async fn perform_refresh(&self, force: bool) -> Result<ValidAccessToken> {
		let current = self.store.snapshot();

		let cached = current
			.as_ref()
			.filter(|_| !force)
			.and_then(|record| record.usable_access_token(self.clock.now(), self.refresh_margin));

		if let Some(valid) = cached {
			self.refresh_metrics.record_cache_hit();

			return Ok(valid);
		}

		let refresh_token = current
			.and_then(|record| record.refresh_token)
			.filter(|secret| !secret.is_empty())
			.ok_or_else(|| {
				self.refresh_metrics.record_failure();

				Error::NoRefreshToken
			})?;

		self.refresh_metrics.record_upstream_call();

		let grant = self.token_client.refresh_token(&refresh_token).await.inspect_err(|_| {
			self.refresh_metrics.record_failure();
		})?;
		let record = grant.into_record(self.clock.now(), Some(&refresh_token)).inspect_err(|_| {
			self.refresh_metrics.record_failure();
		})?;
		let valid = ValidAccessToken {
			token: record.access_token.clone(),
			expires_at: record.access_token_expires_at,
		};

		self.store.replace(record);
		self.refresh_metrics.record_success();

		#[cfg(feature = "tracing")]
		tracing::info!("access token refreshed");

		Ok(valid)
	}
}
