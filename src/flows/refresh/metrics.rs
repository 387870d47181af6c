// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how access tokens were served.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	upstream_calls: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	coalesced: AtomicU64,
	cache_hits: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh-token grants sent to the token endpoint.
	pub fn upstream_calls(&self) -> u64 {
		self.upstream_calls.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh grants that rotated the stored credentials.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh attempts that ended in an error.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined a refresh already in flight.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Returns the number of requests served from the cached access token.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	pub(crate) fn record_upstream_call(&self) {
		self.upstream_calls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}
}
