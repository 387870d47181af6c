//! Wall-clock abstraction so expiry decisions can be exercised deterministically.

// self
use crate::_prelude::*;

/// Source of the current UTC instant used for every expiry decision.
pub trait Clock
where
	Self: 'static + Send + Sync,
{
	/// Returns the current wall-clock instant.
	fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for tests and simulations.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Jumps the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::now_utc())
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_advances_and_shares_state() {
		let clock = ManualClock::new(macros::datetime!(2025-06-01 00:00 UTC));
		let shared = clock.clone();

		clock.advance(Duration::seconds(3750));

		assert_eq!(shared.now(), macros::datetime!(2025-06-01 01:02:30 UTC));

		shared.set(macros::datetime!(2030-01-01 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2030-01-01 00:00 UTC));
	}
}
