//! Single-slot holder for the authorization attempt awaiting its callback.

// self
use crate::{_prelude::*, auth::token::secret::constant_time_eq};

/// CSRF nonce and exchange inputs captured when an authorization attempt starts.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
	/// One-time state value that must come back on the callback.
	pub state: String,
	/// Redirect URI sent on the authorize URL; the code exchange must repeat it exactly.
	pub redirect_uri: String,
	/// PKCE verifier, present only when PKCE is enabled.
	pub pkce_verifier: Option<String>,
	/// Instant the attempt started.
	pub issued_at: OffsetDateTime,
}
impl PendingAuthorization {
	/// Constant-time comparison against the state returned on the callback.
	pub fn state_matches(&self, returned: &str) -> bool {
		constant_time_eq(self.state.as_bytes(), returned.as_bytes())
	}
}
impl Debug for PendingAuthorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAuthorization")
			.field("state", &"<redacted>")
			.field("redirect_uri", &self.redirect_uri)
			.field("pkce", &self.pkce_verifier.is_some())
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

/// Holds at most one [`PendingAuthorization`]; newer attempts overwrite older ones.
#[derive(Debug, Default)]
pub struct PendingSlot(Mutex<Option<PendingAuthorization>>);
impl PendingSlot {
	/// Stores `pending`, discarding any earlier attempt.
	pub fn install(&self, pending: PendingAuthorization) {
		*self.0.lock() = Some(pending);
	}

	/// Removes and returns the pending attempt so its nonce cannot be replayed.
	pub fn take(&self) -> Option<PendingAuthorization> {
		self.0.lock().take()
	}

	/// Returns `true` while an attempt is waiting for its callback.
	pub fn is_pending(&self) -> bool {
		self.0.lock().is_some()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn pending(state: &str) -> PendingAuthorization {
		PendingAuthorization {
			state: state.into(),
			redirect_uri: "https://broker.example.com/callback".into(),
			pkce_verifier: None,
			issued_at: macros::datetime!(2025-01-01 00:00 UTC),
		}
	}

	#[test]
	fn newer_attempt_overwrites_and_take_consumes() {
		let slot = PendingSlot::default();

		slot.install(pending("S1"));
		slot.install(pending("S2"));

		let current = slot.take().expect("Latest attempt should be pending.");

		assert!(current.state_matches("S2"));
		assert!(!current.state_matches("S1"));
		assert!(!current.state_matches("S2-longer"));
		assert!(slot.take().is_none());
		assert!(!slot.is_pending());
	}

	#[test]
	fn debug_output_hides_state() {
		let rendered = format!("{:?}", pending("super-secret-nonce"));

		assert!(!rendered.contains("super-secret-nonce"));
	}
}
