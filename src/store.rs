//! Process-lifetime state: the credential record and the pending authorization slot.

pub mod memory;
pub mod pending;

pub use memory::MemoryStore;
pub use pending::{PendingAuthorization, PendingSlot};

// self
use crate::{_prelude::*, auth::CredentialRecord};

/// Storage contract for the broker's single credential record.
///
/// Implementations read and write the whole record under one lock so no partial update is
/// ever observable, and must never hold that lock across an `.await`.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns a consistent copy of every credential field, if a record exists.
	fn snapshot(&self) -> Option<CredentialRecord>;

	/// Replaces every credential field at once.
	fn replace(&self, record: CredentialRecord);

	/// Seeds the store with an externally supplied refresh token.
	///
	/// The access token stays empty so the first caller triggers a refresh.
	fn seed_refresh_token(&self, refresh_token: &str, now: OffsetDateTime) {
		self.replace(CredentialRecord::seeded(refresh_token, now));
	}

	/// Returns `true` once a refresh token is held.
	fn is_authorized(&self) -> bool {
		self.snapshot().is_some_and(|record| record.has_refresh_token())
	}
}
