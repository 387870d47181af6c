//! Thread-safe in-memory [`CredentialStore`].

// self
use crate::{_prelude::*, auth::CredentialRecord, store::CredentialStore};

/// Credential store that keeps the record in-process behind a [`RwLock`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<CredentialRecord>>>);
impl CredentialStore for MemoryStore {
	fn snapshot(&self) -> Option<CredentialRecord> {
		self.0.read().clone()
	}

	fn replace(&self, record: CredentialRecord) {
		*self.0.write() = Some(record);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::thread;
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record(access: &str, refresh: &str, expires_at: OffsetDateTime) -> CredentialRecord {
		CredentialRecord::builder()
			.access_token(access)
			.refresh_token(refresh)
			.updated_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(expires_at)
			.build()
			.expect("Fixture record should build.")
	}

	#[test]
	fn seeding_marks_store_authorized() {
		let store = MemoryStore::default();

		assert!(store.snapshot().is_none());
		assert!(!store.is_authorized());

		store.seed_refresh_token("u-seed", macros::datetime!(2025-01-01 00:00 UTC));

		assert!(store.is_authorized());

		let snapshot = store.snapshot().expect("Seeded store should expose a record.");

		assert!(snapshot.access_token.is_empty());
		assert_eq!(snapshot.refresh_token.as_ref().map(|s| s.expose()), Some("u-seed"));
	}

	#[test]
	fn concurrent_replacements_never_mix_fields() {
		let store = MemoryStore::default();
		let first = record("A1", "R1", macros::datetime!(2025-01-01 01:00 UTC));
		let second = record("A2", "R2", macros::datetime!(2025-01-01 02:00 UTC));
		let writers = [first.clone(), second.clone()].map(|candidate| {
			let store = store.clone();

			thread::spawn(move || {
				for _ in 0..1_000 {
					store.replace(candidate.clone());
				}
			})
		});

		for _ in 0..1_000 {
			if let Some(seen) = store.snapshot() {
				assert!(seen == first || seen == second, "Observed a torn record: {seen:?}.");
			}
		}
		for writer in writers {
			writer.join().expect("Writer thread should finish.");
		}
	}
}
