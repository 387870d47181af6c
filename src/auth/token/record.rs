//! Credential record snapshot, lifecycle helpers, and builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Lifecycle status of the cached access token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
	/// No access token has been minted yet (seeded from a refresh token only).
	Unissued,
	/// Token is valid beyond the safety margin.
	Active,
	/// Token is still valid but inside the safety margin; it must be refreshed before use.
	Expiring,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Errors produced by [`CredentialRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Access token paired with the expiry of the record it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidAccessToken {
	/// Access token secret.
	pub token: TokenSecret,
	/// Expiry of this exact token.
	pub expires_at: OffsetDateTime,
}
impl ValidAccessToken {
	/// Whole seconds left before expiry at `instant`, clamped at zero.
	pub fn expires_in(&self, instant: OffsetDateTime) -> i64 {
		(self.expires_at - instant).whole_seconds().max(0)
	}
}

/// Snapshot of every credential field the broker tracks.
///
/// Records are replaced as a whole; an access token is never paired with another
/// token's expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
	/// Access token secret; empty until the first exchange or refresh.
	pub access_token: TokenSecret,
	/// Instant after which the access token must not be used.
	pub access_token_expires_at: OffsetDateTime,
	/// Refresh token secret, if upstream issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Refresh token expiry reported by upstream, if any.
	pub refresh_token_expires_at: Option<OffsetDateTime>,
	/// Instant of the last successful exchange, refresh, or seed.
	pub updated_at: OffsetDateTime,
}
impl CredentialRecord {
	/// Returns a builder for constructing records from token endpoint responses.
	pub fn builder() -> CredentialRecordBuilder {
		CredentialRecordBuilder::default()
	}

	/// Record holding only an externally supplied refresh token.
	///
	/// The access token is empty and already expired so the first use triggers a refresh.
	pub fn seeded(refresh_token: impl Into<String>, now: OffsetDateTime) -> Self {
		Self {
			access_token: TokenSecret::new(String::new()),
			access_token_expires_at: now,
			refresh_token: Some(TokenSecret::new(refresh_token)),
			refresh_token_expires_at: None,
			updated_at: now,
		}
	}

	/// Computes the access-token status at `instant` for the given safety margin.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenStatus {
		if self.access_token.is_empty() {
			return TokenStatus::Unissued;
		}
		if instant >= self.access_token_expires_at {
			return TokenStatus::Expired;
		}
		if self.access_token_expires_at - instant <= margin {
			return TokenStatus::Expiring;
		}

		TokenStatus::Active
	}

	/// Returns the access token and its expiry when it remains valid for longer than `margin`.
	pub fn usable_access_token(
		&self,
		instant: OffsetDateTime,
		margin: Duration,
	) -> Option<ValidAccessToken> {
		matches!(self.status_at(instant, margin), TokenStatus::Active).then(|| ValidAccessToken {
			token: self.access_token.clone(),
			expires_at: self.access_token_expires_at,
		})
	}

	/// Remaining access-token lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.access_token_expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Returns `true` if a refresh token is present.
	pub fn has_refresh_token(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("access_token", &"<redacted>")
			.field("access_token_expires_at", &self.access_token_expires_at)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token_expires_at", &self.refresh_token_expires_at)
			.field("updated_at", &self.updated_at)
			.finish()
	}
}

/// Builder for [`CredentialRecord`].
#[derive(Clone, Debug, Default)]
pub struct CredentialRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	updated_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	refresh_expires_in: Option<Duration>,
}
impl CredentialRecordBuilder {
	/// Sets the instant the tokens were obtained.
	pub fn updated_at(mut self, instant: OffsetDateTime) -> Self {
		self.updated_at = Some(instant);

		self
	}

	/// Sets an absolute access-token expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the access-token lifetime relative to `updated_at`.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the refresh-token lifetime relative to `updated_at`.
	pub fn refresh_expires_in(mut self, duration: Duration) -> Self {
		self.refresh_expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`CredentialRecord`].
	pub fn build(self) -> Result<CredentialRecord, CredentialRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(CredentialRecordBuilderError::MissingAccessToken)?;
		let updated_at = self.updated_at.unwrap_or_else(OffsetDateTime::now_utc);
		let access_token_expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => updated_at + delta,
			(None, None) => return Err(CredentialRecordBuilderError::MissingExpiry),
		};

		Ok(CredentialRecord {
			access_token,
			access_token_expires_at,
			refresh_token: self.refresh_token,
			refresh_token_expires_at: self.refresh_expires_in.map(|delta| updated_at + delta),
			updated_at,
		})
	}
}
