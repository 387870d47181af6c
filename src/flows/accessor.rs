//! Entry point used by every authenticated operation to obtain an access token.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, ValidAccessToken},
	flows::Broker,
	http::UpstreamHttpClient,
	oauth::TransportErrorMapper,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns an access token that stays valid for longer than the refresh margin.
	///
	/// A cached token is served without network traffic. Otherwise the call joins (or
	/// starts) the single in-flight refresh. A token that failed the margin check is never
	/// returned, even when the refresh fails.
	pub async fn get_valid_access_token(&self) -> Result<TokenSecret> {
		self.get_valid_credentials().await.map(|valid| valid.token)
	}

	/// Same as [`Broker::get_valid_access_token`], paired with that token's expiry.
	///
	/// Both values come from one store snapshot (or from the record a refresh just wrote),
	/// so a concurrent replacement can never mix one token with another's expiry.
	pub async fn get_valid_credentials(&self) -> Result<ValidAccessToken> {
		let now = self.clock.now();
		let cached = self
			.store
			.snapshot()
			.and_then(|record| record.usable_access_token(now, self.refresh_margin));

		if let Some(valid) = cached {
			self.refresh_metrics.record_cache_hit();

			return Ok(valid);
		}

		self.refresh_if_stale().await
	}
}
