//! Immutable token snapshot published by the coordinator, plus lifecycle helpers.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Lifecycle status of a snapshot relative to the refresh-ahead window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Usable without contacting the token endpoint.
	Valid,
	/// Inside the refresh-ahead window but not yet expired.
	Stale,
	/// Past its expiry instant.
	Expired,
}

/// Access token paired with the instant it expires.
///
/// The coordinator swaps whole snapshots, so a token is never observed next to another
/// token's expiry.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSnapshot {
	/// Bearer credential; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Instant after which the token is rejected by the platform.
	pub expires_at: OffsetDateTime,
}
impl TokenSnapshot {
	/// Builds a snapshot issued at `issued_at` that lives for `lifetime`.
	///
	/// The expiry saturates at the representable range.
	pub fn new(access_token: TokenSecret, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		Self { access_token, issued_at, expires_at: issued_at.saturating_add(lifetime) }
	}

	/// Instant at which the snapshot enters the refresh-ahead window.
	pub fn stale_at(&self, refresh_ahead: Duration) -> OffsetDateTime {
		self.expires_at.saturating_sub(refresh_ahead)
	}

	/// Computes the status at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime, refresh_ahead: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			TokenStatus::Expired
		} else if instant >= self.stale_at(refresh_ahead) {
			TokenStatus::Stale
		} else {
			TokenStatus::Valid
		}
	}

	/// Returns `true` iff `instant < expires_at - refresh_ahead`.
	pub fn is_valid_at(&self, instant: OffsetDateTime, refresh_ahead: Duration) -> bool {
		instant < self.stale_at(refresh_ahead)
	}

	/// Returns `true` once the token itself has expired.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Summarizes the snapshot for diagnostics without exposing the secret.
	pub fn info_at(&self, instant: OffsetDateTime, refresh_ahead: Duration) -> TokenInfo {
		TokenInfo {
			valid: self.is_valid_at(instant, refresh_ahead),
			remaining: self.expires_at - instant,
			expires_at: self.expires_at,
		}
	}
}
impl Debug for TokenSnapshot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSnapshot")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Diagnostic view of the cached token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenInfo {
	/// Whether the token is outside the refresh-ahead window.
	pub valid: bool,
	/// Time left until expiry; negative once expired.
	pub remaining: Duration,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl Display for TokenInfo {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"Token Info - Valid: {}, Remaining: {} minutes, Expires at: {}",
			self.valid,
			self.remaining.whole_minutes(),
			self.expires_at
		)
	}
}
