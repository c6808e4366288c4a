//! Credential configuration for the JWT-bearer exchange.
//!
//! [`CredentialConfig`] is immutable once validated and is shared behind an `Arc` by the
//! signer, the exchange client, and the coordinator. It deserializes from the camelCase option
//! names used by bot platform deployments (`clientId`, `serviceAccount`, `tokenServer`,
//! `refreshBeforeExpireMinutes`, ...) so callers can load it from whichever file format they
//! already use, or assemble it with [`CredentialConfig::builder`].

mod builder;
mod private_key;

pub use builder::*;
pub use private_key::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Settings consumed by the token lifecycle manager.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialConfig {
	/// OAuth client identifier; also the assertion issuer.
	pub client_id: String,
	/// Service account identifier; the assertion subject.
	pub service_account: String,
	/// OAuth client secret sent with every exchange.
	pub client_secret: String,
	/// Scope string requested with every exchange.
	pub scope: String,
	/// Token endpoint URL.
	pub token_server: Url,
	/// PEM-armored RSA private key used to sign assertions.
	pub private_key: PrivateKeyPem,
	/// Minutes before expiry at which a cached token is treated as stale.
	#[serde(default = "defaults::refresh_before_expire_minutes")]
	pub refresh_before_expire_minutes: u32,
	/// Total exchange attempts before giving up.
	#[serde(default = "defaults::max_retry_count")]
	pub max_retry_count: u32,
	/// Whether to renew the token proactively in the background.
	#[serde(default)]
	pub auto_refresh: bool,
	/// TCP connect timeout for token requests, in milliseconds.
	#[serde(default = "defaults::connect_timeout_ms")]
	pub connect_timeout_ms: u64,
	/// Overall timeout for a single token request, in milliseconds.
	#[serde(default = "defaults::request_timeout_ms")]
	pub request_timeout_ms: u64,
	/// Longest time a caller waits on another caller's refresh, in milliseconds.
	#[serde(default = "defaults::refresh_wait_timeout_ms")]
	pub refresh_wait_timeout_ms: u64,
}
impl CredentialConfig {
	/// Returns a builder seeded with default tuning values.
	pub fn builder() -> CredentialConfigBuilder {
		CredentialConfigBuilder::default()
	}

	/// Refresh-ahead window as a signed duration.
	pub fn refresh_ahead(&self) -> Duration {
		Duration::minutes(i64::from(self.refresh_before_expire_minutes))
	}

	/// Connect timeout for the default HTTP transport.
	pub fn connect_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.connect_timeout_ms)
	}

	/// Request timeout for the default HTTP transport.
	pub fn request_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.request_timeout_ms)
	}

	/// Upper bound on how long a caller waits for someone else's refresh.
	pub fn refresh_wait_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.refresh_wait_timeout_ms)
	}

	/// Validates invariants that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		require("clientId", &self.client_id)?;
		require("serviceAccount", &self.service_account)?;
		require("clientSecret", &self.client_secret)?;
		require("scope", &self.scope)?;

		if self.private_key.is_empty() {
			return Err(ConfigError::MissingField { field: "privateKey" });
		}
		if !matches!(self.token_server.scheme(), "http" | "https") {
			return Err(ConfigError::InvalidValue {
				field: "tokenServer",
				reason: "must be an http(s) URL",
			});
		}
		if self.max_retry_count == 0 {
			return Err(ConfigError::InvalidValue {
				field: "maxRetryCount",
				reason: "at least one attempt is required",
			});
		}
		if self.auto_refresh && self.refresh_before_expire_minutes == 0 {
			return Err(ConfigError::InvalidValue {
				field: "refreshBeforeExpireMinutes",
				reason: "auto refresh needs a non-zero refresh window",
			});
		}

		Ok(())
	}
}
impl Debug for CredentialConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialConfig")
			.field("client_id", &self.client_id)
			.field("service_account", &self.service_account)
			.field("client_secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("token_server", &self.token_server.as_str())
			.field("private_key", &self.private_key)
			.field("refresh_before_expire_minutes", &self.refresh_before_expire_minutes)
			.field("max_retry_count", &self.max_retry_count)
			.field("auto_refresh", &self.auto_refresh)
			.finish_non_exhaustive()
	}
}

pub(crate) mod defaults {
	pub(crate) const fn refresh_before_expire_minutes() -> u32 {
		5
	}

	pub(crate) const fn max_retry_count() -> u32 {
		3
	}

	pub(crate) const fn connect_timeout_ms() -> u64 {
		3_000
	}

	pub(crate) const fn request_timeout_ms() -> u64 {
		10_000
	}

	pub(crate) const fn refresh_wait_timeout_ms() -> u64 {
		5_000
	}
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::MissingField { field }) } else { Ok(()) }
}
