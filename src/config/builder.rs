// self
use crate::{
	_prelude::*,
	config::{CredentialConfig, PrivateKeyPem, defaults},
	error::ConfigError,
};

/// Builder for [`CredentialConfig`] values.
#[derive(Debug)]
pub struct CredentialConfigBuilder {
	/// OAuth client identifier.
	pub client_id: Option<String>,
	/// Service account identifier.
	pub service_account: Option<String>,
	/// OAuth client secret.
	pub client_secret: Option<String>,
	/// Requested scope string.
	pub scope: Option<String>,
	/// Token endpoint.
	pub token_server: Option<Url>,
	/// Signing key material.
	pub private_key: Option<PrivateKeyPem>,
	/// Refresh-ahead window in minutes.
	pub refresh_before_expire_minutes: u32,
	/// Total exchange attempts.
	pub max_retry_count: u32,
	/// Background renewal toggle.
	pub auto_refresh: bool,
	/// Connect timeout in milliseconds.
	pub connect_timeout_ms: u64,
	/// Request timeout in milliseconds.
	pub request_timeout_ms: u64,
	/// Refresh wait cap in milliseconds.
	pub refresh_wait_timeout_ms: u64,
}
impl Default for CredentialConfigBuilder {
	fn default() -> Self {
		Self {
			client_id: None,
			service_account: None,
			client_secret: None,
			scope: None,
			token_server: None,
			private_key: None,
			refresh_before_expire_minutes: defaults::refresh_before_expire_minutes(),
			max_retry_count: defaults::max_retry_count(),
			auto_refresh: false,
			connect_timeout_ms: defaults::connect_timeout_ms(),
			request_timeout_ms: defaults::request_timeout_ms(),
			refresh_wait_timeout_ms: defaults::refresh_wait_timeout_ms(),
		}
	}
}
impl CredentialConfigBuilder {
	/// Sets the client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the service account identifier.
	pub fn service_account(mut self, value: impl Into<String>) -> Self {
		self.service_account = Some(value.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(value.into());

		self
	}

	/// Sets the requested scope string.
	pub fn scope(mut self, value: impl Into<String>) -> Self {
		self.scope = Some(value.into());

		self
	}

	/// Sets the token endpoint.
	pub fn token_server(mut self, url: Url) -> Self {
		self.token_server = Some(url);

		self
	}

	/// Sets the signing key.
	pub fn private_key(mut self, pem: PrivateKeyPem) -> Self {
		self.private_key = Some(pem);

		self
	}

	/// Overrides the refresh-ahead window (defaults to 5 minutes).
	pub fn refresh_before_expire_minutes(mut self, minutes: u32) -> Self {
		self.refresh_before_expire_minutes = minutes;

		self
	}

	/// Overrides the number of exchange attempts (defaults to 3).
	pub fn max_retry_count(mut self, attempts: u32) -> Self {
		self.max_retry_count = attempts;

		self
	}

	/// Enables or disables background renewal.
	pub fn auto_refresh(mut self, enabled: bool) -> Self {
		self.auto_refresh = enabled;

		self
	}

	/// Overrides the transport connect timeout.
	pub fn connect_timeout_ms(mut self, millis: u64) -> Self {
		self.connect_timeout_ms = millis;

		self
	}

	/// Overrides the transport request timeout.
	pub fn request_timeout_ms(mut self, millis: u64) -> Self {
		self.request_timeout_ms = millis;

		self
	}

	/// Overrides how long callers wait on another caller's refresh (defaults to 5 seconds).
	pub fn refresh_wait_timeout_ms(mut self, millis: u64) -> Self {
		self.refresh_wait_timeout_ms = millis;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<CredentialConfig, ConfigError> {
		let config = CredentialConfig {
			client_id: self.client_id.ok_or(ConfigError::MissingField { field: "clientId" })?,
			service_account: self
				.service_account
				.ok_or(ConfigError::MissingField { field: "serviceAccount" })?,
			client_secret: self
				.client_secret
				.ok_or(ConfigError::MissingField { field: "clientSecret" })?,
			scope: self.scope.ok_or(ConfigError::MissingField { field: "scope" })?,
			token_server: self
				.token_server
				.ok_or(ConfigError::MissingField { field: "tokenServer" })?,
			private_key: self.private_key.ok_or(ConfigError::MissingField { field: "privateKey" })?,
			refresh_before_expire_minutes: self.refresh_before_expire_minutes,
			max_retry_count: self.max_retry_count,
			auto_refresh: self.auto_refresh,
			connect_timeout_ms: self.connect_timeout_ms,
			request_timeout_ms: self.request_timeout_ms,
			refresh_wait_timeout_ms: self.refresh_wait_timeout_ms,
		};

		config.validate()?;

		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn build_reports_first_missing_field() {
		let err = CredentialConfig::builder()
			.client_id("client")
			.build()
			.expect_err("Builder should reject incomplete configuration.");

		assert!(matches!(err, ConfigError::MissingField { field: "serviceAccount" }));
	}
}
