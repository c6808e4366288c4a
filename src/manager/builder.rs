// std
use std::{sync::atomic::AtomicBool, time::Duration as StdDuration};
// crates.io
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::CredentialConfig,
	error::ConfigError,
	exchange::{LinearBackoff, TokenExchangeClient},
	http::TokenHttpClient,
	manager::{Inner, RefreshMetrics, TokenManager},
};

/// Assembles a [`TokenManager`] from a configuration plus optional collaborators.
///
/// Without an explicit transport the builder provisions a reqwest client honoring the
/// configured timeouts (requires the `reqwest` feature).
pub struct TokenManagerBuilder {
	config: CredentialConfig,
	http_client: Option<Arc<dyn TokenHttpClient>>,
	clock: Arc<dyn Clock>,
	backoff_step: StdDuration,
}
impl TokenManagerBuilder {
	/// Starts a builder for `config` with the system clock and one second backoff step.
	pub fn new(config: CredentialConfig) -> Self {
		Self {
			config,
			http_client: None,
			clock: Arc::new(SystemClock),
			backoff_step: LinearBackoff::DEFAULT_STEP,
		}
	}

	/// Uses `http_client` for token requests.
	pub fn http_client(mut self, http_client: Arc<dyn TokenHttpClient>) -> Self {
		self.http_client = Some(http_client);

		self
	}

	/// Uses `clock` for staleness decisions.
	pub fn clock(mut self, clock: impl Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Overrides the linear backoff step between exchange attempts.
	pub fn backoff_step(mut self, step: StdDuration) -> Self {
		self.backoff_step = step;

		self
	}

	/// Validates the configuration, loads the signing key, and builds the manager.
	///
	/// No network traffic happens here; call [`TokenManager::initialize`] to fetch the first
	/// token.
	pub fn build(self) -> Result<TokenManager> {
		self.config.validate()?;

		let http_client = match self.http_client {
			Some(client) => client,
			None => default_http_client(&self.config)?,
		};
		let config = Arc::new(self.config);
		let cancel = CancellationToken::new();
		let backoff = LinearBackoff::new(config.max_retry_count).with_step(self.backoff_step);
		let exchange = TokenExchangeClient::new(config.clone(), http_client, cancel.clone())?
			.with_backoff(backoff);

		tracing::debug!(
			client_id = %config.client_id,
			token_server = %config.token_server,
			auto_refresh = config.auto_refresh,
			"Token manager configured."
		);

		Ok(TokenManager {
			inner: Arc::new(Inner {
				config,
				exchange,
				clock: self.clock,
				snapshot: RwLock::new(None),
				initialized: AtomicBool::new(false),
				in_flight: AtomicBool::new(false),
				refresh_gate: AsyncMutex::new(()),
				refreshed: Notify::new(),
				scheduler: Mutex::new(None),
				cancel,
				metrics: RefreshMetrics::default(),
			}),
		})
	}
}
impl Debug for TokenManagerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManagerBuilder")
			.field("config", &self.config)
			.field("http_client_set", &self.http_client.is_some())
			.field("backoff_step", &self.backoff_step)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_http_client(config: &CredentialConfig) -> Result<Arc<dyn TokenHttpClient>, ConfigError> {
	Ok(Arc::new(crate::http::ReqwestHttpClient::from_config(config)?))
}

#[cfg(not(feature = "reqwest"))]
fn default_http_client(_: &CredentialConfig) -> Result<Arc<dyn TokenHttpClient>, ConfigError> {
	Err(ConfigError::MissingField { field: "http_client" })
}
