//! Token cache and single-flight refresh coordination.
//!
//! [`TokenManager`] owns the only mutable shared state: the current [`TokenSnapshot`] and the
//! `in_flight` flag. Fresh reads take the snapshot lock just long enough to clone an `Arc` and
//! never touch the network. The first caller to observe a stale snapshot flips `in_flight`,
//! takes the refresh gate, re-checks validity, and performs the exchange; everyone else waits
//! (bounded by `refreshWaitTimeoutMs`) for the flag to clear and then returns whatever is
//! cached. The flag is cleared only after the new snapshot is published, so a caller that
//! sees `in_flight == false` also sees the new token.

mod builder;
mod metrics;
mod scheduler;

pub use builder::TokenManagerBuilder;
pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use tokio::{sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{TokenInfo, TokenSecret, TokenSnapshot},
	clock::Clock,
	config::CredentialConfig,
	exchange::TokenExchangeClient,
	http::TokenHttpClient,
	obs::{self, OpOutcome, OpSpan, TokenOp},
};

/// Produces valid bearer tokens on demand.
///
/// Cloning is cheap; every clone shares the same cache, refresh coordination, and scheduler.
/// Collaborators receive a handle explicitly instead of reaching for a global.
#[derive(Clone)]
pub struct TokenManager {
	inner: Arc<Inner>,
}
impl TokenManager {
	/// Returns a builder for `config`.
	pub fn builder(config: CredentialConfig) -> TokenManagerBuilder {
		TokenManagerBuilder::new(config)
	}

	/// Creates a manager backed by the default reqwest transport.
	///
	/// Fails with [`Error::Config`] if the configuration or signing key is invalid.
	#[cfg(feature = "reqwest")]
	pub fn new(config: CredentialConfig) -> Result<Self> {
		Self::builder(config).build()
	}

	/// Creates a manager that posts token requests through `http_client`.
	pub fn with_http_client(
		config: CredentialConfig,
		http_client: Arc<dyn TokenHttpClient>,
	) -> Result<Self> {
		Self::builder(config).http_client(http_client).build()
	}

	/// Acquires the first token; a no-op once initialization has succeeded.
	///
	/// Failure leaves the manager uninitialized and publishes nothing. When `autoRefresh` is
	/// configured the background scheduler starts after the first snapshot exists.
	pub async fn initialize(&self) -> Result<()> {
		const OP: TokenOp = TokenOp::Initialize;

		if self.is_initialized() {
			tracing::debug!("Token manager already initialized.");

			return Ok(());
		}

		let span = OpSpan::new(OP, "initialize");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let inner = &self.inner;

				inner.ensure_running()?;

				let _gate = inner.refresh_gate.lock().await;

				if inner.initialized.load(Ordering::Acquire) {
					return Ok(());
				}

				let snapshot = inner.exchange_and_publish().await?;

				inner.initialized.store(true, Ordering::Release);

				if inner.config.auto_refresh {
					*inner.scheduler.lock() = Some(scheduler::spawn(inner, &snapshot));
				}

				tracing::info!(
					service_account = %inner.config.service_account,
					expires_at = %snapshot.expires_at,
					"Token manager initialized."
				);

				Ok(())
			})
			.await;

		record_result(OP, &result);

		result
	}

	/// Returns a bearer token that is valid outside the refresh-ahead window.
	///
	/// Fails with [`Error::NotInitialized`] before [`initialize`](Self::initialize) succeeds.
	/// While the token endpoint is unavailable the last token keeps being served until it
	/// actually expires; only then does the refresh failure reach the caller.
	pub async fn access_token(&self) -> Result<TokenSecret> {
		let inner = &self.inner;

		if !inner.initialized.load(Ordering::Acquire) {
			return Err(Error::NotInitialized);
		}

		let current = inner.current()?;

		if inner.is_valid(&current) {
			return Ok(current.access_token.clone());
		}

		match inner.refresh_if_stale(TokenOp::Refresh).await {
			Ok(snapshot) => Ok(snapshot.access_token.clone()),
			Err(err @ Error::Refresh { .. }) => {
				let current = inner.current()?;

				if current.is_expired_at(inner.clock.now()) {
					Err(err)
				} else {
					tracing::warn!(
						error = %err,
						expires_at = %current.expires_at,
						"Serving cached token until it expires."
					);

					Ok(current.access_token.clone())
				}
			},
			Err(err) => Err(err),
		}
	}

	/// Performs exactly one exchange sequence regardless of staleness.
	///
	/// On failure the previous snapshot stays in place.
	pub async fn force_refresh(&self) -> Result<()> {
		const OP: TokenOp = TokenOp::ForceRefresh;

		let span = OpSpan::new(OP, "force_refresh");

		obs::record_op_outcome(OP, OpOutcome::Attempt);
		tracing::info!("Force refresh requested.");

		let result = span
			.instrument(async move {
				let inner = &self.inner;

				if !inner.initialized.load(Ordering::Acquire) {
					return Err(Error::NotInitialized);
				}

				inner.ensure_running()?;

				let _gate = inner.refresh_gate.lock().await;

				inner.metrics.record_attempt();

				match inner.exchange_and_publish().await {
					Ok(_) => {
						inner.metrics.record_success();
						tracing::info!("Force refresh completed.");

						Ok(())
					},
					Err(err) => {
						inner.metrics.record_failure();
						tracing::error!(error = %err, "Force refresh failed.");

						Err(into_refresh_error(err))
					},
				}
			})
			.await;

		record_result(OP, &result);

		result
	}

	/// Returns `true` once [`initialize`](Self::initialize) has succeeded.
	pub fn is_initialized(&self) -> bool {
		self.inner.initialized.load(Ordering::Acquire)
	}

	/// Returns `true` iff a token is cached and `now < expires_at - refresh_ahead`.
	pub fn is_token_valid(&self) -> bool {
		self.inner.current().is_ok_and(|snapshot| self.inner.is_valid(&snapshot))
	}

	/// Returns the cached snapshot, if any.
	pub fn snapshot(&self) -> Option<Arc<TokenSnapshot>> {
		self.inner.snapshot.read().clone()
	}

	/// Summarizes the cached token without exposing it.
	pub fn token_info(&self) -> Option<TokenInfo> {
		let snapshot = self.snapshot()?;

		Some(snapshot.info_at(self.inner.clock.now(), self.inner.config.refresh_ahead()))
	}

	/// Counters for exchanges and refresh outcomes.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.inner.metrics
	}

	/// Configuration the manager was built with.
	pub fn config(&self) -> &CredentialConfig {
		&self.inner.config
	}

	/// Stops the scheduler and cancels pending backoff sleeps and refresh waits.
	///
	/// Interrupted operations fail with [`Error::Cancelled`]; cached tokens stay readable.
	pub fn shutdown(&self) {
		self.inner.shutdown();
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("config", &self.inner.config)
			.field("initialized", &self.is_initialized())
			.field("snapshot", &self.snapshot())
			.finish_non_exhaustive()
	}
}

pub(crate) struct Inner {
	config: Arc<CredentialConfig>,
	exchange: TokenExchangeClient,
	clock: Arc<dyn Clock>,
	snapshot: RwLock<Option<Arc<TokenSnapshot>>>,
	initialized: AtomicBool,
	in_flight: AtomicBool,
	refresh_gate: AsyncMutex<()>,
	refreshed: Notify,
	scheduler: Mutex<Option<JoinHandle<()>>>,
	cancel: CancellationToken,
	metrics: RefreshMetrics,
}
impl Inner {
	fn current(&self) -> Result<Arc<TokenSnapshot>> {
		self.snapshot.read().clone().ok_or(Error::NotInitialized)
	}

	fn is_valid(&self, snapshot: &TokenSnapshot) -> bool {
		snapshot.is_valid_at(self.clock.now(), self.config.refresh_ahead())
	}

	fn ensure_running(&self) -> Result<()> {
		if self.cancel.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
	}

	async fn exchange_and_publish(&self) -> Result<Arc<TokenSnapshot>> {
		self.metrics.record_exchange();

		let exchanged = self.exchange.exchange().await?;
		let snapshot = Arc::new(TokenSnapshot::new(
			exchanged.access_token,
			self.clock.now(),
			exchanged.expires_in,
		));

		*self.snapshot.write() = Some(snapshot.clone());

		Ok(snapshot)
	}

	/// Single-flight refresh: one caller exchanges, the rest wait for it.
	async fn refresh_if_stale(&self, op: TokenOp) -> Result<Arc<TokenSnapshot>> {
		if self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
		{
			self.metrics.record_coalesced();
			self.wait_for_refresh().await?;

			return self.current();
		}

		let _flight = InFlightGuard(self);
		let span = OpSpan::new(op, "refresh_if_stale");

		obs::record_op_outcome(op, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let _gate = self.refresh_gate.lock().await;
				let current = self.current()?;

				self.metrics.record_attempt();

				if self.is_valid(&current) {
					self.metrics.record_success();

					return Ok(current);
				}

				tracing::info!("Refreshing access token.");

				match self.exchange_and_publish().await {
					Ok(snapshot) => {
						self.metrics.record_success();
						tracing::info!(expires_at = %snapshot.expires_at, "Access token refreshed.");

						Ok(snapshot)
					},
					Err(err) => {
						self.metrics.record_failure();
						tracing::error!(error = %err, "Failed to refresh access token.");

						Err(into_refresh_error(err))
					},
				}
			})
			.await;

		record_result(op, &result);

		result
	}

	/// Waits until no refresh is in flight, the wait cap elapses, or the manager shuts down.
	async fn wait_for_refresh(&self) -> Result<()> {
		let cleared = async {
			loop {
				let notified = self.refreshed.notified();
				let mut notified = std::pin::pin!(notified);

				notified.as_mut().enable();

				if !self.in_flight.load(Ordering::Acquire) {
					return;
				}

				notified.await;
			}
		};
		let limit = self.config.refresh_wait_timeout();

		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(Error::Cancelled),
			waited = tokio::time::timeout(limit, cleared) => {
				if waited.is_err() {
					tracing::warn!(
						waited_ms = limit.as_millis() as u64,
						"Refresh still in flight; returning the cached token."
					);
				}

				Ok(())
			},
		}
	}

	async fn auto_refresh_tick(&self) {
		let Ok(current) = self.current() else {
			return;
		};

		if self.is_valid(&current) {
			tracing::trace!("Cached token still valid; skipping auto refresh.");

			return;
		}

		tracing::info!("Auto refresh triggered.");

		match self.refresh_if_stale(TokenOp::AutoRefresh).await {
			Ok(_) => {},
			Err(Error::Cancelled) => tracing::debug!("Auto refresh cancelled."),
			Err(err) => tracing::error!(error = %err, "Auto refresh failed."),
		}
	}

	fn shutdown(&self) {
		self.cancel.cancel();

		if let Some(handle) = self.scheduler.lock().take() {
			handle.abort();
		}
	}
}
impl Drop for Inner {
	fn drop(&mut self) {
		self.shutdown();
	}
}

/// Clears `in_flight` and wakes waiters, even if the refreshing future is dropped mid-flight.
struct InFlightGuard<'a>(&'a Inner);
impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		self.0.in_flight.store(false, Ordering::Release);
		self.0.refreshed.notify_waiters();
	}
}

fn into_refresh_error(err: Error) -> Error {
	match err {
		Error::TokenExchange(source) => Error::Refresh { source },
		other => other,
	}
}

fn record_result<T>(op: TokenOp, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(op, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(op, OpOutcome::Failure),
	}
}
