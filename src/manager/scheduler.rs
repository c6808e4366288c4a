//! Background renewal loop.
//!
//! The task holds only a weak reference to the coordinator, so dropping the last
//! [`TokenManager`](super::TokenManager) ends it on the next tick even without a shutdown.

// std
use std::{sync::Weak, time::Duration as StdDuration};
// crates.io
use tokio::{
	task::JoinHandle,
	time::{Instant, MissedTickBehavior},
};
// self
use crate::{_prelude::*, auth::TokenSnapshot, manager::Inner};

/// Starts the periodic refresh task for `inner`.
///
/// The first tick fires when `snapshot` enters the refresh-ahead window; later ticks repeat
/// every window length. A failed tick is logged and the loop continues.
pub(super) fn spawn(inner: &Arc<Inner>, snapshot: &TokenSnapshot) -> JoinHandle<()> {
	let window = inner.config.refresh_ahead();
	let period = StdDuration::try_from(window).unwrap_or(StdDuration::from_secs(1));
	let delay = initial_delay(snapshot.stale_at(window), inner.clock.now());
	let cancel = inner.cancel.clone();
	let weak = Arc::downgrade(inner);

	tracing::info!(
		delay_secs = delay.as_secs(),
		period_secs = period.as_secs(),
		"Auto refresh scheduled."
	);

	tokio::spawn(async move {
		let now = Instant::now();
		let start = now.checked_add(delay).unwrap_or(now + period);
		let mut ticks = tokio::time::interval_at(start, period);

		ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				_ = ticks.tick() => {},
			}

			let Some(inner) = Weak::upgrade(&weak) else {
				break;
			};

			inner.auto_refresh_tick().await;
		}

		tracing::debug!("Auto refresh stopped.");
	})
}

/// Time until `stale_at`, clamped at zero.
pub(super) fn initial_delay(stale_at: OffsetDateTime, now: OffsetDateTime) -> StdDuration {
	StdDuration::try_from(stale_at - now).unwrap_or(StdDuration::ZERO)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::{TokenManager, _preludet::*, clock::ManualClock};

	#[test]
	fn initial_delay_clamps_past_instants_to_zero() {
		let now = datetime!(2025-06-01 12:00 UTC);

		assert_eq!(initial_delay(now + Duration::minutes(55), now), StdDuration::from_secs(3300));
		assert_eq!(initial_delay(now - Duration::seconds(1), now), StdDuration::ZERO);
	}

	fn auto_manager(http: &ScriptedHttpClient, clock: &ManualClock) -> TokenManager {
		let mut config = test_config("https://auth.example.com/token");

		config.auto_refresh = true;

		TokenManager::builder(config)
			.http_client(Arc::new(http.clone()))
			.clock(clock.clone())
			.build()
			.expect("Manager should build.")
	}

	#[tokio::test(start_paused = true)]
	async fn tick_refreshes_once_the_token_turns_stale() {
		let http = ScriptedHttpClient::granting("first", 3600);
		let clock = ManualClock::default();
		let manager = auto_manager(&http, &clock);

		manager.initialize().await.expect("Initialization should succeed.");
		http.push(Scripted::Respond(200, r#"{"access_token":"second","expires_in":3600}"#.into()));

		tokio::time::sleep(StdDuration::from_secs(55 * 60 - 1)).await;

		assert_eq!(http.calls(), 1);

		clock.advance(Duration::minutes(55));
		tokio::time::sleep(StdDuration::from_secs(2)).await;

		assert_eq!(http.calls(), 2);
		assert_eq!(
			manager.snapshot().expect("Snapshot should exist.").access_token.expose(),
			"second"
		);
	}

	#[tokio::test(start_paused = true)]
	async fn failed_tick_keeps_the_loop_alive() {
		let http = ScriptedHttpClient::granting("first", 3600);
		let clock = ManualClock::default();
		let manager = auto_manager(&http, &clock);

		manager.initialize().await.expect("Initialization should succeed.");
		http.push(Scripted::Respond(503, "down".into()));
		clock.advance(Duration::minutes(56));

		// First tick at 55m: three failed attempts with 1s + 2s backoff.
		tokio::time::sleep(StdDuration::from_secs(55 * 60 + 10)).await;

		assert_eq!(http.calls(), 4);
		assert_eq!(manager.metrics().failures(), 1);

		http.push(Scripted::Respond(200, r#"{"access_token":"back","expires_in":3600}"#.into()));
		tokio::time::sleep(StdDuration::from_secs(5 * 60)).await;

		assert_eq!(http.calls(), 5);
		assert_eq!(manager.access_token().await.expect("Recovered read").expose(), "back");
	}

	#[tokio::test(start_paused = true)]
	async fn oversized_lifetime_is_scheduled_without_panicking() {
		let http = ScriptedHttpClient::granting("long", 10_000_000_000_000);
		let clock = ManualClock::default();
		let manager = auto_manager(&http, &clock);

		manager.initialize().await.expect("Initialization should succeed.");

		let snapshot = manager.snapshot().expect("Snapshot should exist.");

		assert_eq!(snapshot.expires_at - snapshot.issued_at, crate::exchange::MAX_TOKEN_LIFETIME);

		tokio::time::sleep(StdDuration::from_secs(24 * 60 * 60)).await;

		assert_eq!(http.calls(), 1);
		assert!(manager.is_token_valid());
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_stops_the_loop() {
		let http = ScriptedHttpClient::granting("first", 3600);
		let clock = ManualClock::default();
		let manager = auto_manager(&http, &clock);

		manager.initialize().await.expect("Initialization should succeed.");
		manager.shutdown();
		clock.advance(Duration::minutes(59));
		tokio::time::sleep(StdDuration::from_secs(60 * 60)).await;

		assert_eq!(http.calls(), 1);
		assert!(matches!(manager.force_refresh().await, Err(Error::Cancelled)));
	}
}
