#![cfg(feature = "reqwest")]

mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
// self
use bearer_token_manager::error::Error;
use common::*;

#[tokio::test]
async fn access_token_requires_initialize() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(token_body("x", 3600));
		})
		.await;
	let manager = fast_manager(config_for(&server));
	let err = manager.access_token().await.expect_err("Reads before initialize must fail.");

	assert!(matches!(err, Error::NotInitialized));

	mock.assert_calls_async(0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stale_reads_trigger_a_single_exchange() {
	let server = MockServer::start_async().await;
	let initial = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("short-lived", 120));
		})
		.await;
	let manager = fast_manager(config_for(&server));

	manager.initialize().await.expect("Initialization should succeed.");
	initial.assert_calls_async(1).await;
	initial.delete_async().await;

	// Two minutes of lifetime sits inside the five minute refresh window.
	assert!(!manager.is_token_valid());

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.delay(Duration::from_millis(300))
				.header("content-type", "application/json")
				.body(token_body("refreshed", 3600));
		})
		.await;
	let readers = (0..8)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.access_token().await })
		})
		.collect::<Vec<_>>();

	for reader in readers {
		let token = reader
			.await
			.expect("Reader task should not panic.")
			.expect("Concurrent read should succeed.");

		assert_eq!(token.expose(), "refreshed");
	}

	assert!(manager.is_token_valid());

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn force_refresh_replaces_a_valid_token() {
	let server = MockServer::start_async().await;
	let initial = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(token_body("one", 3600));
		})
		.await;
	let manager = fast_manager(config_for(&server));

	manager.initialize().await.expect("Initialization should succeed.");
	initial.delete_async().await;

	let forced = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(token_body("two", 3600));
		})
		.await;

	manager.force_refresh().await.expect("Forced refresh should succeed.");

	assert_eq!(manager.access_token().await.expect("Read after force").expose(), "two");

	forced.assert_calls_async(1).await;
}

#[tokio::test]
async fn outage_keeps_serving_the_cached_token() {
	let server = MockServer::start_async().await;
	let initial = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("still-good", 240));
		})
		.await;
	let manager = fast_manager(config_for(&server));

	manager.initialize().await.expect("Initialization should succeed.");
	initial.delete_async().await;

	let outage = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503).body("maintenance");
		})
		.await;
	let token = manager.access_token().await.expect("Cached token should survive the outage.");

	assert_eq!(token.expose(), "still-good");

	let err = manager.force_refresh().await.expect_err("Forced refresh hits the outage.");

	assert!(matches!(err, Error::Refresh { .. }));
	assert_eq!(manager.access_token().await.expect("Still cached").expose(), "still-good");
	assert_eq!(manager.metrics().failures(), 3);

	outage.assert_calls_async(9).await;
}

#[tokio::test]
async fn shutdown_interrupts_pending_backoff() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500).body("down");
		})
		.await;
	let manager = bearer_token_manager::TokenManager::builder(config_for(&server))
		.backoff_step(Duration::from_secs(30))
		.build()
		.expect("Manager should build.");
	let pending = {
		let manager = manager.clone();

		tokio::spawn(async move { manager.initialize().await })
	};

	tokio::time::sleep(Duration::from_millis(300)).await;
	manager.shutdown();

	let err = tokio::time::timeout(Duration::from_secs(5), pending)
		.await
		.expect("Shutdown should interrupt the backoff promptly.")
		.expect("Initialize task should not panic.")
		.expect_err("Cancelled initialize should fail.");

	assert!(err.is_cancelled());

	mock.assert_calls_async(1).await;
}
