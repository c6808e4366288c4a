#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use bearer_token_manager::{bot::BotClient, error::Error, url::Url};
use common::*;

async fn initialized_bot(server: &MockServer) -> BotClient {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("bot-access", 86400));
		})
		.await;

	let manager = fast_manager(config_for(server));

	manager.initialize().await.expect("Initialization should succeed.");

	BotClient::new(
		manager,
		Url::parse(&server.url("/v1.0")).expect("Mock platform URL should parse successfully."),
	)
	.expect("Bot client should build.")
}

#[tokio::test]
async fn send_message_posts_content_with_bearer_header() {
	let server = MockServer::start_async().await;
	let bot = initialized_bot(&server).await;
	let content = json!({ "type": "text", "text": "Deployment finished." });
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1.0/bots/2000001/channels/ch-42/messages")
				.header("authorization", "Bearer bot-access")
				.header("content-type", "application/json")
				.json_body(json!({ "content": { "type": "text", "text": "Deployment finished." } }));
			then.status(201).body("{\"messageId\":\"m-1\"}");
		})
		.await;
	let body = bot
		.send_message("2000001", "ch-42", content)
		.await
		.expect("Message should be delivered.");

	assert_eq!(body, "{\"messageId\":\"m-1\"}");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_message_surfaces_status_and_body() {
	let server = MockServer::start_async().await;
	let bot = initialized_bot(&server).await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1.0/bots/b/channels/c/messages");
			then.status(403).body("{\"code\":\"FORBIDDEN\"}");
		})
		.await;
	let err = bot
		.send_message("b", "c", json!("plain"))
		.await
		.expect_err("Platform rejects the message.");

	match err {
		Error::Delivery { status, body } => {
			assert_eq!(status, 403);
			assert!(body.contains("FORBIDDEN"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	mock.assert_calls_async(1).await;
}
