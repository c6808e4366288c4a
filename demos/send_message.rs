//! Demonstrates initializing the token manager against a mock token endpoint and delivering a
//! bot message with the cached bearer token.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use bearer_token_manager::{
	CredentialConfig, TokenManager, bot::BotClient, config::PrivateKeyPem, url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":86400}",
			);
		})
		.await;
	let message_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/bots/demo-bot/channels/demo-channel/messages")
				.header("authorization", "Bearer demo-access");
			then.status(201).body("{\"ok\":true}");
		})
		.await;
	let config = CredentialConfig::builder()
		.client_id("demo-client")
		.service_account("demo@serviceaccount.example")
		.client_secret("demo-secret")
		.scope("bot")
		.token_server(Url::parse(&server.url("/token"))?)
		.private_key(PrivateKeyPem::from_block(include_str!("../tests/fixtures/service_account.pem")))
		.auto_refresh(true)
		.build()?;
	let manager = TokenManager::new(config)?;

	manager.initialize().await?;

	if let Some(info) = manager.token_info() {
		println!("{info}.");
	}

	let bot = BotClient::new(manager.clone(), Url::parse(&server.base_url())?)?;
	let response = bot
		.send_message("demo-bot", "demo-channel", json!({ "type": "text", "text": "Hello." }))
		.await?;

	println!("Platform response: {response}.");

	token_mock.assert_async().await;
	message_mock.assert_async().await;
	manager.shutdown();

	Ok(())
}
