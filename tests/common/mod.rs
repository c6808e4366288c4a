#![allow(dead_code)]

// crates.io
use httpmock::MockServer;
// self
use bearer_token_manager::{CredentialConfig, TokenManager, config::PrivateKeyPem, url::Url};

pub const CLIENT_ID: &str = "it-client";
pub const SERVICE_ACCOUNT: &str = "svc@it.example";
pub const CLIENT_SECRET: &str = "it-secret";
pub const PRIVATE_KEY: &str = include_str!("../fixtures/service_account.pem");

pub fn token_body(access_token: &str, expires_in: u64) -> String {
	format!("{{\"access_token\":\"{access_token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}")
}

pub fn config_for(server: &MockServer) -> CredentialConfig {
	CredentialConfig::builder()
		.client_id(CLIENT_ID)
		.service_account(SERVICE_ACCOUNT)
		.client_secret(CLIENT_SECRET)
		.scope("bot bot.message")
		.token_server(
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully."),
		)
		.private_key(PrivateKeyPem::from_block(PRIVATE_KEY))
		.build()
		.expect("Integration test configuration should build.")
}

pub fn fast_manager(config: CredentialConfig) -> TokenManager {
	TokenManager::builder(config)
		.backoff_step(std::time::Duration::from_millis(10))
		.build()
		.expect("Manager should build with the reqwest transport.")
}
