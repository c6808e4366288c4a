//! Minimal bot platform client that sends channel messages with manager-issued tokens.

// std
use std::time::Duration as StdDuration;
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	ext::{BearerSigner, RequestSignerExt},
	manager::TokenManager,
};

/// Default connect timeout for platform calls.
pub const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
/// Default overall timeout for platform calls.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

#[derive(Serialize)]
struct MessageBody<'a> {
	content: &'a Value,
}

/// Posts messages to `{base_url}/bots/{bot_id}/channels/{channel_id}/messages`.
#[derive(Clone, Debug)]
pub struct BotClient {
	manager: TokenManager,
	base_url: Url,
	http_client: ReqwestClient,
}
impl BotClient {
	/// Creates a client with the default platform timeouts.
	pub fn new(manager: TokenManager, base_url: Url) -> Result<Self> {
		let http_client = ReqwestClient::builder()
			.connect_timeout(DEFAULT_CONNECT_TIMEOUT)
			.timeout(DEFAULT_REQUEST_TIMEOUT)
			.build()
			.map_err(ConfigError::from)?;

		Self::with_client(manager, base_url, http_client)
	}

	/// Creates a client reusing `http_client`.
	pub fn with_client(
		manager: TokenManager,
		base_url: Url,
		http_client: ReqwestClient,
	) -> Result<Self> {
		if base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidValue {
				field: "baseUrl",
				reason: "must be a hierarchical URL",
			}
			.into());
		}

		Ok(Self { manager, base_url, http_client })
	}

	/// Sends `content` to a channel and returns the platform's response body.
	///
	/// `content` is forwarded untouched as the `content` member of the JSON body. Non-2xx
	/// answers surface as [`Error::Delivery`].
	pub async fn send_message(
		&self,
		bot_id: &str,
		channel_id: &str,
		content: Value,
	) -> Result<String> {
		let url = self.message_url(bot_id, channel_id)?;
		let token = self.manager.access_token().await?;

		tracing::debug!(%url, "Sending bot message.");

		let request = self.http_client.post(url).json(&MessageBody { content: &content });
		let Ok(request) = BearerSigner.attach_token(request, &token);
		let response = request.send().await.map_err(TransportError::platform)?;
		let status = response.status();
		let body = response.text().await.map_err(TransportError::platform)?;

		if !status.is_success() {
			tracing::warn!(status = status.as_u16(), %body, "Bot message rejected.");

			return Err(Error::Delivery { status: status.as_u16(), body });
		}

		tracing::info!(bot_id, channel_id, "Bot message delivered.");

		Ok(body)
	}

	fn message_url(&self, bot_id: &str, channel_id: &str) -> Result<Url> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|()| ConfigError::InvalidValue {
				field: "baseUrl",
				reason: "must be a hierarchical URL",
			})?
			.pop_if_empty()
			.extend(["bots", bot_id, "channels", channel_id, "messages"]);

		Ok(url)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn client(base: &str) -> BotClient {
		let manager = TokenManager::builder(test_config("https://auth.example.com/token"))
			.http_client(Arc::new(ScriptedHttpClient::default()))
			.build()
			.expect("Manager should build.");

		BotClient::with_client(
			manager,
			Url::parse(base).expect("Base URL should parse."),
			ReqwestClient::new(),
		)
		.expect("Bot client should build.")
	}

	#[test]
	fn message_url_appends_segments_to_base_path() {
		let url = client("https://bots.example.com/v1.0/")
			.message_url("bot 1", "chan")
			.expect("URL should build.");

		assert_eq!(url.as_str(), "https://bots.example.com/v1.0/bots/bot%201/channels/chan/messages");
	}

	#[test]
	fn opaque_base_urls_are_rejected() {
		let manager = TokenManager::builder(test_config("https://auth.example.com/token"))
			.http_client(Arc::new(ScriptedHttpClient::default()))
			.build()
			.expect("Manager should build.");
		let err = BotClient::with_client(
			manager,
			Url::parse("mailto:bots@example.com").expect("URL should parse."),
			ReqwestClient::new(),
		)
		.expect_err("Opaque URLs cannot carry paths.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidValue { field: "baseUrl", .. })));
	}

	#[tokio::test]
	async fn send_requires_an_initialized_manager() {
		let err = client("https://bots.example.com")
			.send_message("b", "c", serde_json::json!({ "type": "text", "text": "hi" }))
			.await
			.expect_err("Uninitialized manager cannot sign.");

		assert!(matches!(err, Error::NotInitialized));
	}
}
