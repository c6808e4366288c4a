//! JWT-bearer token exchange with linear retry.
//!
//! [`TokenExchangeClient::exchange`] signs a fresh assertion for every attempt, posts it to
//! the configured token endpoint, and retries failures (transport errors, non-2xx statuses,
//! malformed bodies) according to a [`LinearBackoff`]. Backoff sleeps race the manager's
//! cancellation token so a shutdown interrupts them immediately.

mod retry;

pub use retry::LinearBackoff;

// crates.io
use serde::Deserializer;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{AssertionSigner, TokenSecret},
	config::CredentialConfig,
	error::{AttemptError, TokenExchangeError, TransientError},
	http::{TokenHttpClient, TokenHttpResponse},
};

/// `grant_type` value for the JWT-bearer grant.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime assumed when the endpoint omits `expires_in` or reports zero.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::seconds(3600);
/// Upper bound applied to `expires_in`; larger values are clamped.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::days(365);

/// Access token and lifetime returned by a successful exchange.
#[derive(Clone, Debug)]
pub struct ExchangedToken {
	/// Bearer credential.
	pub access_token: TokenSecret,
	/// Lifetime reported by the endpoint, or [`DEFAULT_TOKEN_LIFETIME`].
	pub expires_in: Duration,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default, deserialize_with = "lenient_seconds")]
	expires_in: Option<u64>,
}

/// Performs the token exchange against a single endpoint.
pub struct TokenExchangeClient {
	config: Arc<CredentialConfig>,
	signer: AssertionSigner,
	http_client: Arc<dyn TokenHttpClient>,
	backoff: LinearBackoff,
	cancel: CancellationToken,
}
impl TokenExchangeClient {
	/// Creates a client; fails if the signing key in `config` is unusable.
	pub fn new(
		config: Arc<CredentialConfig>,
		http_client: Arc<dyn TokenHttpClient>,
		cancel: CancellationToken,
	) -> Result<Self> {
		let signer = AssertionSigner::new(&config)?;
		let backoff = LinearBackoff::new(config.max_retry_count);

		Ok(Self { config, signer, http_client, backoff, cancel })
	}

	/// Overrides the retry schedule.
	pub fn with_backoff(mut self, backoff: LinearBackoff) -> Self {
		self.backoff = backoff;

		self
	}

	/// Runs one exchange sequence, retrying until the attempt budget is spent.
	///
	/// Returns [`Error::TokenExchange`] wrapping the final attempt's failure, or
	/// [`Error::Cancelled`] if the cancellation token fires during a backoff sleep.
	pub async fn exchange(&self) -> Result<ExchangedToken> {
		let max_attempts = self.backoff.max_attempts;
		let mut attempt = 1;

		loop {
			let assertion = self.signer.sign()?;
			let err = match self.attempt(assertion).await {
				Ok(token) => return Ok(token),
				Err(err) => err,
			};

			tracing::warn!(attempt, max_attempts, error = %err, "Token request attempt failed.");

			let Some(delay) = self.backoff.delay_after(attempt) else {
				return Err(TokenExchangeError { attempts: attempt, source: err }.into());
			};

			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => {
					tracing::warn!(attempt, "Token request interrupted during backoff.");

					return Err(Error::Cancelled);
				},
				_ = tokio::time::sleep(delay) => {},
			}

			attempt += 1;
		}
	}

	async fn attempt(&self, assertion: String) -> Result<ExchangedToken, AttemptError> {
		let form = [
			("assertion", assertion),
			("grant_type", JWT_BEARER_GRANT_TYPE.to_owned()),
			("client_id", self.config.client_id.clone()),
			("client_secret", self.config.client_secret.clone()),
			("scope", self.config.scope.clone()),
		];
		let response = self.http_client.post_form(&self.config.token_server, &form).await?;

		parse_token_response(response)
	}
}
impl Debug for TokenExchangeClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeClient")
			.field("token_server", &self.config.token_server.as_str())
			.field("signer", &self.signer)
			.field("backoff", &self.backoff)
			.finish_non_exhaustive()
	}
}

fn parse_token_response(response: TokenHttpResponse) -> Result<ExchangedToken, AttemptError> {
	let status = response.status;

	if !response.is_success() {
		return Err(TransientError::TokenEndpoint {
			status,
			body: response.body_text(),
			retry_after: response.retry_after,
		}
		.into());
	}

	let mut de = serde_json::Deserializer::from_slice(&response.body);
	let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TransientError::TokenResponseParse { source, status })?;
	let expires_in = match parsed.expires_in {
		Some(0) | None => DEFAULT_TOKEN_LIFETIME,
		Some(secs) => i64::try_from(secs)
			.ok()
			.filter(|secs| *secs <= MAX_TOKEN_LIFETIME.whole_seconds())
			.map_or(MAX_TOKEN_LIFETIME, Duration::seconds),
	};

	tracing::debug!(expires_in = expires_in.whole_seconds(), "Token response parsed.");

	Ok(ExchangedToken { access_token: TokenSecret::new(parsed.access_token), expires_in })
}

// Some endpoints encode `expires_in` as a string.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(u64),
		Text(String),
	}

	match Option::<Raw>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Raw::Number(secs)) => Ok(Some(secs)),
		Some(Raw::Text(text)) =>
			text.trim().parse().map(Some).map_err(serde::de::Error::custom),
	}
}
