//! Transport primitives for token exchanges.
//!
//! [`TokenHttpClient`] is the exchange client's only dependency on an HTTP stack. The default
//! [`ReqwestHttpClient`] covers production use; tests and custom stacks implement the trait
//! directly and hand it to [`TokenManager::with_http_client`](crate::TokenManager::with_http_client).

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::{
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::{config::CredentialConfig, error::ConfigError};

/// Boxed future returned by [`TokenHttpClient::post_form`].
pub type TokenHttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenHttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of posting form-encoded token requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// coordinator, the scheduler task, and every caller task without additional wrappers.
/// Non-success statuses are not transport errors; return them as a [`TokenHttpResponse`] so
/// the exchange client can classify and retry them.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `form` as an `application/x-www-form-urlencoded` POST to `url`.
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(&'static str, String)])
	-> TokenHttpFuture<'a>;
}

/// Raw response captured from the token endpoint.
#[derive(Clone, Debug, Default)]
pub struct TokenHttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl TokenHttpResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects; token endpoints return results directly. Use
/// [`ReqwestHttpClient::from_config`] to get that policy together with the configured timeouts,
/// or disable redirects yourself on any client passed to [`ReqwestHttpClient::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client using the configured connect/request timeouts with redirects disabled.
	pub fn from_config(config: &CredentialConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.connect_timeout(config.connect_timeout())
			.timeout(config.request_timeout())
			.redirect(Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn post_form<'a>(
		&'a self,
		url: &'a Url,
		form: &'a [(&'static str, String)],
	) -> TokenHttpFuture<'a> {
		Box::pin(async move {
			let response = self.0.post(url.clone()).form(form).send().await?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(TokenHttpResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
