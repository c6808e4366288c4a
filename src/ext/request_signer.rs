//! Request signing contracts that attach manager-issued bearer tokens to arbitrary HTTP clients.

// self
use crate::auth::TokenSecret;

/// Describes how to attach a [`TokenSecret`] to an outbound request without constraining the
/// HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects an `Authorization` header derived from
	/// `token`.
	fn attach_token(&self, request: Request, token: &TokenSecret) -> Result<Request, Error>;
}

/// Signs requests with `Authorization: Bearer <token>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BearerSigner;
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, std::convert::Infallible> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &TokenSecret,
	) -> Result<reqwest::RequestBuilder, std::convert::Infallible> {
		Ok(request.header(reqwest::header::AUTHORIZATION, token.bearer()))
	}
}
