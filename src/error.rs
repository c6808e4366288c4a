//! Manager-level error types shared across the signer, exchange client, and coordinator.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at construction.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Every exchange attempt failed while acquiring the first token.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// A steady-state refresh exhausted its retries.
	#[error("Token refresh failed.")]
	Refresh {
		/// Exhausted exchange that caused the refresh to fail.
		#[source]
		source: TokenExchangeError,
	},
	/// The manager was used before [`initialize`](crate::TokenManager::initialize) succeeded.
	#[error("Token manager is not initialized; call initialize() first.")]
	NotInitialized,
	/// The manager was shut down while a backoff sleep or refresh wait was pending.
	#[error("Token operation was cancelled.")]
	Cancelled,
	/// The bot platform rejected an outbound message.
	#[error("Message delivery failed with HTTP {status}: {body}.")]
	Delivery {
		/// HTTP status returned by the platform.
		status: u16,
		/// Response body returned by the platform.
		body: String,
	},
	/// Transport failure while delivering an outbound message.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns `true` if the error reports a cancelled operation.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required option was absent or empty.
	#[error("Required option `{field}` is missing.")]
	MissingField {
		/// Option name as it appears in configuration.
		field: &'static str,
	},
	/// A numeric option is outside its accepted range.
	#[error("Option `{field}` is invalid: {reason}.")]
	InvalidValue {
		/// Option name as it appears in configuration.
		field: &'static str,
		/// Human-readable constraint that was violated.
		reason: &'static str,
	},
	/// Private key material is not PEM-armored base64.
	#[error("Private key is not valid base64.")]
	PrivateKeyEncoding {
		/// Underlying decoding failure.
		#[source]
		source: base64::DecodeError,
	},
	/// Private key could not be loaded or used for RS256 signing.
	#[error("Private key could not be loaded as an RSA signing key.")]
	PrivateKey {
		/// Underlying key or signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Raised once every exchange attempt has failed.
#[derive(Debug, ThisError)]
#[error("Token exchange failed after {attempts} attempt(s).")]
pub struct TokenExchangeError {
	/// Number of attempts performed.
	pub attempts: u32,
	/// Failure reported by the final attempt.
	#[source]
	pub source: AttemptError,
}

/// Failure of a single exchange attempt.
#[derive(Debug, ThisError)]
pub enum AttemptError {
	/// The token endpoint answered, but not with a usable token.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// The token endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl AttemptError {
	/// HTTP status code attached to the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transient(TransientError::TokenEndpoint { status, .. }) => Some(*status),
			Self::Transient(TransientError::TokenResponseParse { status, .. }) => Some(*status),
			Self::Transport(_) => None,
		}
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned a non-success status.
	#[error("Token endpoint returned HTTP {status}: {body}.")]
	TokenEndpoint {
		/// HTTP status code.
		status: u16,
		/// Response body, lossily decoded.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed into a token.
	#[error("Token endpoint returned a malformed token response.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Which remote endpoint was being called.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised against the token endpoint.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint: "the token endpoint", source: Box::new(src) }
	}

	/// Wraps a transport-specific network error raised against the bot platform.
	pub fn platform(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint: "the bot platform", source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_error_chains_to_last_attempt() {
		let err = Error::Refresh {
			source: TokenExchangeError {
				attempts: 3,
				source: TransientError::TokenEndpoint {
					status: 503,
					body: "down".into(),
					retry_after: None,
				}
				.into(),
			},
		};
		let exchange = err.source().expect("Refresh errors should expose their exchange failure.");

		assert_eq!(exchange.to_string(), "Token exchange failed after 3 attempt(s).");

		let attempt = exchange.source().expect("Exchange errors should expose the last attempt.");

		assert_eq!(attempt.to_string(), "Token endpoint returned HTTP 503: down.");
	}

	#[test]
	fn attempt_status_reports_http_failures_only() {
		let transient: AttemptError =
			TransientError::TokenEndpoint { status: 401, body: String::new(), retry_after: None }
				.into();
		let transport: AttemptError = TransportError::Io(std::io::Error::other("reset")).into();

		assert_eq!(transient.status(), Some(401));
		assert_eq!(transport.status(), None);
	}
}
