//! JWT-bearer access token lifecycle manager for bot platform clients.
//!
//! [`TokenManager`] signs RS256 assertions, exchanges them with retry, caches the resulting
//! token, and refreshes it ahead of expiry with at most one exchange in flight.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "reqwest")] pub mod bot;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod ext;
pub mod http;
pub mod manager;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		config::{CredentialConfig, PrivateKeyPem},
		error::TransportError,
		http::{TokenHttpClient, TokenHttpFuture, TokenHttpResponse},
	};

	/// PKCS#8 RSA key shared by unit tests.
	pub const TEST_PRIVATE_KEY: &str = include_str!("../tests/fixtures/service_account.pem");
	/// Public half of [`TEST_PRIVATE_KEY`], used to verify assertions.
	pub const TEST_PUBLIC_KEY: &str = include_str!("../tests/fixtures/service_account_pub.pem");

	/// Builds a valid configuration pointing at `token_server`.
	pub fn test_config(token_server: &str) -> CredentialConfig {
		CredentialConfig::builder()
			.client_id("test-client")
			.service_account("svc@test.example")
			.client_secret("test-secret")
			.scope("bot")
			.token_server(Url::parse(token_server).expect("Test token server URL should parse."))
			.private_key(PrivateKeyPem::from_block(TEST_PRIVATE_KEY))
			.build()
			.expect("Test configuration should build.")
	}

	/// Outcome replayed by [`ScriptedHttpClient`] for a single request.
	#[derive(Clone, Debug)]
	pub enum Scripted {
		/// Respond with the given status and body.
		Respond(u16, String),
		/// Fail at the transport layer.
		Unreachable,
	}

	/// Fake transport that replays scripted outcomes and counts requests.
	///
	/// Once the script is exhausted the last entry repeats.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedHttpClient {
		script: Arc<Mutex<VecDeque<Scripted>>>,
		last: Arc<Mutex<Option<Scripted>>>,
		forms: Arc<Mutex<Vec<Vec<(String, String)>>>>,
		calls: Arc<AtomicUsize>,
	}
	impl ScriptedHttpClient {
		/// Creates a client replaying `script` in order.
		pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
			Self { script: Arc::new(Mutex::new(script.into_iter().collect())), ..Default::default() }
		}

		/// Creates a client that always answers with a token valid for `expires_in` seconds.
		pub fn granting(access_token: &str, expires_in: u64) -> Self {
			Self::new([Scripted::Respond(
				200,
				format!("{{\"access_token\":\"{access_token}\",\"expires_in\":{expires_in}}}"),
			)])
		}

		/// Appends more outcomes to the script.
		pub fn push(&self, outcome: Scripted) {
			self.script.lock().push_back(outcome);
		}

		/// Number of requests observed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Form bodies observed so far.
		pub fn forms(&self) -> Vec<Vec<(String, String)>> {
			self.forms.lock().clone()
		}

		fn next(&self) -> Scripted {
			let mut last = self.last.lock();

			if let Some(next) = self.script.lock().pop_front() {
				*last = Some(next);
			}

			last.clone().unwrap_or(Scripted::Unreachable)
		}
	}
	impl TokenHttpClient for ScriptedHttpClient {
		fn post_form<'a>(
			&'a self,
			_url: &'a Url,
			form: &'a [(&'static str, String)],
		) -> TokenHttpFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				self.forms
					.lock()
					.push(form.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect());

				match self.next() {
					Scripted::Respond(status, body) => Ok(TokenHttpResponse {
						status,
						retry_after: None,
						body: body.into_bytes(),
					}),
					Scripted::Unreachable => Err(TransportError::network(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						"scripted outage",
					))),
				}
			})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CredentialConfig;
pub use manager::TokenManager;
