//! Authenticated request layer for the Umami analytics REST API: pluggable credential
//! strategies, a background token refresher that keeps short-lived bearer tokens valid for
//! any number of concurrent callers, and a JSON request dispatcher over a swappable transport.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod obs;
pub mod request;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture};

	/// Transport double that answers every request with one canned response and keeps the
	/// requests it saw.
	#[derive(Debug)]
	pub struct RecordingTransport {
		status: u16,
		body: Vec<u8>,
		calls: AtomicUsize,
		requests: Mutex<Vec<HttpRequest>>,
	}
	impl RecordingTransport {
		/// Creates a shared transport replying with `status` and `body`.
		pub fn replying(status: u16, body: &str) -> Arc<Self> {
			Arc::new(Self {
				status,
				body: body.as_bytes().to_vec(),
				calls: AtomicUsize::new(0),
				requests: Mutex::new(Vec::new()),
			})
		}

		/// Number of requests executed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Removes and returns the most recent request.
		pub fn last(&self) -> Option<HttpRequest> {
			self.requests.lock().pop()
		}
	}
	impl HttpTransport for RecordingTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.requests.lock().push(request);

			let mut response = HttpResponse::new(self.body.clone());

			Box::pin(async move {
				*response.status_mut() = http::StatusCode::from_u16(self.status)
					.expect("Test transports should use valid status codes.");

				Ok(response)
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
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
