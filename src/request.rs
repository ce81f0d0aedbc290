//! Request descriptors consumed by the dispatcher.

pub mod query;

pub use http::Method;
pub use query::QueryMap;

// self
use crate::{_prelude::*, error::ConfigError};

/// Everything the dispatcher needs to build and send one call.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Absolute endpoint URL, possibly with a query string of its own.
	pub endpoint: String,
	/// Extra headers applied after the default `Accept` header.
	pub headers: BTreeMap<String, String>,
	/// Query parameters merged into the endpoint's query string.
	pub query: QueryMap,
	/// JSON payload; sets `Content-Type: application/json` when present.
	pub payload: Option<serde_json::Value>,
	/// Sends the request without resolving or attaching a credential.
	pub public: bool,
}
impl Request {
	/// Creates a private request with no headers, query, or payload.
	pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
		Self {
			method,
			endpoint: endpoint.into(),
			headers: BTreeMap::new(),
			query: QueryMap::new(),
			payload: None,
			public: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(endpoint: impl Into<String>) -> Self {
		Self::new(Method::GET, endpoint)
	}

	/// Shorthand for a `POST` request.
	pub fn post(endpoint: impl Into<String>) -> Self {
		Self::new(Method::POST, endpoint)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(endpoint: impl Into<String>) -> Self {
		Self::new(Method::DELETE, endpoint)
	}

	/// Sets a header, replacing any previous value under the same name.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Replaces the query parameters.
	pub fn query(mut self, query: QueryMap) -> Self {
		self.query = query;

		self
	}

	/// Adds a single query parameter; empty values are dropped.
	pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key, value);

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<P>(mut self, payload: &P) -> Result<Self>
	where
		P: ?Sized + Serialize,
	{
		self.payload = Some(serde_json::to_value(payload).map_err(ConfigError::EncodePayload)?);

		Ok(self)
	}

	/// Marks the request as public so no credential is attached.
	pub fn public(mut self) -> Self {
		self.public = true;

		self
	}

	/// Final target URL with the query parameters merged in.
	pub fn url(&self) -> Result<Url> {
		let mut url = Url::parse(&self.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
			endpoint: self.endpoint.clone(),
			source,
		})?;

		self.query.apply_to(&mut url);

		Ok(url)
	}
}
