//! Client-level error types shared across strategies, the refresher, and the dispatcher.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Authenticator call failed.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Upstream answered with a status outside `200..300`.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Response body could not be decoded into the requested shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// The static bearer token could not be obtained while building the client.
	#[error("Initial authentication failed: {source}")]
	Bootstrap {
		/// Authenticator failure raised during construction.
		#[source]
		source: AuthenticationError,
	},
	/// The active credential strategy failed to produce a value for a request.
	#[error("Unable to resolve a credential: {source}")]
	Credential {
		/// Strategy failure.
		#[source]
		source: Box<Error>,
	},
	/// The token refresher's background task is no longer running.
	#[error("Token refresher has stopped.")]
	RefresherStopped,
}
impl Error {
	/// Wraps a strategy failure so callers can tell it apart from transport errors.
	pub fn credential(source: Error) -> Self {
		Self::Credential { source: Box::new(source) }
	}

	/// Returns the HTTP status when the error came from a non-2xx response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(e) => Some(e.status),
			Self::Credential { source } => source.status(),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Endpoint cannot be parsed as an absolute URL.
	#[error("Endpoint `{endpoint}` is not a valid URL.")]
	InvalidEndpoint {
		/// Offending endpoint string.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Host URL must use `http` or `https`.
	#[error("Host URL `{url}` must use http or https.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied by the caller.
		name: String,
	},
	/// Request payload could not be serialized.
	#[error("Request payload could not be encoded as JSON.")]
	EncodePayload(#[source] serde_json::Error),
	/// A background task was requested outside of a tokio runtime.
	#[error("A tokio runtime is required to spawn the token refresher.")]
	MissingRuntime,
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

/// Failure reported by an [`Authenticator`](crate::auth::Authenticator).
///
/// The error is cheap to clone because the refresher hands the same failure to every
/// caller that arrives before the next retry.
#[derive(Clone, Debug, ThisError)]
#[error("Authentication failed: {source}")]
pub struct AuthenticationError {
	#[source]
	source: SharedError,
}
impl AuthenticationError {
	/// Wraps an arbitrary authenticator failure.
	pub fn new(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self { source: Arc::new(src) }
	}

	/// Builds an error from a plain message.
	pub fn msg(message: impl Into<String>) -> Self {
		Self::new(Message(message.into()))
	}
}
impl From<Error> for AuthenticationError {
	fn from(e: Error) -> Self {
		Self::new(e)
	}
}

/// Non-2xx response returned by the upstream API.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Request failed [{status}]: {body}")]
pub struct StatusError {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body text.
	pub body: String,
}

/// Response body did not match the requested shape.
#[derive(Debug, ThisError)]
#[error("Response body could not be decoded at `{}`.", .source.path())]
pub struct DecodeError {
	/// Structured parsing failure.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
	/// HTTP status code of the decoded response.
	pub status: u16,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{url}`.")]
	Network {
		/// Target URL of the failed request.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		url: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}

#[derive(Debug)]
struct Message(String);
impl Display for Message {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl StdError for Message {}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_error_carries_code_and_body() {
		let err = Error::from(StatusError { status: 400, body: "bad request".into() });
		let message = err.to_string();

		assert!(message.contains("400"));
		assert!(message.contains("bad request"));
		assert_eq!(err.status(), Some(400));
	}

	#[test]
	fn credential_wrapper_keeps_cause_in_message() {
		let err = Error::credential(AuthenticationError::msg("auth failed").into());

		assert_eq!(
			err.to_string(),
			"Unable to resolve a credential: Authentication failed: auth failed"
		);
		assert!(StdError::source(&err).is_some());
	}

	#[test]
	fn authentication_error_clones_share_the_cause() {
		let err = AuthenticationError::msg("login rejected");
		let clone = err.clone();

		assert_eq!(err.to_string(), clone.to_string());
	}
}
