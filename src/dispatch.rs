//! Request dispatcher: builds the HTTP request, attaches the credential, and decodes JSON.

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue,
	header::{ACCEPT, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialStrategy, NoAuth},
	error::{ConfigError, DecodeError, StatusError},
	http::{HttpResponse, HttpTransport},
	obs::{self, Stage},
	request::Request,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const APPLICATION_JSON: &str = "application/json";

#[cfg(feature = "reqwest")]
/// Dispatcher specialized for the crate's default reqwest transport.
pub type ReqwestDispatcher = Dispatcher<ReqwestTransport>;

/// Sends [`Request`] descriptors through a transport using one credential strategy.
///
/// Everything runs on the caller's task. The only suspension points are credential
/// resolution (which may wait on a token refresher) and the transport itself.
pub struct Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	strategy: Arc<dyn CredentialStrategy>,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a dispatcher that authenticates through `strategy`.
	pub fn new(transport: impl Into<Arc<T>>, strategy: Arc<dyn CredentialStrategy>) -> Self {
		Self { transport: transport.into(), strategy }
	}

	/// Creates a dispatcher that never attaches credentials.
	pub fn unauthenticated(transport: impl Into<Arc<T>>) -> Self {
		Self::new(transport, Arc::new(NoAuth))
	}

	/// Replaces the credential strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn CredentialStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Active credential strategy.
	pub fn strategy(&self) -> &Arc<dyn CredentialStrategy> {
		&self.strategy
	}

	/// Underlying transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Sends `request` and decodes the JSON response body into `R`.
	pub async fn send<R>(&self, request: Request) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.dispatch(request).await?;

		decode(&response)
	}

	/// Sends `request` and discards the response body on success.
	pub async fn execute(&self, request: Request) -> Result<()> {
		self.dispatch(request).await.map(|_| ())
	}

	async fn dispatch(&self, request: Request) -> Result<HttpResponse> {
		obs::observe(Stage::Send, self.send_once(request)).await
	}

	async fn send_once(&self, request: Request) -> Result<HttpResponse> {
		let url = request.url()?;
		// Resolved before anything else so a failing strategy never reaches the network.
		let credential = if request.public {
			None
		} else {
			Some(Credential::resolve(self.strategy.as_ref()).await.map_err(Error::credential)?)
		};
		let body = match &request.payload {
			Some(payload) => serde_json::to_vec(payload).map_err(ConfigError::EncodePayload)?,
			None => Vec::new(),
		};
		let mut http_request = http::Request::builder()
			.method(request.method.clone())
			.uri(url.as_str())
			.body(body)
			.map_err(ConfigError::from)?;
		let headers = http_request.headers_mut();

		headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));

		for (name, value) in &request.headers {
			set_header(headers, name, value, false)?;
		}

		if request.payload.is_some() {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
		}
		if let Some(credential) = credential.filter(|c| !c.is_empty()) {
			set_header(headers, &credential.header, credential.value.expose(), true)?;
		}

		let response = self.transport.execute(http_request).await?;
		let status = response.status();

		obs::response_received(&request.method, &url, status.as_u16());

		if !status.is_success() {
			return Err(StatusError {
				status: status.as_u16(),
				body: String::from_utf8_lossy(response.body()).into_owned(),
			}
			.into());
		}

		Ok(response)
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestTransport> {
	/// Creates a dispatcher backed by a default reqwest client.
	pub fn reqwest(strategy: Arc<dyn CredentialStrategy>) -> Self {
		Self::new(ReqwestTransport::default(), strategy)
	}
}
impl<T> Clone for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { transport: self.transport.clone(), strategy: self.strategy.clone() }
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher").field("auth_header", &self.strategy.header()).finish()
	}
}

fn set_header(headers: &mut HeaderMap, name: &str, value: &str, sensitive: bool) -> Result<()> {
	let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
	let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
	let mut value = HeaderValue::from_str(value).map_err(|_| invalid())?;

	value.set_sensitive(sensitive);
	headers.insert(name, value);

	Ok(())
}

fn decode<R>(response: &HttpResponse) -> Result<R>
where
	R: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		DecodeError { source, status: response.status().as_u16() }.into()
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::{ApiKeyAuth, StaticBearerAuth},
		error::AuthenticationError,
		http::{HttpRequest, TransportFuture},
	};

	#[derive(Debug, Deserialize, PartialEq)]
	struct Greeting {
		message: String,
	}

	#[tokio::test]
	async fn attaches_defaults_and_credential() {
		let transport = RecordingTransport::replying(200, r#"{"message":"hello"}"#);
		let dispatcher = Dispatcher::<RecordingTransport>::new(
			transport.clone(),
			Arc::new(StaticBearerAuth::new("token")),
		);
		let greeting: Greeting = dispatcher
			.send(
				Request::post("https://x/api/things")
					.json(&serde_json::json!({ "data": "test" }))
					.expect("JSON values always encode."),
			)
			.await
			.expect("Dispatch should succeed.");
		let sent = transport.last().expect("The transport should see the request.");

		assert_eq!(greeting.message, "hello");
		assert_eq!(sent.method(), http::Method::POST);
		assert_eq!(sent.headers()[ACCEPT], APPLICATION_JSON);
		assert_eq!(sent.headers()[CONTENT_TYPE], APPLICATION_JSON);
		assert_eq!(sent.headers()["authorization"], "Bearer token");
		assert!(sent.headers()["authorization"].is_sensitive());
		assert_eq!(sent.body(), br#"{"data":"test"}"#);
	}

	#[tokio::test]
	async fn descriptor_headers_override_accept() {
		let transport = RecordingTransport::replying(204, "");
		let dispatcher = Dispatcher::<RecordingTransport>::new(transport.clone(), Arc::new(ApiKeyAuth::new("k")));

		dispatcher
			.execute(Request::get("https://x/").header("Accept", "text/plain"))
			.await
			.expect("Dispatch should succeed.");

		let sent = transport.last().expect("The transport should see the request.");

		assert_eq!(sent.headers()[ACCEPT], "text/plain");
		assert_eq!(sent.headers()["x-umami-api-key"], "k");
		assert!(sent.headers().get(CONTENT_TYPE).is_none());
	}

	#[tokio::test]
	async fn empty_header_strategies_attach_nothing() {
		let transport = RecordingTransport::replying(200, "{}");
		let dispatcher = Dispatcher::<RecordingTransport>::unauthenticated(transport.clone());

		dispatcher.execute(Request::get("https://x/")).await.expect("Dispatch should succeed.");

		let sent = transport.last().expect("The transport should see the request.");

		assert_eq!(sent.headers().len(), 1);
	}

	#[tokio::test]
	async fn credential_failures_skip_the_network() {
		struct Broken;
		impl CredentialStrategy for Broken {
			fn header(&self) -> &str {
				"Authorization"
			}

			fn resolve(&self) -> crate::auth::CredentialFuture<'_> {
				Box::pin(async { Err(Error::from(AuthenticationError::msg("auth failed"))) })
			}
		}

		let transport = RecordingTransport::replying(200, "{}");
		let dispatcher = Dispatcher::<RecordingTransport>::new(transport.clone(), Arc::new(Broken));
		let err = dispatcher
			.execute(Request::get("https://x/"))
			.await
			.expect_err("Credential failures should abort the send.");

		assert!(matches!(err, Error::Credential { .. }));
		assert!(err.to_string().contains("auth failed"));
		assert_eq!(transport.calls(), 0);

		dispatcher
			.execute(Request::get("https://x/").public())
			.await
			.expect("Public requests should not resolve credentials.");

		let sent = transport.last().expect("The transport should see the public request.");

		assert!(sent.headers().get("authorization").is_none());
	}

	#[tokio::test]
	async fn non_success_statuses_carry_the_body() {
		let transport = RecordingTransport::replying(400, "bad request");
		let dispatcher = Dispatcher::<RecordingTransport>::unauthenticated(transport);
		let err = dispatcher
			.execute(Request::get("https://x/"))
			.await
			.expect_err("4xx responses should fail.");

		assert_eq!(err.status(), Some(400));
		assert!(err.to_string().contains("400"));
		assert!(err.to_string().contains("bad request"));
	}

	#[tokio::test]
	async fn decode_errors_report_the_path() {
		let transport = RecordingTransport::replying(200, r#"{"message":42}"#);
		let dispatcher = Dispatcher::<RecordingTransport>::unauthenticated(transport);
		let err = dispatcher
			.send::<Greeting>(Request::get("https://x/"))
			.await
			.expect_err("Mismatched bodies should fail to decode.");

		match err {
			Error::Decode(e) => assert_eq!(e.source.path().to_string(), "message"),
			other => panic!("Expected a decode error, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn transport_errors_propagate() {
		struct Offline;
		impl HttpTransport for Offline {
			fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
				Box::pin(async move {
					Err(crate::error::TransportError::network(
						request.uri().to_string(),
						std::io::Error::other("connection refused"),
					))
				})
			}
		}

		let dispatcher = Dispatcher::<Offline>::unauthenticated(Offline);
		let err = dispatcher
			.execute(Request::get("https://x/"))
			.await
			.expect_err("Transport failures should propagate.");

		assert!(matches!(err, Error::Transport(_)));
	}
}
