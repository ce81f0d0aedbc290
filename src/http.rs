//! Transport primitives for dispatching fully built requests.
//!
//! The dispatcher's only dependency on an HTTP stack is [`HttpTransport`]. Requests and
//! responses are plain [`http`] values with buffered bodies, so test doubles can record
//! and answer requests without a network. The default `reqwest` feature provides
//! [`ReqwestTransport`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Fully built request handed to a transport.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Buffered response returned by a transport.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Pluggable HTTP execution capability.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the
/// dispatcher, the login authenticator, and the refresher task. The returned future must
/// resolve once the whole body has been read. Transports report network failures only;
/// non-2xx statuses are returned as regular responses.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and returns the buffered response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		(**self).execute(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = request.uri().to_string();
			let request = reqwest::Request::try_from(request)
				.map_err(|e| TransportError::network(url.as_str(), e))?;
			let response =
				self.0.execute(request).await.map_err(|e| TransportError::network(url.as_str(), e))?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(url.as_str(), e))?;
			let mut converted = HttpResponse::new(body.to_vec());

			*converted.status_mut() = status;
			*converted.version_mut() = version;
			*converted.headers_mut() = headers;

			Ok::<_, TransportError>(converted)
		})
	}
}
