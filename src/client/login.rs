// self
use crate::{
	_prelude::*,
	auth::{Authenticator, AuthenticatorFuture, IssuedToken, Secret},
	client::LoginCredentials,
	dispatch::Dispatcher,
	error::AuthenticationError,
	http::HttpTransport,
	request::Request,
};

/// Login path relative to the host URL.
pub const LOGIN_PATH: &str = "/api/auth/login";

/// [`Authenticator`] exchanging a username and password for a bearer token.
///
/// The login call is always sent as a public request. The endpoint does not report a
/// lifetime, so every issued token is paired with the configured expiry.
#[derive(Clone, Debug)]
pub struct PasswordLogin {
	dispatcher: Dispatcher<dyn HttpTransport>,
	endpoint: String,
	credentials: LoginCredentials,
	token_expiry: Duration,
}
impl PasswordLogin {
	/// Creates a login authenticator for `endpoint`.
	pub fn new(
		transport: Arc<dyn HttpTransport>,
		endpoint: impl Into<String>,
		credentials: LoginCredentials,
		token_expiry: Duration,
	) -> Self {
		Self {
			dispatcher: Dispatcher::unauthenticated(transport),
			endpoint: endpoint.into(),
			credentials,
			token_expiry,
		}
	}

	/// Performs one login round trip.
	pub async fn login(&self) -> Result<IssuedToken> {
		let request = Request::post(self.endpoint.as_str()).json(&self.credentials)?.public();
		let response = self.dispatcher.send::<LoginResponse>(request).await?;

		Ok(IssuedToken::new(response.token, self.token_expiry))
	}
}
impl Authenticator for PasswordLogin {
	fn authenticate(&self) -> AuthenticatorFuture<'_> {
		Box::pin(async move { self.login().await.map_err(AuthenticationError::from) })
	}
}

#[derive(Deserialize)]
struct LoginResponse {
	token: Secret,
}
