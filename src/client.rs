//! High-level Umami client wiring configuration, credential strategy, and dispatcher together.
//!
//! [`Client::connect`] turns an [`AuthMode`] into the matching strategy:
//!
//! - [`AuthMode::None`] sends requests unauthenticated.
//! - [`AuthMode::ApiKey`] attaches the key under `x-umami-api-key`.
//! - [`AuthMode::SingleToken`] logs in once; a failed login aborts the connection.
//! - [`AuthMode::TokenRefresh`] spawns a [`TokenRefresher`] that logs in on the background task
//!   and keeps the token fresh, so connecting never fails on a bad login.

mod config;
mod login;

pub use config::*;
pub use login::*;

// crates.io
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{
		ApiKeyAuth, CredentialStrategy, IssuedToken, NoAuth, RefreshingBearerAuth, Secret,
		StaticBearerAuth, TokenRefresher,
	},
	dispatch::Dispatcher,
	http::HttpTransport,
	request::{QueryMap, Request},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Path of Umami's public event collection endpoint.
pub const SEND_PATH: &str = "/api/send";

/// Authenticated Umami API client.
///
/// Dropping the client, or calling [`close`](Self::close), stops its token refresher.
#[derive(Debug)]
pub struct Client {
	config: ClientConfig,
	dispatcher: Dispatcher<dyn HttpTransport>,
	refresher: Option<Arc<TokenRefresher>>,
	cancel: CancellationToken,
}
impl Client {
	/// Connects with the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub async fn new(config: ClientConfig) -> Result<Self> {
		Self::connect(config, Arc::new(ReqwestTransport::default())).await
	}

	/// Builds the credential strategy for `config.auth` and the dispatcher using `transport`.
	///
	/// Token refresh mode must be called from within a tokio runtime.
	pub async fn connect(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
		let cancel = CancellationToken::new();
		let mut refresher = None;
		let strategy: Arc<dyn CredentialStrategy> = match &config.auth {
			AuthMode::None => Arc::new(NoAuth),
			AuthMode::ApiKey(key) => Arc::new(ApiKeyAuth::new(key.clone())),
			AuthMode::SingleToken(credentials) => {
				let login = password_login(&config, &transport, credentials.clone());

				Arc::new(StaticBearerAuth::bootstrap(&login).await?)
			},
			AuthMode::TokenRefresh(credentials) => {
				let login = password_login(&config, &transport, credentials.clone());
				let strategy = RefreshingBearerAuth::spawn(login, &cancel, config.refresh_policy)?;

				refresher = Some(strategy.refresher().clone());

				Arc::new(strategy)
			},
		};
		let dispatcher = Dispatcher::<dyn HttpTransport>::new(transport, strategy);

		Ok(Self { config, dispatcher, refresher, cancel })
	}

	/// Logs in with `username`/`password` once and returns the issued token.
	///
	/// Independent of the configured [`AuthMode`].
	pub async fn login(
		&self,
		username: impl Into<String>,
		password: impl Into<Secret>,
	) -> Result<IssuedToken> {
		let login = password_login(
			&self.config,
			self.dispatcher.transport(),
			LoginCredentials::new(username, password),
		);

		login.login().await
	}

	/// `GET {host}{path}` with `query`, decoding the JSON body.
	pub async fn get<R>(&self, path: &str, query: QueryMap) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.dispatcher.send(Request::get(self.config.endpoint(path)).query(query)).await
	}

	/// `POST {host}{path}` with a JSON payload, decoding the JSON body.
	pub async fn post<P, R>(&self, path: &str, payload: &P) -> Result<R>
	where
		P: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.dispatcher.send(Request::post(self.config.endpoint(path)).json(payload)?).await
	}

	/// `DELETE {host}{path}`, discarding the body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.dispatcher.execute(Request::delete(self.config.endpoint(path))).await
	}

	/// Records an event through the public `POST /api/send` endpoint.
	///
	/// No credential is attached. Umami uses `user_agent` for device detection and drops
	/// events from recognized bots.
	pub async fn send_event<P>(&self, user_agent: &str, payload: &P) -> Result<()>
	where
		P: ?Sized + Serialize,
	{
		let request = Request::post(self.config.endpoint(SEND_PATH))
			.header(http::header::USER_AGENT.as_str(), user_agent)
			.json(payload)?
			.public();

		self.dispatcher.execute(request).await
	}

	/// Sends an arbitrary request descriptor through the client's dispatcher.
	pub async fn send<R>(&self, request: Request) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.dispatcher.send(request).await
	}

	/// Stops the token refresher, if any. Later authenticated calls fail with
	/// [`Error::RefresherStopped`](crate::error::Error::RefresherStopped).
	pub fn close(&self) {
		self.cancel.cancel();
	}

	/// Configuration the client was built from.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Dispatcher carrying the client's credential strategy.
	pub fn dispatcher(&self) -> &Dispatcher<dyn HttpTransport> {
		&self.dispatcher
	}

	/// Token refresher backing [`AuthMode::TokenRefresh`].
	pub fn refresher(&self) -> Option<&Arc<TokenRefresher>> {
		self.refresher.as_ref()
	}
}
impl Drop for Client {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

fn password_login(
	config: &ClientConfig,
	transport: &Arc<dyn HttpTransport>,
	credentials: LoginCredentials,
) -> PasswordLogin {
	PasswordLogin::new(
		transport.clone(),
		config.endpoint(LOGIN_PATH),
		credentials,
		config.token_expiry,
	)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn config(auth: AuthMode) -> ClientConfig {
		ClientConfig::builder("https://umami.example.com")
			.auth(auth)
			.build()
			.expect("Test host should be valid.")
	}

	#[tokio::test]
	async fn single_token_bootstrap_failure_aborts_connect() {
		let transport = RecordingTransport::replying(401, "unauthorized");
		let err = Client::connect(
			config(AuthMode::SingleToken(LoginCredentials::new("admin", "nope"))),
			transport.clone(),
		)
		.await
		.expect_err("A rejected login should abort construction.");

		assert!(matches!(err, Error::Bootstrap { .. }));
		assert!(err.to_string().contains("401"));
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test]
	async fn send_event_is_public_and_carries_the_user_agent() {
		let transport = RecordingTransport::replying(200, r#"{"cache":"x"}"#);
		let client = Client::connect(config(AuthMode::ApiKey("key".into())), transport.clone())
			.await
			.expect("API key clients always connect.");

		client
			.send_event("Mozilla/5.0", &serde_json::json!({ "type": "event" }))
			.await
			.expect("Event should be accepted.");

		let sent = transport.last().expect("The transport should see the event.");

		assert_eq!(sent.uri(), "https://umami.example.com/api/send");
		assert_eq!(sent.headers()["user-agent"], "Mozilla/5.0");
		assert!(sent.headers().get("x-umami-api-key").is_none());
	}

	#[tokio::test]
	async fn close_stops_the_refresher() {
		let transport = RecordingTransport::replying(200, r#"{"token":"tok"}"#);
		let client = Client::connect(
			config(AuthMode::TokenRefresh(LoginCredentials::new("admin", "umami"))),
			transport,
		)
		.await
		.expect("Refreshing clients connect without logging in first.");
		let refresher =
			client.refresher().expect("Token refresh mode should own a refresher.").clone();

		client.close();
		refresher.shutdown().await;

		let err = client
			.delete("/api/websites/1")
			.await
			.expect_err("Authenticated calls should fail once the refresher stopped.");

		match err {
			Error::Credential { source } => assert!(matches!(*source, Error::RefresherStopped)),
			other => panic!("Expected a credential error, got {other:?}."),
		}
	}
}
