// self
use crate::{_prelude::*, auth::{RefreshPolicy, Secret}, error::ConfigError};

/// Username/password pair exchanged for a bearer token at `POST /api/auth/login`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoginCredentials {
	/// Umami username.
	pub username: String,
	/// Umami password.
	pub password: Secret,
}
impl LoginCredentials {
	/// Pairs a username with its password.
	pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
		Self { username: username.into(), password: password.into() }
	}
}

/// How the client authenticates its requests.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AuthMode {
	/// No credential is attached.
	#[default]
	None,
	/// A fixed API key sent under `x-umami-api-key`.
	ApiKey(Secret),
	/// Logs in once while connecting and reuses that token forever.
	SingleToken(LoginCredentials),
	/// Logs in on a background task and re-issues the token before it expires.
	TokenRefresh(LoginCredentials),
}

/// Immutable client configuration produced by [`ClientConfigBuilder`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL of the Umami instance.
	pub host_url: Url,
	/// Authentication mode.
	pub auth: AuthMode,
	/// Lifetime assumed for tokens issued by the login endpoint.
	pub token_expiry: Duration,
	/// Timing used by the token refresher.
	pub refresh_policy: RefreshPolicy,
}
impl ClientConfig {
	/// Default lifetime of a login token.
	pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::hours(24);

	/// Starts a builder for the instance at `host_url`.
	pub fn builder(host_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(host_url)
	}

	/// Absolute endpoint for an API `path` such as `/api/websites`.
	pub fn endpoint(&self, path: &str) -> String {
		let host = self.host_url.as_str().trim_end_matches('/');

		if path.starts_with('/') { format!("{host}{path}") } else { format!("{host}/{path}") }
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL, validated on [`build`](Self::build).
	pub host_url: String,
	/// Authentication mode.
	pub auth: AuthMode,
	/// Lifetime assumed for login tokens.
	pub token_expiry: Duration,
	/// Refresher timing.
	pub refresh_policy: RefreshPolicy,
}
impl ClientConfigBuilder {
	/// Creates a builder with no authentication and default timings.
	pub fn new(host_url: impl Into<String>) -> Self {
		Self {
			host_url: host_url.into(),
			auth: AuthMode::None,
			token_expiry: ClientConfig::DEFAULT_TOKEN_EXPIRY,
			refresh_policy: RefreshPolicy::default(),
		}
	}

	/// Overrides the authentication mode.
	pub fn auth(mut self, auth: AuthMode) -> Self {
		self.auth = auth;

		self
	}

	/// Authenticates with an API key.
	pub fn api_key(self, key: impl Into<Secret>) -> Self {
		self.auth(AuthMode::ApiKey(key.into()))
	}

	/// Logs in once while connecting.
	pub fn single_token(self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
		self.auth(AuthMode::SingleToken(LoginCredentials::new(username, password)))
	}

	/// Keeps a login token fresh in the background.
	pub fn token_refresh(self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
		self.auth(AuthMode::TokenRefresh(LoginCredentials::new(username, password)))
	}

	/// Overrides the assumed login token lifetime.
	pub fn token_expiry(mut self, expiry: Duration) -> Self {
		self.token_expiry = expiry;

		self
	}

	/// Overrides the refresher timing.
	pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
		self.refresh_policy = policy;

		self
	}

	/// Consumes the builder and validates the host URL.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let host_url = Url::parse(&self.host_url).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: self.host_url.clone(), source }
		})?;

		if !matches!(host_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: host_url.into() });
		}

		Ok(ClientConfig {
			host_url,
			auth: self.auth,
			token_expiry: self.token_expiry,
			refresh_policy: self.refresh_policy,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_applies_defaults() {
		let config = ClientConfig::builder("https://umami.example.com")
			.build()
			.expect("HTTPS hosts should be accepted.");

		assert_eq!(config.auth, AuthMode::None);
		assert_eq!(config.token_expiry, Duration::hours(24));
		assert_eq!(config.refresh_policy, RefreshPolicy::default());
	}

	#[test]
	fn builder_rejects_bad_hosts() {
		assert!(matches!(
			ClientConfig::builder("umami.example.com").build(),
			Err(ConfigError::InvalidEndpoint { .. })
		));
		assert!(matches!(
			ClientConfig::builder("ftp://umami.example.com").build(),
			Err(ConfigError::UnsupportedScheme { .. })
		));
	}

	#[test]
	fn endpoints_join_against_the_host() {
		let config = ClientConfig::builder("http://localhost:3000/umami/")
			.token_refresh("admin", "umami")
			.build()
			.expect("HTTP hosts should be accepted.");

		assert_eq!(config.endpoint("/api/websites"), "http://localhost:3000/umami/api/websites");
		assert_eq!(config.endpoint("api/me"), "http://localhost:3000/umami/api/me");
		assert!(matches!(config.auth, AuthMode::TokenRefresh(ref c) if c.username == "admin"));
	}

	#[test]
	fn login_credentials_serialize_the_password() {
		let body = serde_json::to_value(LoginCredentials::new("admin", "umami"))
			.expect("Credentials should serialize.");

		assert_eq!(body, serde_json::json!({ "username": "admin", "password": "umami" }));
	}
}
