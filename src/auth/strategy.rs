//! Credential strategies that label and resolve the auth value for outgoing requests.
//!
//! The dispatcher holds exactly one `Arc<dyn CredentialStrategy>` and asks it for a value
//! before every non-public request. Strategies carry no shared base state; each variant
//! is a small standalone type.

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{Authenticator, RefreshPolicy, Secret, TokenRefresher},
	obs::{self, Stage},
};

/// Header used by the bearer strategies.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Header Umami reads API keys from.
pub const API_KEY_HEADER: &str = "x-umami-api-key";

/// Boxed future returned by [`CredentialStrategy::resolve`].
pub type CredentialFuture<'a> = Pin<Box<dyn Future<Output = Result<Secret>> + 'a + Send>>;

/// Pluggable policy for obtaining and labeling an auth value.
pub trait CredentialStrategy
where
	Self: Send + Sync,
{
	/// Header the resolved value is sent under. An empty name means "send nothing".
	fn header(&self) -> &str;

	/// Produces the header value for one request. May wait on a background refresh.
	fn resolve(&self) -> CredentialFuture<'_>;
}

/// Resolved credential ready to be attached to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	/// Header name; empty when nothing should be attached.
	pub header: String,
	/// Header value.
	pub value: Secret,
}
impl Credential {
	/// Resolves a credential through `strategy`.
	pub async fn resolve(strategy: &dyn CredentialStrategy) -> Result<Self> {
		let value = strategy.resolve().await?;

		Ok(Self { header: strategy.header().to_owned(), value })
	}

	/// Returns `true` when the credential should not be attached.
	pub fn is_empty(&self) -> bool {
		self.header.is_empty()
	}
}

/// Strategy that never attaches anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;
impl CredentialStrategy for NoAuth {
	fn header(&self) -> &str {
		""
	}

	fn resolve(&self) -> CredentialFuture<'_> {
		Box::pin(async { Ok(Secret::default()) })
	}
}

/// Strategy sending a fixed API key under a provider-specific header.
#[derive(Clone, Debug)]
pub struct ApiKeyAuth {
	header: String,
	key: Secret,
}
impl ApiKeyAuth {
	/// Sends `key` under [`API_KEY_HEADER`].
	pub fn new(key: impl Into<Secret>) -> Self {
		Self { header: API_KEY_HEADER.into(), key: key.into() }
	}

	/// Overrides the header name.
	pub fn with_header(mut self, header: impl Into<String>) -> Self {
		self.header = header.into();

		self
	}
}
impl CredentialStrategy for ApiKeyAuth {
	fn header(&self) -> &str {
		&self.header
	}

	fn resolve(&self) -> CredentialFuture<'_> {
		Box::pin(async move { Ok(self.key.clone()) })
	}
}

/// Strategy sending one bearer token that is never refreshed.
#[derive(Clone, Debug)]
pub struct StaticBearerAuth {
	value: Secret,
}
impl StaticBearerAuth {
	/// Wraps an already issued raw token.
	pub fn new(token: impl Into<Secret>) -> Self {
		Self { value: token.into().bearer() }
	}

	/// Calls `authenticator` once and keeps the issued token for the strategy's lifetime.
	///
	/// The token's TTL is ignored. A failed call is returned as [`Error::Bootstrap`] and there
	/// is no retry path, so client construction is expected to abort on it.
	pub async fn bootstrap(authenticator: &dyn Authenticator) -> Result<Self> {
		let issued = obs::observe(Stage::Bootstrap, authenticator.authenticate())
			.await
			.map_err(|source| Error::Bootstrap { source })?;

		Ok(Self::new(issued.token))
	}
}
impl CredentialStrategy for StaticBearerAuth {
	fn header(&self) -> &str {
		AUTHORIZATION_HEADER
	}

	fn resolve(&self) -> CredentialFuture<'_> {
		Box::pin(async move { Ok(self.value.clone()) })
	}
}

/// Strategy backed by a [`TokenRefresher`].
#[derive(Clone, Debug)]
pub struct RefreshingBearerAuth {
	refresher: Arc<TokenRefresher>,
}
impl RefreshingBearerAuth {
	/// Spawns a refresher for `authenticator` that stops when `cancel` fires.
	pub fn spawn(
		authenticator: impl Authenticator,
		cancel: &CancellationToken,
		policy: RefreshPolicy,
	) -> Result<Self> {
		let refresher = TokenRefresher::spawn_with_policy(authenticator, cancel, policy)?;

		Ok(Self::with_refresher(Arc::new(refresher)))
	}

	/// Reuses an existing refresher.
	pub fn with_refresher(refresher: Arc<TokenRefresher>) -> Self {
		Self { refresher }
	}

	/// Underlying refresher, e.g. for metrics or shutdown.
	pub fn refresher(&self) -> &Arc<TokenRefresher> {
		&self.refresher
	}
}
impl CredentialStrategy for RefreshingBearerAuth {
	fn header(&self) -> &str {
		AUTHORIZATION_HEADER
	}

	fn resolve(&self) -> CredentialFuture<'_> {
		Box::pin(async move { self.refresher.get().await.map(|token| token.bearer()) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::IssuedToken, error::AuthenticationError};

	#[tokio::test]
	async fn no_auth_resolves_to_nothing() {
		let credential =
			Credential::resolve(&NoAuth).await.expect("No-op strategy should never fail.");

		assert!(credential.is_empty());
		assert!(credential.value.is_empty());
	}

	#[tokio::test]
	async fn api_key_is_sent_verbatim() {
		let strategy = ApiKeyAuth::new("key-123");

		assert_eq!(strategy.header(), "x-umami-api-key");
		assert_eq!(
			strategy.resolve().await.expect("API key strategy should never fail.").expose(),
			"key-123"
		);
		assert_eq!(ApiKeyAuth::new("key-123").with_header("x-api-key").header(), "x-api-key");
	}

	#[tokio::test]
	async fn static_bearer_prefixes_scheme() {
		let strategy = StaticBearerAuth::new("abc123");

		assert_eq!(strategy.header(), "Authorization");
		assert_eq!(
			strategy.resolve().await.expect("Static bearer strategy should never fail.").expose(),
			"Bearer abc123"
		);
	}

	#[tokio::test]
	async fn static_bearer_bootstrap_failure_is_fatal() {
		let authenticator = || async { Err::<IssuedToken, _>(AuthenticationError::msg("invalid credentials")) };
		let err = StaticBearerAuth::bootstrap(&authenticator)
			.await
			.expect_err("Bootstrap failures should abort construction.");

		assert!(matches!(err, Error::Bootstrap { .. }));
		assert!(err.to_string().contains("invalid credentials"));
	}

	#[tokio::test]
	async fn static_bearer_bootstrap_keeps_issued_token() {
		let authenticator = || async {
			Ok::<_, AuthenticationError>(IssuedToken::new("boot", Duration::seconds(1)))
		};
		let strategy = StaticBearerAuth::bootstrap(&authenticator)
			.await
			.expect("Bootstrap should succeed with a working authenticator.");

		assert_eq!(
			strategy.resolve().await.expect("Static bearer strategy should never fail.").expose(),
			"Bearer boot"
		);
	}

	#[tokio::test]
	async fn refreshing_bearer_delegates_to_refresher() {
		let strategy = RefreshingBearerAuth::spawn(
			|| async {
				Ok::<_, AuthenticationError>(IssuedToken::new("dynamic-token", Duration::hours(1)))
			},
			&CancellationToken::new(),
			RefreshPolicy::default(),
		)
		.expect("Refreshing strategy should spawn inside a runtime.");

		assert_eq!(strategy.header(), "Authorization");
		assert_eq!(
			strategy.resolve().await.expect("Refreshing strategy should serve the token.").expose(),
			"Bearer dynamic-token"
		);
	}

	#[tokio::test]
	async fn refreshing_bearer_propagates_refresher_errors() {
		let strategy = RefreshingBearerAuth::spawn(
			|| async { Err::<IssuedToken, _>(AuthenticationError::msg("failed to fetch token")) },
			&CancellationToken::new(),
			RefreshPolicy::default(),
		)
		.expect("Refreshing strategy should spawn inside a runtime.");
		let err = strategy.resolve().await.expect_err("Refresher errors should surface.");

		assert!(matches!(err, Error::Authentication(_)));
		assert!(err.to_string().contains("failed to fetch token"));
	}
}
