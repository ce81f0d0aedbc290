//! Authenticator contract invoked to mint bearer tokens.

// self
use crate::{_prelude::*, auth::Secret, error::AuthenticationError};

/// Boxed future returned by [`Authenticator::authenticate`].
pub type AuthenticatorFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IssuedToken, AuthenticationError>> + 'a + Send>>;

/// Caller-supplied operation that exchanges long-lived credentials for a short-lived token.
///
/// The token refresher is the only component that calls an authenticator after client
/// construction, and it never runs two calls at the same time. Any async closure returning
/// `Result<IssuedToken, AuthenticationError>` implements the trait.
pub trait Authenticator
where
	Self: 'static + Send + Sync,
{
	/// Performs one authentication round trip.
	fn authenticate(&self) -> AuthenticatorFuture<'_>;
}
impl<F, Fut> Authenticator for F
where
	F: 'static + Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Result<IssuedToken, AuthenticationError>>,
{
	fn authenticate(&self) -> AuthenticatorFuture<'_> {
		Box::pin(self())
	}
}

/// Token minted by an [`Authenticator`] together with its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
	/// Raw token value without any scheme prefix.
	pub token: Secret,
	/// Time-to-live reported for the token.
	pub ttl: Duration,
}
impl IssuedToken {
	/// Creates a token that stays valid for `ttl`.
	pub fn new(token: impl Into<Secret>, ttl: Duration) -> Self {
		Self { token: token.into(), ttl }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn closures_act_as_authenticators() {
		let authenticator =
			|| async { Ok::<_, AuthenticationError>(IssuedToken::new("tok", Duration::minutes(1))) };
		let issued = authenticator
			.authenticate()
			.await
			.expect("Closure authenticator should succeed.");

		assert_eq!(issued.token.expose(), "tok");
		assert_eq!(issued.ttl, Duration::minutes(1));
	}
}
