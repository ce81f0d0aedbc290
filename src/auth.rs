//! Credential strategies, authenticators, and the background token refresher.

pub mod authenticator;
pub mod refresher;
pub mod secret;
pub mod strategy;

pub use authenticator::*;
pub use refresher::*;
pub use secret::*;
pub use strategy::*;
