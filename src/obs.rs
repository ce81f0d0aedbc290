//! Optional observability helpers for the request layer.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `umami_client.op` with the
//!   `op` and `stage` fields, plus debug/warn events from the token refresher and dispatcher.
//! - Enable `metrics` to increment the `umami_client_op_total` counter for every
//!   attempt/success/failure, labeled by `op`, `stage`, and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Authenticator round trip driven by a strategy or the refresher.
	Authenticate,
	/// Request sent through the dispatcher.
	Dispatch,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Authenticate => "authenticate",
			Operation::Dispatch => "dispatch",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Call site inside an operation, shared by span fields and metric labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// One-shot login performed while a static bearer strategy is built.
	Bootstrap,
	/// Login performed by the token refresher's background task.
	Refresh,
	/// Request sent by the dispatcher.
	Send,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Bootstrap => "bootstrap",
			Stage::Refresh => "refresh",
			Stage::Send => "send",
		}
	}

	/// Operation this stage belongs to.
	pub const fn operation(self) -> Operation {
		match self {
			Stage::Bootstrap | Stage::Refresh => Operation::Authenticate,
			Stage::Send => Operation::Dispatch,
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}

	/// Maps a result onto its success/failure label.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		match result {
			Ok(_) => Outcome::Success,
			Err(_) => Outcome::Failure,
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside the stage's span, recording the attempt and its outcome.
pub(crate) async fn observe<Fut, T, E>(stage: Stage, fut: Fut) -> Result<T, E>
where
	Fut: Future<Output = Result<T, E>>,
{
	let op = stage.operation();

	record_outcome(op, stage, Outcome::Attempt);

	let result = OpSpan::new(op, stage).instrument(fut).await;

	record_outcome(op, stage, Outcome::of(&result));

	result
}
