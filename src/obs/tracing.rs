// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	error::AuthenticationError,
	obs::{Operation, Stage},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by the dispatcher and the refresher.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: Operation, stage: Stage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("umami_client.op", op = op.as_str(), stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn authenticated(refresh_in: StdDuration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(refresh_in_ms = refresh_in.as_millis() as u64, "token issued");
	#[cfg(not(feature = "tracing"))]
	let _ = refresh_in;
}

pub(crate) fn authentication_failed(err: &AuthenticationError, retry_in: StdDuration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %err, retry_in_ms = retry_in.as_millis() as u64, "authentication failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (err, retry_in);
}

pub(crate) fn refresher_exited(reason: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(reason, "token refresher exited");
	#[cfg(not(feature = "tracing"))]
	let _ = reason;
}

pub(crate) fn response_received(method: &http::Method, url: &Url, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%method, host = url.host_str().unwrap_or_default(), path = url.path(), status, "response received");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, url, status);
}
