// self
use crate::obs::{Operation, Outcome, Stage};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(op: Operation, stage: Stage, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"umami_client_op_total",
			"op" => op.as_str(),
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, stage, outcome);
	}
}
