// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"lark_token_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the status class (`2xx`, `4xx`, ...) of a response relayed by the gateway.
pub fn record_gateway_status(status: u16) {
	#[cfg(feature = "metrics")]
	{
		let class = status_class(status);

		metrics::counter!("lark_token_broker_gateway_responses_total", "class" => class)
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = status;
	}
}

#[cfg_attr(not(any(test, feature = "metrics")), allow(dead_code))]
fn status_class(status: u16) -> &'static str {
	match status {
		100..=199 => "1xx",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		_ => "5xx",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_safe_without_a_global_recorder() {
		record_flow_outcome(FlowKind::AuthorizationCode, FlowOutcome::Failure);
		record_gateway_status(204);
	}

	#[test]
	fn status_classes_bucket_by_hundreds() {
		assert_eq!(status_class(200), "2xx");
		assert_eq!(status_class(302), "3xx");
		assert_eq!(status_class(429), "4xx");
		assert_eq!(status_class(503), "5xx");
	}
}
