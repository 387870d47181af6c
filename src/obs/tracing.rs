// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("lark_token_broker.flow", flow = kind.as_str(), stage);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

	/// Runs a fallible flow inside the span and records its attempt and outcome.
	///
	/// Failures are logged with their stable code and re-authorization hint; the error
	/// value itself is returned untouched.
	pub async fn run<T, Fut>(self, fut: Fut) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		obs::record_flow_outcome(self.kind, FlowOutcome::Attempt);

		let result = self.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(self.kind, FlowOutcome::Success),
			Err(e) => {
				obs::record_flow_outcome(self.kind, FlowOutcome::Failure);

				#[cfg(feature = "tracing")]
				self.span.in_scope(|| {
					tracing::warn!(
						code = e.code(),
						need_reauth = e.need_reauth(),
						error = %e,
						"flow failed"
					)
				});
				#[cfg(not(feature = "tracing"))]
				let _ = e;
			},
		}

		result
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn entered_guard_exists_for_sync_sections() {
		let _guard = FlowSpan::new(FlowKind::AuthorizationCode, "begin").entered();
	}

	#[tokio::test]
	async fn run_passes_results_through() {
		let ok = FlowSpan::new(FlowKind::Refresh, "run_ok").run(async { Ok(42) }).await;

		assert_eq!(ok.expect("Successful flows should pass their value through."), 42);

		let err = FlowSpan::new(FlowKind::Gateway, "run_err")
			.run(async { Err::<(), _>(Error::NoRefreshToken) })
			.await
			.expect_err("Failed flows should pass their error through.");

		assert!(err.need_reauth());
	}
}
