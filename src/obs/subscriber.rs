// crates.io
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info,lark_token_broker=info";

/// Installs the global formatter filtered through `RUST_LOG`.
///
/// Returns an error if a global subscriber was already installed.
pub fn init_subscriber() -> Result<(), tracing_subscriber::util::TryInitError> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	tracing_subscriber::registry().with(fmt::layer().with_target(true)).with(filter).try_init()
}
