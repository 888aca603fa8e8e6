//! Log setup
//!
//! Logs go to stderr so stdout carries only listings and reports. The filter
//! comes from `FAULTBENCH_LOG` using `EnvFilter` directive syntax and
//! defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "FAULTBENCH_LOG";

const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, human-readable or one JSON object per line
///
/// A second call is a no-op.
pub fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
