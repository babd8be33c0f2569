//! Tracing subscriber bootstrap.

use skilltrail_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set and valid, otherwise the configured
/// level.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global `fmt` subscriber.
///
/// Returns `false` when a subscriber was already installed (for example by a
/// test harness or the host application); the existing one is kept.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    installed.is_ok()
}
