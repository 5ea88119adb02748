//! Tracing setup for the `splice` binary.

use splice_engine::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter for a configured level string. Unparsable levels fall back to `info`.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("splice: ignoring log level {level:?}: {e}");
        EnvFilter::new("info")
    })
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.level));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish()).ok();
    } else {
        tracing::subscriber::set_global_default(builder.with_target(true).finish()).ok();
    }
}
