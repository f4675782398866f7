use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;

pub use formatter::*;

use crate::{common::types::AnyResult, configs::LoggingConfig};

/// Builds the filter directive from the configured level and extra filters.
/// `RUST_LOG` still wins when set.
pub fn filter_directive(config: &LoggingConfig) -> String {
    let log_level = config.level.as_deref().unwrap_or("info");
    let filters = config.filters.as_deref().unwrap_or("");

    if filters.is_empty() {
        format!("{},hyper=warn,reqwest=warn", log_level)
    } else {
        format!("{},hyper=warn,reqwest=warn,{}", log_level, filters)
    }
}

pub fn init(config: &LoggingConfig) -> AnyResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    // stdout carries the stream listing, logs go to stderr
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(CustomFormatter::new(config.ansi))
        .with_ansi(config.ansi);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}
