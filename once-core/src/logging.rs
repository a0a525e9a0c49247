//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! Diagnostics share stderr with the supervised command, so the default
//! filter keeps `once` quiet unless something goes wrong.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to [`LogFormat::Human`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Human,
        }
    }
}

/// Initialize the global tracing subscriber. Safe to call multiple times;
/// subsequent calls no-op.
pub fn init_logging(filter: &str, format: LogFormat) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false);

    match format {
        LogFormat::Human => {
            let _ = builder.finish().try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().try_init();
        }
    };
}
