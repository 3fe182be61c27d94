//! Tracing subscriber setup.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is unset: the configured level for our
/// crates, with sqlx statement logging held at warn.
pub fn default_directives(level: &str) -> String {
    format!("{level},sqlx=warn,tower_http={level}")
}

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// `logging.format` is `json` (one object per line, span close events),
/// `compact`, or anything else for the multi-line pretty format.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init(),
        "compact" => registry.with(fmt::layer().compact()).init(),
        _ => registry.with(fmt::layer().pretty()).init(),
    }
}
