use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_LEVEL: &str = "info";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log collectors in managed runtimes.
    Json,
    Text,
}

impl LogFormat {
    pub fn for_runtime(managed: bool) -> Self {
        if managed { LogFormat::Json } else { LogFormat::Text }
    }
}

/// Install the global subscriber once. Level comes from `RUST_LOG`,
/// defaulting to `info`. Later calls are no-ops, and an already installed
/// subscriber is kept.
pub fn init_logging(format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = match format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true))
                .try_init(),
            LogFormat::Text => registry
                .with(fmt::layer().with_target(true).with_ansi(false))
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already set, keeping it");
        }
        tracing::info!(format = ?format, "logging initialized");
    });
}
