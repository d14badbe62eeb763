//! Logging initialisation
//!
//! Connectors emit diagnostics through `tracing`. The subscriber installed
//! here writes them either to stdout or to an append-mode log file, which is
//! the diagnostic sink handed to a trading process.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Append diagnostics to this file instead of stdout
    pub file: Option<PathBuf>,
    pub with_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            file: None,
            with_thread_ids: true,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `TRADELINK_LOG_FILE` when set
    pub fn from_env() -> Self {
        Self {
            file: std::env::var_os("TRADELINK_LOG_FILE").map(PathBuf::from),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the stdout subscriber. Safe to call more than once.
pub fn init_logging() {
    // Only fails on an unopenable log file, and the default config has none.
    let _ = init_logging_with(&LogConfig::default());
}

/// Install a subscriber for `config`.
///
/// A subscriber already installed by an earlier call wins; only failing to
/// open the log file is reported.
pub fn init_logging_with(config: &LogConfig) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(false)
        .with_thread_ids(config.with_thread_ids)
        .with_file(true)
        .with_line_number(true);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let installed = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok();
            if installed {
                tracing::info!("📝 Logging to {}", path.display());
            }
        }
        None => {
            if builder.try_init().is_ok() {
                tracing::info!("📝 Initialized tracing logging");
            }
        }
    }
    Ok(())
}

#[macro_export]
macro_rules! log_order {
    ($action:expr, $order_id:expr, $symbol:expr) => {
        tracing::info!("📋 ORDER {}: {} ({})", $action, $order_id, $symbol);
    };
}

#[macro_export]
macro_rules! log_error {
    ($operation:expr, $error:expr) => {
        tracing::error!("❌ {} failed: {}", $operation, $error);
    };
}
