//! Logging setup
//!
//! One compact subscriber for the whole process. Load runs are chatty at
//! debug level (every failed call is logged), so the HTTP stack is held at
//! `warn` regardless of the chosen level.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Level from the command line: an explicit `--log-level` wins over
    /// `--verbose`; `None` for an unknown name
    pub fn from_flags(log_level: Option<&str>, verbose: bool) -> Option<Self> {
        match log_level {
            Some(name) => Self::from_str(name),
            None if verbose => Some(LogLevel::Debug),
            None => Some(LogLevel::Info),
        }
    }

    /// Filter directives for this level
    pub fn directive(self) -> String {
        format!(
            "gateway_bench={},reqwest=warn,hyper=warn",
            self.to_tracing_level()
        )
    }
}

/// Install the global subscriber; `RUST_LOG` overrides `level` when set
pub fn init_logger(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
