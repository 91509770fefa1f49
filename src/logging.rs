use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Initializes the global `tracing` subscriber. `prod` emits JSON at
/// info level (suitable for log aggregation); `dev` emits the default
/// pretty formatter at debug level. Matches the teacher crate's
/// `tracing_subscriber::fmt()...init()` call site, generalized to pick a
/// formatter instead of hard-coding one.
pub fn init(level: LogLevel) {
    let default_directive = match level {
        LogLevel::Prod => "info",
        LogLevel::Dev => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    match level {
        LogLevel::Prod => {
            tracing_subscriber::fmt().json().with_env_filter(filter).with_target(false).init();
        }
        LogLevel::Dev => {
            tracing_subscriber::fmt().pretty().with_env_filter(filter).with_target(false).init();
        }
    }
}
