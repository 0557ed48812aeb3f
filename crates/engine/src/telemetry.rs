use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::EngineError;

pub const LOG_ENV: &str = "DAYBOOK_LOG";

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let directive = std::env::var(LOG_ENV)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| config.filter.clone());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global formatter. Fails if a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_target(config.with_target)
        .try_init()
        .map_err(|e| EngineError::Config(format!("logging init failed: {e}")))
}

/// Like `init`, but quiet when a subscriber is already installed. Output goes
/// through the test writer so it is captured per test.
pub fn init_for_tests(config: &LoggingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_target(config.with_target)
        .with_test_writer()
        .try_init();
}
