use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{GateError, Result};

/// Check settings that deserialization alone cannot
///
/// Rule syntax is checked by building the rule set.
pub fn validate(config: &Config) -> Result<()> {
    if config.logging.level.trim().is_empty() {
        return Err(GateError::Config("logging.level cannot be empty".into()));
    }
    EnvFilter::try_new(&config.logging.level).map_err(|e| {
        GateError::Config(format!("Invalid logging.level {:?}: {e}", config.logging.level))
    })?;

    if config.reload.enabled && config.reload.debounce_ms == 0 {
        return Err(GateError::Config("reload.debounce_ms must be > 0".into()));
    }

    config.whitelist.build_rules()?;

    Ok(())
}
