use serde::Deserialize;

use super::telemetry::{LoggingConfig, ReloadConfig};
use super::whitelist::{GateConfig, WhitelistConfig};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Gate settings owned by the hosting server
    #[serde(default)]
    pub gate: GateConfig,
    /// Rules loaded into the whitelist at startup and on reload
    #[serde(default)]
    pub whitelist: WhitelistConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Config file watching
    #[serde(default)]
    pub reload: ReloadConfig,
}
