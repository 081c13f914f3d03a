use serde::Deserialize;

/// Logging configuration
/// Controls application-level structured logging (stdout/stderr)
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level or filter directives: "trace", "debug", "info", "warn", "error",
    /// or e.g. "info,ipgate_lib=debug"
    /// Default: "info"
    /// Can be overridden at runtime via RUST_LOG environment variable
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Config file watching
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReloadConfig {
    /// Rebuild the whitelist when the config file changes
    /// Default: false
    #[serde(default)]
    pub enabled: bool,
    /// Quiet period after the last file event before reloading, in milliseconds
    /// Editors often write a file in several steps
    /// Default: 250
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self { enabled: false, debounce_ms: default_debounce_ms() }
    }
}

fn default_debounce_ms() -> u64 {
    250
}
