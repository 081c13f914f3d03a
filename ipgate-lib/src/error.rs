use thiserror::Error;

/// Reasons a rule cannot be added to a whitelist
///
/// Every variant leaves the rule store untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid IP address: {0:?}")]
    InvalidAddress(String),

    #[error("Missing prefix length in CIDR: {0:?}")]
    MissingPrefix(String),

    #[error("Invalid prefix length: {0:?}")]
    InvalidPrefix(String),

    #[error("Prefix length {prefix} out of range (max {max})")]
    PrefixOutOfRange { prefix: String, max: u8 },

    #[error("Range bounds belong to different address families: {start} - {end}")]
    FamilyMismatch { start: String, end: String },

    #[error("Range start is greater than range end: {start} - {end}")]
    InvertedRange { start: String, end: String },

    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors that can occur outside rule evaluation (config, reload, telemetry)
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid whitelist entry {entry:?}: {source}")]
    Rule {
        entry: String,
        #[source]
        source: RuleError,
    },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, GateError>;
