#![forbid(unsafe_code)]

pub mod address;
pub mod config;
pub mod error;
pub mod reload;
pub mod security;
pub mod telemetry;
pub mod whitelist;

pub use address::{Address, Family};
pub use config::{load_from_path, Config};
pub use error::{GateError, Result, RuleError};
pub use reload::{reload_from_path, ConfigWatcher};
pub use security::AccessGate;
pub use whitelist::{CidrRule, PatternRule, RangeRule, RuleSet, Whitelist};
