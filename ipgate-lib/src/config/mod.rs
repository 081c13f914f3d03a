mod loader;
mod root;
mod telemetry;
mod validator;
mod whitelist;

pub use loader::{load_from_path, load_from_str};
pub use root::Config;
pub use telemetry::{LoggingConfig, ReloadConfig};
pub use validator::validate;
pub use whitelist::{GateConfig, RangeEntry, WhitelistConfig};
