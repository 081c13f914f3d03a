//! IP allow-list rules and the concurrent lookup engine.
//!
//! A whitelist holds four independent rule collections:
//!
//! - **Exact** addresses (hash set, O(1) membership)
//! - **CIDR** networks (`10.0.0.0/8`, `2001:db8::/32`)
//! - **Ranges** of addresses (`172.16.0.1` - `172.16.0.100`, inclusive)
//! - **Patterns**: regular expressions over the canonical address text
//!
//! An address is allowed when it matches at least one rule in any
//! collection. Text that does not parse as an address is never allowed.

mod engine;
mod rules;
mod store;

pub use engine::Whitelist;
pub use rules::{CidrRule, PatternRule, RangeRule};
pub use store::RuleSet;
