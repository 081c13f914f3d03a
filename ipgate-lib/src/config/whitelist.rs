use serde::Deserialize;

use crate::error::{GateError, Result};
use crate::whitelist::{RuleSet, Whitelist};

/// Gate settings
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Check peers against the whitelist
    /// When false every peer is admitted
    /// Default: false
    #[serde(default)]
    pub enabled: bool,
}

/// Inclusive address range
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RangeEntry {
    pub start: String,
    pub end: String,
}

/// Whitelist rules
///
/// ```toml
/// [whitelist]
/// addresses = ["127.0.0.1", "::1"]
/// cidrs = ["10.0.0.0/8", "2001:db8::/32"]
/// ranges = [{ start = "172.16.0.1", end = "172.16.0.100" }]
/// patterns = ['192\.168\.100\.\d+']
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct WhitelistConfig {
    /// Single addresses
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Networks in `address/prefix` notation
    #[serde(default)]
    pub cidrs: Vec<String>,
    /// Inclusive address ranges (both ends in the same family)
    #[serde(default)]
    pub ranges: Vec<RangeEntry>,
    /// Regular expressions matched against the whole canonical address text
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl WhitelistConfig {
    /// Build the rule set, failing on the first invalid entry
    ///
    /// Unlike the batch `add_many_*` calls, a config file with a typo is
    /// rejected as a whole rather than partially applied.
    pub fn build_rules(&self) -> Result<RuleSet> {
        let mut rules = RuleSet::new();

        for addr in &self.addresses {
            rules.add_exact(addr).map_err(|source| rule_error(addr, source))?;
        }
        for cidr in &self.cidrs {
            rules.add_cidr(cidr).map_err(|source| rule_error(cidr, source))?;
        }
        for range in &self.ranges {
            rules
                .add_range(&range.start, &range.end)
                .map_err(|source| rule_error(&format!("{}-{}", range.start, range.end), source))?;
        }
        for pattern in &self.patterns {
            rules.add_pattern(pattern).map_err(|source| rule_error(pattern, source))?;
        }

        Ok(rules)
    }

    pub fn build(&self) -> Result<Whitelist> {
        self.build_rules().map(Whitelist::from_rules)
    }
}

fn rule_error(entry: &str, source: crate::error::RuleError) -> GateError {
    GateError::Rule { entry: entry.to_string(), source }
}
