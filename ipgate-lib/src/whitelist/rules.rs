use ipnet::IpNet;
use regex::Regex;
use std::fmt;

use crate::address::{Address, Family};
use crate::error::RuleError;

/// CIDR network rule (`address/prefix`)
///
/// The network is truncated to its prefix on construction, so
/// `192.168.1.77/24` is stored as `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrRule {
    net: IpNet,
}

impl CidrRule {
    pub fn new(network: Address, prefix_len: u8) -> Result<Self, RuleError> {
        let max = network.family().max_prefix();
        let net = IpNet::new(network.to_ip(), prefix_len).map_err(|_| {
            RuleError::PrefixOutOfRange { prefix: prefix_len.to_string(), max }
        })?;
        Ok(Self { net: net.trunc() })
    }

    /// Parse `addr/prefix` text
    ///
    /// The prefix must be a non-empty run of ASCII digits no larger than the
    /// family maximum (32 for v4, 128 for v6).
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let (addr_part, prefix_part) =
            text.rsplit_once('/').ok_or_else(|| RuleError::MissingPrefix(text.to_string()))?;

        if prefix_part.is_empty() || !prefix_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RuleError::InvalidPrefix(prefix_part.to_string()));
        }

        let network = Address::parse(addr_part)?;
        let max = network.family().max_prefix();
        let prefix_len = prefix_part
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= max)
            .ok_or_else(|| RuleError::PrefixOutOfRange { prefix: prefix_part.to_string(), max })?;

        Self::new(network, prefix_len)
    }

    pub fn network(&self) -> Address {
        Address::from(self.net.network())
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    pub fn family(&self) -> Family {
        self.network().family()
    }

    /// Mismatched families never match
    #[inline]
    pub fn contains(&self, addr: &Address) -> bool {
        self.net.contains(&addr.to_ip())
    }
}

impl fmt::Display for CidrRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.net, f)
    }
}

/// Closed interval of addresses within one family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRule {
    start: Address,
    end: Address,
}

impl RangeRule {
    /// Bounds are never swapped: `start > end` is an error
    pub fn new(start: Address, end: Address) -> Result<Self, RuleError> {
        if start.family() != end.family() {
            return Err(RuleError::FamilyMismatch {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        if start > end {
            return Err(RuleError::InvertedRange { start: start.to_string(), end: end.to_string() });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, RuleError> {
        Self::new(Address::parse(start)?, Address::parse(end)?)
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn family(&self) -> Family {
        self.start.family()
    }

    #[inline]
    pub fn contains(&self, addr: &Address) -> bool {
        self.start <= *addr && *addr <= self.end
    }
}

impl fmt::Display for RangeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Regular expression over the canonical address text
///
/// The expression must match the whole string, so `10\.0\.0\.1` does not
/// admit `10.0.0.12`.
#[derive(Debug, Clone)]
pub struct PatternRule {
    source: String,
    regex: Regex,
}

impl PatternRule {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let invalid = |e: regex::Error| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        };
        // The bare pattern must compile on its own, otherwise a stray `)` could
        // close the anchoring group and leave an unanchored branch
        Regex::new(pattern).map_err(invalid)?;
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)?;
        Ok(Self { source: pattern.to_string(), regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_match(&self, canonical: &str) -> bool {
        self.regex.is_match(canonical)
    }
}

impl PartialEq for PatternRule {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PatternRule {}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
