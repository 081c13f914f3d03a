use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::RuleError;

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Largest valid CIDR prefix length for this family
    pub const fn max_prefix(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

/// Normalized IP address in its binary form
///
/// Equality and ordering only hold within one family. A v4 address is never
/// equal to, less than or greater than a v6 address (`partial_cmp` returns
/// `None`), so range checks across families evaluate to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    V4(u32),
    V6(u128),
}

impl Address {
    /// Parse dotted-quad IPv4 or colon-hex IPv6 text
    ///
    /// The whole string must be an address: surrounding whitespace, ports,
    /// zone ids and prefixes are rejected.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        IpAddr::from_str(text)
            .map(Self::from)
            .map_err(|_| RuleError::InvalidAddress(text.to_string()))
    }

    pub fn family(&self) -> Family {
        match self {
            Address::V4(_) => Family::V4,
            Address::V6(_) => Family::V6,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self, Address::V4(_))
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self, Address::V6(_))
    }

    pub fn to_ip(&self) -> IpAddr {
        match *self {
            Address::V4(bits) => IpAddr::V4(Ipv4Addr::from(bits)),
            Address::V6(bits) => IpAddr::V6(Ipv6Addr::from(bits)),
        }
    }

    /// Text form used by pattern rules
    ///
    /// Dotted-quad for v4 and RFC 5952 (compressed, lowercase) for v6.
    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Address::V4(a), Address::V4(b)) => Some(a.cmp(b)),
            (Address::V6(a), Address::V6(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_ip(), f)
    }
}

impl FromStr for Address {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::V4(u32::from(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address::V6(u128::from(ip))
    }
}
