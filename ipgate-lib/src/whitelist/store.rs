use ahash::AHashSet;

use super::rules::{CidrRule, PatternRule, RangeRule};
use crate::address::Address;
use crate::error::RuleError;

/// The four rule collections of a whitelist
///
/// Plain owned value without synchronization; [`super::Whitelist`] publishes
/// snapshots of it to concurrent readers.
///
/// Only exact addresses can be removed one by one. CIDR, range and pattern
/// rules go away through [`RuleSet::clear`] or by replacing the whole set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    exact: AHashSet<Address>,
    cidrs: Vec<CidrRule>,
    ranges: Vec<RangeRule>,
    patterns: Vec<PatternRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single address. Adding an address twice is not an error.
    pub fn add_exact(&mut self, text: &str) -> Result<(), RuleError> {
        let addr = Address::parse(text)?;
        self.exact.insert(addr);
        Ok(())
    }

    pub fn add_cidr(&mut self, text: &str) -> Result<(), RuleError> {
        let rule = CidrRule::parse(text)?;
        self.cidrs.push(rule);
        Ok(())
    }

    pub fn add_range(&mut self, start: &str, end: &str) -> Result<(), RuleError> {
        let rule = RangeRule::parse(start, end)?;
        self.ranges.push(rule);
        Ok(())
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<(), RuleError> {
        let rule = PatternRule::new(pattern)?;
        self.patterns.push(rule);
        Ok(())
    }

    /// Returns `Ok(false)` when the address was not in the set
    pub fn remove_exact(&mut self, text: &str) -> Result<bool, RuleError> {
        let addr = Address::parse(text)?;
        Ok(self.remove_addr(&addr))
    }

    pub fn remove_addr(&mut self, addr: &Address) -> bool {
        self.exact.remove(addr)
    }

    /// Returns the number of addresses that parsed
    pub fn add_many_exact<I, S>(&mut self, addrs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addrs.into_iter().filter(|a| self.add_exact(a.as_ref()).is_ok()).count()
    }

    /// Returns the number of networks that parsed
    pub fn add_many_cidr<I, S>(&mut self, cidrs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        cidrs.into_iter().filter(|c| self.add_cidr(c.as_ref()).is_ok()).count()
    }

    pub fn add_many_ranges<I, S>(&mut self, ranges: I) -> usize
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        ranges
            .into_iter()
            .filter(|(start, end)| self.add_range(start.as_ref(), end.as_ref()).is_ok())
            .count()
    }

    pub fn add_many_patterns<I, S>(&mut self, patterns: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns.into_iter().filter(|p| self.add_pattern(p.as_ref()).is_ok()).count()
    }

    pub fn clear(&mut self) {
        self.exact.clear();
        self.cidrs.clear();
        self.ranges.clear();
        self.patterns.clear();
    }

    /// Total number of rules across all collections
    pub fn len(&self) -> usize {
        self.exact.len() + self.cidrs.len() + self.ranges.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn empty(&self) -> bool {
        self.is_empty()
    }

    pub fn exact_count(&self) -> usize {
        self.exact.len()
    }

    pub fn cidr_count(&self) -> usize {
        self.cidrs.len()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn contains_exact(&self, addr: &Address) -> bool {
        self.exact.contains(addr)
    }

    pub fn cidrs(&self) -> &[CidrRule] {
        &self.cidrs
    }

    pub fn ranges(&self) -> &[RangeRule] {
        &self.ranges
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    /// Check an address against every rule
    ///
    /// Cheapest collections are consulted first: exact, CIDR, range, then
    /// pattern. The canonical text is only rendered when patterns exist.
    pub fn matches(&self, addr: &Address) -> bool {
        if self.exact.contains(addr) {
            return true;
        }
        if self.cidrs.iter().any(|rule| rule.contains(addr)) {
            return true;
        }
        if self.ranges.iter().any(|rule| rule.contains(addr)) {
            return true;
        }
        if self.patterns.is_empty() {
            return false;
        }
        let canonical = addr.to_canonical_string();
        self.patterns.iter().any(|rule| rule.is_match(&canonical))
    }
}
