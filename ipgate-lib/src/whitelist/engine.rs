use arc_swap::ArcSwap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{trace, warn};

use super::store::RuleSet;
use crate::address::Address;
use crate::error::RuleError;

/// Thread-safe allow-list of IP addresses
///
/// Lookups read an immutable [`RuleSet`] snapshot through an [`ArcSwap`] and
/// never wait on writers. Writers are serialized by a mutex: each mutation
/// copies the current snapshot, edits the copy, and publishes it in a single
/// atomic store. A reader therefore sees either the state before a mutation
/// or the state after it, never a partial edit. Failed mutations publish
/// nothing.
///
/// # Example
///
/// ```
/// use ipgate_lib::Whitelist;
///
/// let whitelist = Whitelist::new();
/// assert!(whitelist.add_cidr("192.168.1.0/24").is_ok());
/// assert!(whitelist.is_allowed("192.168.1.200"));
/// assert!(!whitelist.is_allowed("192.168.2.1"));
/// assert!(!whitelist.is_allowed("not-an-ip"));
/// ```
#[derive(Debug)]
pub struct Whitelist {
    rules: ArcSwap<RuleSet>,
    write_lock: Mutex<()>,
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::from_rules(RuleSet::default())
    }
}

impl Clone for Whitelist {
    /// The clone starts from the same snapshot and diverges on first write
    fn clone(&self) -> Self {
        Self { rules: ArcSwap::new(self.rules.load_full()), write_lock: Mutex::new(()) }
    }
}

impl From<RuleSet> for Whitelist {
    fn from(rules: RuleSet) -> Self {
        Self::from_rules(rules)
    }
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: RuleSet) -> Self {
        Self { rules: ArcSwap::from_pointee(rules), write_lock: Mutex::new(()) }
    }

    /// Consistent view of all four collections
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Fail-closed check of a textual address
    ///
    /// Text that does not parse as an address is never allowed.
    pub fn is_allowed(&self, text: &str) -> bool {
        match Address::parse(text) {
            Ok(addr) => self.is_allowed_addr(&addr),
            Err(_) => {
                trace!(candidate = text, "unparsable address rejected");
                false
            }
        }
    }

    #[inline]
    pub fn is_allowed_addr(&self, addr: &Address) -> bool {
        self.rules.load().matches(addr)
    }

    pub fn is_allowed_ip(&self, ip: IpAddr) -> bool {
        self.is_allowed_addr(&Address::from(ip))
    }

    pub fn add_exact(&self, text: &str) -> Result<(), RuleError> {
        self.modify(|rules| rules.add_exact(text))
    }

    pub fn add_cidr(&self, text: &str) -> Result<(), RuleError> {
        self.modify(|rules| rules.add_cidr(text))
    }

    pub fn add_range(&self, start: &str, end: &str) -> Result<(), RuleError> {
        self.modify(|rules| rules.add_range(start, end))
    }

    pub fn add_pattern(&self, pattern: &str) -> Result<(), RuleError> {
        self.modify(|rules| rules.add_pattern(pattern))
    }

    pub fn remove_exact(&self, text: &str) -> Result<bool, RuleError> {
        let addr = Address::parse(text)?;
        let _guard = self.write_guard();
        let current = self.rules.load_full();
        if !current.contains_exact(&addr) {
            return Ok(false);
        }
        let mut next = RuleSet::clone(&current);
        next.remove_addr(&addr);
        self.rules.store(Arc::new(next));
        Ok(true)
    }

    /// Batch variants publish once, after every element has been applied
    pub fn add_many_exact<I, S>(&self, addrs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modify_batch(|rules| rules.add_many_exact(addrs))
    }

    pub fn add_many_cidr<I, S>(&self, cidrs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modify_batch(|rules| rules.add_many_cidr(cidrs))
    }

    pub fn add_many_ranges<I, S>(&self, ranges: I) -> usize
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        self.modify_batch(|rules| rules.add_many_ranges(ranges))
    }

    pub fn add_many_patterns<I, S>(&self, patterns: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.modify_batch(|rules| rules.add_many_patterns(patterns))
    }

    pub fn clear(&self) {
        let _guard = self.write_guard();
        self.rules.store(Arc::new(RuleSet::default()));
    }

    /// Install the rules of `other`, consuming it
    pub fn replace(&self, other: Whitelist) {
        let next = other.rules.into_inner();
        let _guard = self.write_guard();
        self.rules.store(next);
    }

    /// Install a copy of the rules of `other`
    pub fn replace_from(&self, other: &Whitelist) {
        let next = other.snapshot();
        let _guard = self.write_guard();
        self.rules.store(next);
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn empty(&self) -> bool {
        self.is_empty()
    }

    fn modify<T>(
        &self,
        apply: impl FnOnce(&mut RuleSet) -> Result<T, RuleError>,
    ) -> Result<T, RuleError> {
        let _guard = self.write_guard();
        let mut next = RuleSet::clone(&self.rules.load());
        let out = apply(&mut next)?;
        self.rules.store(Arc::new(next));
        Ok(out)
    }

    fn modify_batch(&self, apply: impl FnOnce(&mut RuleSet) -> usize) -> usize {
        let _guard = self.write_guard();
        let mut next = RuleSet::clone(&self.rules.load());
        let added = apply(&mut next);
        if added > 0 {
            self.rules.store(Arc::new(next));
        }
        added
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Whitelist writer lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
