use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::address::Address;
use crate::config::{GateConfig, WhitelistConfig};
use crate::error::Result;
use crate::telemetry::Metrics;
use crate::whitelist::Whitelist;

/// Admission check a server runs before accepting a connection or
/// dispatching a request
///
/// The gate owns the whitelist and the on/off switch. While disabled every
/// peer is admitted and the whitelist is not consulted. While enabled a peer
/// is admitted only if the whitelist allows its address.
pub struct AccessGate {
    whitelist: Whitelist,
    enabled: AtomicBool,
    metrics: Option<Arc<Metrics>>,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(Whitelist::new())
    }
}

impl AccessGate {
    /// Starts disabled
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist, enabled: AtomicBool::new(false), metrics: None }
    }

    pub fn from_config(gate: &GateConfig, rules: &WhitelistConfig) -> Result<Self> {
        let access_gate = Self::new(rules.build()?);
        access_gate.enable(gate.enabled);
        Ok(access_gate)
    }

    /// Attach metrics; the rule gauge starts at the current whitelist size
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics.record_rules(self.whitelist.len());
        self.metrics = Some(metrics);
        self
    }

    /// Rules can be changed in place through the returned reference
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Replace all rules at once
    ///
    /// References obtained from [`AccessGate::whitelist`] observe the new
    /// rules.
    pub fn set_whitelist(&self, whitelist: Whitelist) {
        self.whitelist.replace(whitelist);
    }

    pub fn set_whitelist_from(&self, whitelist: &Whitelist) {
        self.whitelist.replace_from(whitelist);
    }

    pub fn enable(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Check a connection's peer address
    pub fn admit(&self, peer: SocketAddr) -> bool {
        let admitted = self.admit_ip(peer.ip());
        if !admitted {
            debug!(%peer, "peer blocked by whitelist");
        }
        admitted
    }

    /// IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`, as reported by dual-stack
    /// sockets) are checked as their IPv4 address
    pub fn admit_ip(&self, ip: IpAddr) -> bool {
        if !self.is_enabled() {
            self.record(|m| m.record_bypassed());
            return true;
        }
        self.check(Address::from(ip.to_canonical()))
    }

    /// Check an address in text form; unparsable text is blocked
    ///
    /// IPv4-mapped IPv6 text is unmapped the same way as in [`AccessGate::admit_ip`].
    pub fn admit_str(&self, text: &str) -> bool {
        if !self.is_enabled() {
            self.record(|m| m.record_bypassed());
            return true;
        }
        match IpAddr::from_str(text) {
            Ok(ip) => self.check(Address::from(ip.to_canonical())),
            Err(_) => {
                debug!(candidate = text, "unparsable peer address blocked");
                self.record(|m| m.record_denied(None));
                false
            }
        }
    }

    fn check(&self, addr: Address) -> bool {
        if self.whitelist.is_allowed_addr(&addr) {
            self.record(|m| m.record_allowed(addr.family()));
            true
        } else {
            self.record(|m| m.record_denied(Some(addr.family())));
            false
        }
    }

    fn record(&self, f: impl FnOnce(&Metrics)) {
        if let Some(m) = &self.metrics {
            f(m);
        }
    }
}
