use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

use crate::address::Family;
use crate::error::GateError;

pub mod labels {
    pub const FAMILY: &str = "family";
    pub const REASON: &str = "reason";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const FAMILY_V4: &str = "ipv4";
    pub const FAMILY_V6: &str = "ipv6";
    pub const REASON_NOT_LISTED: &str = "not_listed";
    pub const REASON_UNPARSABLE: &str = "unparsable";
}

#[derive(Clone)]
pub struct Metrics {
    // Gate decisions
    pub requests_total: Counter<u64>,
    pub allowed_total: Counter<u64>,
    pub denied_total: Counter<u64>,
    pub bypassed_total: Counter<u64>,

    // Config reloads
    pub reloads_total: Counter<u64>,
    pub reload_failures_total: Counter<u64>,
    pub rules: Gauge<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("ipgate_requests_total")
                .with_description("Total number of addresses evaluated by the whitelist")
                .build(),
            allowed_total: meter
                .u64_counter("ipgate_allowed_total")
                .with_description("Total number of addresses allowed by the whitelist")
                .build(),
            denied_total: meter
                .u64_counter("ipgate_denied_total")
                .with_description("Total number of addresses denied by the whitelist")
                .build(),
            bypassed_total: meter
                .u64_counter("ipgate_bypassed_total")
                .with_description("Total number of addresses admitted while the gate was disabled")
                .build(),

            reloads_total: meter
                .u64_counter("ipgate_reloads_total")
                .with_description("Total number of successful whitelist reloads")
                .build(),
            reload_failures_total: meter
                .u64_counter("ipgate_reload_failures_total")
                .with_description("Total number of whitelist reloads rejected (old rules kept)")
                .build(),
            rules: meter
                .u64_gauge("ipgate_rules")
                .with_description("Number of rules in the active whitelist")
                .build(),

            build_info: meter
                .u64_gauge("ipgate_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_allowed(&self, family: Family) {
        let attrs = &[KeyValue::new(labels::FAMILY, family_value(family))];
        self.requests_total.add(1, attrs);
        self.allowed_total.add(1, attrs);
    }

    pub fn record_denied(&self, family: Option<Family>) {
        let attrs = match family {
            Some(family) => [
                KeyValue::new(labels::FAMILY, family_value(family)),
                KeyValue::new(labels::REASON, values::REASON_NOT_LISTED),
            ],
            None => [
                KeyValue::new(labels::FAMILY, "unknown"),
                KeyValue::new(labels::REASON, values::REASON_UNPARSABLE),
            ],
        };
        self.requests_total.add(1, &attrs[..1]);
        self.denied_total.add(1, &attrs);
    }

    pub fn record_bypassed(&self) {
        self.bypassed_total.add(1, &[]);
    }

    pub fn record_reload(&self, rule_count: usize) {
        self.reloads_total.add(1, &[]);
        self.record_rules(rule_count);
    }

    pub fn record_rules(&self, rule_count: usize) {
        self.rules.record(rule_count as u64, &[]);
    }

    pub fn record_reload_failure(&self) {
        self.reload_failures_total.add(1, &[]);
    }
}

fn family_value(family: Family) -> &'static str {
    match family {
        Family::V4 => values::FAMILY_V4,
        Family::V6 => values::FAMILY_V6,
    }
}

/// Install a Prometheus-backed global meter provider and build the metrics
///
/// The returned registry is what an HTTP `/metrics` endpoint would gather.
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("ipgate");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}

/// Render the registry in the Prometheus text exposition format
pub fn encode_metrics(registry: &Registry) -> Result<String, GateError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| GateError::Config(format!("Failed to encode metrics: {e}")))?;

    String::from_utf8(buffer)
        .map_err(|e| GateError::Config(format!("Metrics are not valid UTF-8: {e}")))
}
