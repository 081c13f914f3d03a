pub mod metrics;
pub mod tracing;

pub use metrics::{encode_metrics, init_metrics, Metrics};
pub use self::tracing::init_tracing;
