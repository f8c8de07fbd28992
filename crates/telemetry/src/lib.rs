//! Telemetry: JSON logging setup and in-process decision counters.

#![deny(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use aegis_core::Decision;

/// Initialize structured logging (JSON) with env filter.
/// Set `RUST_LOG`, e.g. `info,pdp=debug`.
pub fn init_json_logging() {
    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Plain-text logging for interactive use (the CLI).
pub fn init_plain_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = Registry::default().with(filter).with(fmt::layer().compact());
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Cheap-to-clone counters of final decisions, for tests and local
/// observability. Not persisted across process restarts.
#[derive(Clone, Default, Debug)]
pub struct DecisionMetrics {
    permit: Arc<AtomicU64>,
    deny: Arc<AtomicU64>,
    not_applicable: Arc<AtomicU64>,
    indeterminate: Arc<AtomicU64>,
}

impl DecisionMetrics {
    /// Fresh zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one decision.
    pub fn record(&self, decision: Decision) {
        let counter = match decision {
            Decision::Permit => &self.permit,
            Decision::Deny => &self.deny,
            Decision::NotApplicable => &self.not_applicable,
            Decision::Indeterminate => &self.indeterminate,
        };
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counts as (permit, deny, not-applicable, indeterminate).
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.permit.load(Ordering::Relaxed),
            self.deny.load(Ordering::Relaxed),
            self.not_applicable.load(Ordering::Relaxed),
            self.indeterminate.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = DecisionMetrics::new();
        metrics.record(Decision::Permit);
        metrics.record(Decision::Permit);
        metrics.record(Decision::Deny);
        let clone = metrics.clone();
        clone.record(Decision::Indeterminate);
        assert_eq!(metrics.snapshot(), (2, 1, 0, 1));
    }
}
