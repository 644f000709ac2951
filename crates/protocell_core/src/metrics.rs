//! Execution counters and structured logging for a hardware core.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-core execution counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareMetrics {
    steps: u64,
    executed: u64,
    failed: u64,
    divides: u64,
    injections: u64,
    forks: u64,
    kills: u64,
    mutations: u64,
    /// Fault counts keyed by `location/kind`.
    pub faults: BTreeMap<String, u64>,
}

impl HardwareMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed step.
    pub fn record_step(&mut self, executed: u64, failed: u64) {
        self.steps += 1;
        self.executed += executed;
        self.failed += failed;

        // Log at debug level every 1000 steps
        if self.steps.is_multiple_of(1000) {
            tracing::debug!(
                steps = self.steps,
                executed = self.executed,
                failed = self.failed,
                "Hardware progress"
            );
        }
    }

    pub fn record_fault(&mut self, key: &str) {
        *self.faults.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn record_divide(&mut self) {
        self.divides += 1;
    }

    pub fn record_injection(&mut self) {
        self.injections += 1;
    }

    pub fn record_fork(&mut self) {
        self.forks += 1;
    }

    pub fn record_kill(&mut self) {
        self.kills += 1;
    }

    pub fn record_mutations(&mut self, count: u32) {
        self.mutations += u64::from(count);
    }

    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed
    }

    #[must_use]
    pub fn divides(&self) -> u64 {
        self.divides
    }

    #[must_use]
    pub fn injections(&self) -> u64 {
        self.injections
    }

    #[must_use]
    pub fn forks(&self) -> u64 {
        self.forks
    }

    #[must_use]
    pub fn kills(&self) -> u64 {
        self.kills
    }

    #[must_use]
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.faults.values().sum()
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
