// SPDX-License-Identifier: MIT OR Apache-2.0
//! Telemetry for command executions: atomic counters and tracing setup.

use rcc_config::ClientConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use tracing_subscriber::EnvFilter;

use crate::CommandError;

/// Atomic command-level metrics that can be shared across threads.
pub struct CommandMetrics {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    /// Failures that a listener turned into a result.
    recovered: AtomicU64,
    service_errors: AtomicU64,
    transport_failures: AtomicU64,
    parser_faults: AtomicU64,
}

impl CommandMetrics {
    /// Create a new, zero-initialised metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            recovered: AtomicU64::new(0),
            service_errors: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            parser_faults: AtomicU64::new(0),
        }
    }

    /// Record a command that succeeded on the first attempt.
    pub fn record_success(&self) {
        self.total.fetch_add(1, Relaxed);
        self.succeeded.fetch_add(1, Relaxed);
    }

    /// Record a failed attempt that a listener recovered.
    pub fn record_recovered(&self) {
        self.total.fetch_add(1, Relaxed);
        self.succeeded.fetch_add(1, Relaxed);
        self.recovered.fetch_add(1, Relaxed);
    }

    /// Record a command that ended in `error`.
    pub fn record_failure(&self, error: &CommandError) {
        self.total.fetch_add(1, Relaxed);
        self.failed.fetch_add(1, Relaxed);
        match error {
            CommandError::Service { .. } => {
                self.service_errors.fetch_add(1, Relaxed);
            }
            CommandError::Transport(_) => {
                self.transport_failures.fetch_add(1, Relaxed);
            }
            CommandError::ParserFault { .. } => {
                self.parser_faults.fetch_add(1, Relaxed);
            }
            CommandError::Decode { .. }
            | CommandError::Listener { .. }
            | CommandError::InvalidCommand { .. }
            | CommandError::Config(_) => {}
        }
    }

    /// Take a point-in-time snapshot of the current metric values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total: self.total.load(Relaxed),
            succeeded: self.succeeded.load(Relaxed),
            failed: self.failed.load(Relaxed),
            recovered: self.recovered.load(Relaxed),
            service_errors: self.service_errors.load(Relaxed),
            transport_failures: self.transport_failures.load(Relaxed),
            parser_faults: self.parser_faults.load(Relaxed),
        }
    }
}

impl Default for CommandMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-atomic, serialisable snapshot of [`CommandMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Total number of commands executed.
    pub total: u64,
    /// Commands that produced a value, recovered ones included.
    pub succeeded: u64,
    /// Commands that ended in an error.
    pub failed: u64,
    /// Commands whose failure was replaced by a listener-supplied value.
    pub recovered: u64,
    /// Unrecovered service errors.
    pub service_errors: u64,
    /// Unrecovered transport failures.
    pub transport_failures: u64,
    /// Error parser faults.
    pub parser_faults: u64,
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (falling back to `info`)
/// applies to the `rcc` targets.  Calling this more than once is harmless:
/// later calls leave the first subscriber in place.
pub fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rcc={}", level.unwrap_or("info"))));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Install the global subscriber at the configured `log_level`.
///
/// Same precedence as [`init_tracing`]: `RUST_LOG` still wins.
pub fn init_tracing_from_config(config: &ClientConfig) {
    init_tracing(config.log_level.as_deref());
}
