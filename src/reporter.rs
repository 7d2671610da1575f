//! Progress handle shared between tile factories and the caller
//!
//! The orchestrator only hands this out; factories write to it and whatever
//! progress display the caller has reads from it.

use crate::prelude::Arc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Counters {
    requested: AtomicUsize,
    loaded: AtomicUsize,
    failed: AtomicUsize,
}

/// Cheaply cloneable progress handle
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    counters: Arc<Counters>,
}

/// Point-in-time copy of the reporter's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReporterSnapshot {
    /// Tile loads started
    pub requested: usize,
    pub loaded: usize,
    pub failed: usize,
    /// Started loads that have not finished yet
    pub in_flight: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_requested(&self) {
        self.counters.requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loaded(&self) {
        self.counters.loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReporterSnapshot {
        let requested = self.counters.requested.load(Ordering::Relaxed);
        let loaded = self.counters.loaded.load(Ordering::Relaxed);
        let failed = self.counters.failed.load(Ordering::Relaxed);
        ReporterSnapshot {
            requested,
            loaded,
            failed,
            in_flight: requested.saturating_sub(loaded + failed),
        }
    }

    /// True when both handles write to the same counters
    pub fn same_as(&self, other: &Reporter) -> bool {
        Arc::ptr_eq(&self.counters, &other.counters)
    }
}
