// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Delivery counters for the telemetry reporter.
//!
//! Lock-free so the host-side `report` path never waits on the worker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the reporter and its worker.
#[derive(Debug, Default)]
pub struct ReporterStats {
    /// Events handed off: queued for the worker or written to a launched forwarder.
    queued: AtomicU64,

    /// Events the sink acknowledged (forwarder exited cleanly).
    delivered: AtomicU64,

    /// Events never handed off (channel full or worker gone).
    dropped: AtomicU64,

    /// Events whose sink failed to start, rejected them or timed out.
    failed: AtomicU64,
}

impl ReporterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> ReporterStatsSnapshot {
        ReporterStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ReporterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStatsSnapshot {
    pub queued: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = ReporterStats::new();
        stats.record_queued();
        stats.record_queued();
        stats.record_delivered();
        stats.record_dropped();

        let snap = stats.snapshot();
        assert_eq!(snap.queued, 2);
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.failed, 0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let stats = ReporterStats::new();
        let before = stats.snapshot();
        stats.record_failed();
        assert_eq!(before, ReporterStatsSnapshot::default());
        assert_eq!(stats.snapshot().failed, 1);
    }
}
