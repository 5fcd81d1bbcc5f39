// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Idempotency guard.
//!
//! Exactly-once gate for the gatekeeper inside one process. The marker is a
//! single atomic flag claimed with one compare-and-swap, so two concurrent or
//! re-entrant attempts can never both pass.

use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide marker.
static GATEKEEPER_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Check-and-set gate over a process-visible marker.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyGuard {
    marker: &'static AtomicBool,
}

impl IdempotencyGuard {
    /// Guard over the process-wide marker.
    pub fn process() -> Self {
        Self {
            marker: &GATEKEEPER_ACTIVE,
        }
    }

    /// Guard over a caller-owned marker.
    pub fn with_marker(marker: &'static AtomicBool) -> Self {
        Self { marker }
    }

    /// Returns `true` if a gatekeeper already ran in this process.
    ///
    /// On `false` the marker is now claimed by the caller.
    pub fn check(&self) -> bool {
        self.marker
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
    }

    pub fn is_claimed(&self) -> bool {
        self.marker.load(Ordering::Acquire)
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::process()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn fresh_marker() -> &'static AtomicBool {
        Box::leak(Box::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_first_check_claims() {
        let guard = IdempotencyGuard::with_marker(fresh_marker());
        assert!(!guard.is_claimed());
        assert!(!guard.check());
        assert!(guard.is_claimed());
        assert!(guard.check());
        assert!(guard.check());
    }

    #[test]
    fn test_guards_share_marker() {
        let marker = fresh_marker();
        let first = IdempotencyGuard::with_marker(marker);
        let second = IdempotencyGuard::with_marker(marker);
        assert!(!first.check());
        assert!(second.check());
    }

    #[test]
    fn test_exactly_one_winner_across_threads() {
        let guard = IdempotencyGuard::with_marker(fresh_marker());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if !guard.check() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
