//! Transaction counters, shared by every worker of a run.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free tallies of transaction outcomes.
///
/// Counters are only ever incremented and carry no ordering obligations;
/// they describe what happened, they never decide what happens.
#[derive(Debug, Default)]
pub struct TransactionStats {
    moves: AtomicUsize,
    blocked: AtomicUsize,
    aborted: AtomicUsize,
    idle: AtomicUsize,
    batteries: AtomicUsize,
    figures: AtomicUsize,
    steals: AtomicUsize,
    failed_steals: AtomicUsize,
}

impl TransactionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_move(&self) {
        self.moves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_idle(&self) {
        self.idle.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_battery(&self) {
        self.batteries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_figure(&self) {
        self.figures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_steal(&self) {
        self.steals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_steal(&self) {
        self.failed_steals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            moves: self.moves.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            idle: self.idle.load(Ordering::Relaxed),
            batteries: self.batteries.load(Ordering::Relaxed),
            figures: self.figures.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            failed_steals: self.failed_steals.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TransactionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Completed moves (each cost one unit of energy)
    pub moves: usize,
    /// Moves stopped by an occupant that stayed or by a lost claim
    pub blocked: usize,
    /// Plans cancelled because the destination was off the grid or a pillar
    pub aborted: usize,
    /// Turns where a powered robot had no usable program entry
    pub idle: usize,
    /// Batteries consumed
    pub batteries: usize,
    /// Figures collected
    pub figures: usize,
    /// Successful energy transfers
    pub steals: usize,
    /// Steals abandoned because the donor was drained first
    pub failed_steals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let stats = TransactionStats::new();
        stats.record_move();
        stats.record_move();
        stats.record_figure();
        stats.record_failed_steal();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.moves, 2);
        assert_eq!(snapshot.figures, 1);
        assert_eq!(snapshot.failed_steals, 1);
        assert_eq!(snapshot.steals, 0);
    }
}
