//! Cyclic rendezvous for a fixed number of robot workers.
//!
//! Wraps `tokio::sync::Barrier`, which already resets itself after every
//! release, and adds the bookkeeping needed to catch protocol misuse:
//!
//! ```text
//! TurnBarrier::new(n)
//!   ├─ seat() × n      one seat per worker, the (n+1)th seat panics
//!   └─ seat.wait()     panics unless exactly n seats exist, then blocks until
//!                      all n seats have arrived; the last arrival releases all
//! ```
//!
//! A wrong participant count would leave workers parked forever, so it is
//! treated as a fatal programming error rather than a recoverable one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Barrier;

/// Barrier shared by all workers of a simulation.
#[derive(Debug)]
pub struct TurnBarrier {
    inner: Barrier,
    parties: usize,
    seated: AtomicUsize,
    generation: AtomicU64,
}

impl TurnBarrier {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Barrier::new(parties),
            parties,
            seated: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        })
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    pub fn seated(&self) -> usize {
        self.seated.load(Ordering::Acquire)
    }

    /// Number of completed release cycles.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Reserve one participant slot.
    ///
    /// # Panics
    /// When more than `parties` seats are requested.
    pub fn seat(self: &Arc<Self>) -> BarrierSeat {
        let index = self.seated.fetch_add(1, Ordering::AcqRel);
        assert!(
            index < self.parties,
            "barrier sized for {} participants was asked for seat {}",
            self.parties,
            index + 1
        );
        BarrierSeat {
            barrier: Arc::clone(self),
            index,
        }
    }
}

/// One worker's place at the barrier.
#[derive(Debug)]
pub struct BarrierSeat {
    barrier: Arc<TurnBarrier>,
    index: usize,
}

impl BarrierSeat {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Block until every seat has arrived, then continue together.
    ///
    /// # Panics
    /// When called before all `parties` seats were handed out.
    pub async fn wait(&self) {
        let seated = self.barrier.seated();
        assert_eq!(
            seated, self.barrier.parties,
            "barrier wait with {} seated participants, expected {}",
            seated, self.barrier.parties
        );

        let result = self.barrier.inner.wait().await;
        if result.is_leader() {
            self.barrier.generation.fetch_add(1, Ordering::AcqRel);
            tracing::trace!(
                generation = self.barrier.generation(),
                "Barrier released"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::JoinSet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_barrier_is_reusable_and_orders_phases() {
        const WORKERS: usize = 6;
        const CYCLES: usize = 25;

        let barrier = TurnBarrier::new(WORKERS);
        let arrivals = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();

        for _ in 0..WORKERS {
            let seat = barrier.seat();
            let arrivals = Arc::clone(&arrivals);
            set.spawn(async move {
                for cycle in 0..CYCLES {
                    arrivals.fetch_add(1, Ordering::SeqCst);
                    seat.wait().await;
                    // Every worker of this cycle has arrived before anyone continues
                    assert!(arrivals.load(Ordering::SeqCst) >= (cycle + 1) * WORKERS);
                    seat.wait().await;
                }
            });
        }

        while let Some(result) = set.join_next().await {
            result.unwrap();
        }
        assert_eq!(barrier.generation(), (CYCLES * 2) as u64);
        assert_eq!(arrivals.load(Ordering::SeqCst), CYCLES * WORKERS);
    }

    #[test]
    #[should_panic(expected = "asked for seat 3")]
    fn test_extra_seat_is_fatal() {
        let barrier = TurnBarrier::new(2);
        let _a = barrier.seat();
        let _b = barrier.seat();
        let _c = barrier.seat();
    }

    #[tokio::test]
    #[should_panic(expected = "barrier wait with 1 seated participants, expected 3")]
    async fn test_wait_before_all_seats_is_fatal() {
        let barrier = TurnBarrier::new(3);
        let seat = barrier.seat();
        seat.wait().await;
    }

    #[tokio::test]
    async fn test_single_participant_never_blocks() {
        let barrier = TurnBarrier::new(1);
        let seat = barrier.seat();
        for _ in 0..3 {
            seat.wait().await;
        }
        assert_eq!(barrier.generation(), 3);
        assert_eq!(seat.index(), 0);
    }
}
