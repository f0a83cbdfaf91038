//! Canonical lock ordering.
//!
//! Every transaction in the kernel follows the same hierarchy:
//!
//! 1. robot locks, and when two are needed, lower id first ([`lock_pair`]);
//! 2. at most one cell lock at a time, only after the robot locks.
//!
//! Nothing waits while holding a cell lock, and the only robot-on-robot wait
//! goes through this helper, so the wait-for graph can never close a cycle.

use tokio::sync::MutexGuard;

use crate::cell::RobotId;
use crate::robot::{Robot, RobotRegistry};

/// Lock two distinct robots in ascending-id order.
///
/// Guards come back in argument order regardless of which was taken first.
///
/// # Panics
/// When `first == second`; a robot cannot be paired with itself.
pub async fn lock_pair(
    robots: &RobotRegistry,
    first: RobotId,
    second: RobotId,
) -> (MutexGuard<'_, Robot>, MutexGuard<'_, Robot>) {
    assert_ne!(first, second, "robot {} paired with itself", first);

    if first < second {
        let a = robots.lock(first).await;
        let b = robots.lock(second).await;
        (a, b)
    } else {
        let b = robots.lock(second).await;
        let a = robots.lock(first).await;
        (a, b)
    }
}
