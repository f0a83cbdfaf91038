//! Energy-steal transaction for robots that ran dry.
//!
//! Eligibility and donor choice read the [`StealBoard`], which holds the energy
//! every robot carried out of the movement phase and does not change while
//! thieves run. Thieves that pick the same donor queue by id: the k-th lowest
//! (counting from 0) is served only if the donor's posted energy minus k is
//! still at least [`MIN_DONOR_ENERGY`]. The transfer takes both robot locks
//! through [`lock_pair`] and re-validates the live energies.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::{Position, RobotId};
use crate::locks::lock_pair;
use crate::simulation::SimulationContext;

/// Minimum donor energy: the donor keeps at least one unit after giving one.
const MIN_DONOR_ENERGY: u32 = 2;

/// Energy each robot held when its movement step finished.
///
/// Every robot posts once per turn before the movement barrier releases, so
/// entries are overwritten rather than reset.
#[derive(Debug, Default)]
pub struct StealBoard {
    settled: DashMap<RobotId, u32>,
}

impl StealBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, robot: RobotId, energy: u32) {
        self.settled.insert(robot, energy);
    }

    pub fn settled(&self, robot: RobotId) -> Option<u32> {
        self.settled.get(&robot).map(|entry| *entry)
    }

    fn is_donor(&self, robot: RobotId) -> bool {
        self.settled(robot).is_some_and(|energy| energy >= MIN_DONOR_ENERGY)
    }

    fn is_dry(&self, robot: RobotId) -> bool {
        self.settled(robot) == Some(0)
    }

    /// Units `donor` can hand out this turn without dropping below one.
    fn spare(&self, donor: RobotId) -> u32 {
        self.settled(donor)
            .map_or(0, |energy| energy.saturating_sub(MIN_DONOR_ENERGY - 1))
    }
}

/// How a steal attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StealOutcome {
    /// One unit moved from the donor to the thief
    Stole { donor: RobotId },
    /// Lower-id thieves used up everything the donor could spare
    Lost { donor: RobotId },
    /// No neighbour had energy to spare
    NoDonor,
    /// The robot still has energy and does not steal
    Ineligible,
}

/// Lowest-id robot next to `at` that left the movement phase with at least
/// [`MIN_DONOR_ENERGY`]. Reads one cell lock at a time.
async fn donor_near(ctx: &SimulationContext, at: Position) -> Option<RobotId> {
    let mut donor: Option<RobotId> = None;

    for neighbour in ctx.arena.neighbors(at) {
        let Some(other) = ctx.arena.occupant(neighbour).await else {
            continue;
        };
        if ctx.steals.is_donor(other) && donor.is_none_or(|current| other < current) {
            donor = Some(other);
        }
    }

    donor
}

/// Dry robots with a lower id than `id` whose own choice is also `donor`.
async fn thieves_ahead(ctx: &SimulationContext, id: RobotId, donor: RobotId) -> u32 {
    let donor_at = ctx.robots.lock(donor).await.position();
    let mut ahead = 0;

    for neighbour in ctx.arena.neighbors(donor_at) {
        let Some(other) = ctx.arena.occupant(neighbour).await else {
            continue;
        };
        if other < id && ctx.steals.is_dry(other) && donor_near(ctx, neighbour).await == Some(donor) {
            ahead += 1;
        }
    }

    ahead
}

/// Attempt at most one steal for `id`.
pub(crate) async fn steal_energy(ctx: &SimulationContext, id: RobotId) -> StealOutcome {
    if ctx.robots.energy(id).await != 0 || !ctx.steals.is_dry(id) {
        return StealOutcome::Ineligible;
    }

    let origin = ctx.robots.lock(id).await.position();
    let Some(donor) = donor_near(ctx, origin).await else {
        return StealOutcome::NoDonor;
    };
    ctx.robots.lock(id).await.set_steal_target(Some(donor));

    let ahead = thieves_ahead(ctx, id, donor).await;
    if ahead >= ctx.steals.spare(donor) {
        ctx.robots.lock(id).await.set_steal_target(None);
        ctx.stats.record_failed_steal();
        debug!(thief = id, donor, ahead, "Donor already spoken for by lower ids");
        return StealOutcome::Lost { donor };
    }

    let (mut thief, mut victim) = lock_pair(&ctx.robots, id, donor).await;
    let stole = victim.transfer_unit_to(&mut thief);
    thief.set_steal_target(None);

    if stole {
        ctx.stats.record_steal();
        debug!(
            thief = id,
            donor,
            donor_energy = victim.energy(),
            "Stole one unit of energy"
        );
        StealOutcome::Stole { donor }
    } else {
        ctx.stats.record_failed_steal();
        debug!(thief = id, donor, "Donor drained before the transfer, steal abandoned");
        StealOutcome::Lost { donor }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::simulation::tests::context;

    /// Post every robot's current energy, as the movement phase does.
    async fn settle(ctx: &SimulationContext) {
        for id in ctx.robots.ids() {
            ctx.settle(id).await;
        }
    }

    #[test]
    fn test_board_spare_keeps_one_unit() {
        let board = StealBoard::new();
        board.post(0, 3);
        board.post(1, 1);
        board.post(2, 0);

        assert_eq!(board.spare(0), 2);
        assert_eq!(board.spare(1), 0);
        assert_eq!(board.spare(7), 0);
        assert!(board.is_donor(0));
        assert!(!board.is_donor(1));
        assert!(board.is_dry(2));

        board.post(2, 4);
        assert_eq!(board.settled(2), Some(4));
    }

    #[tokio::test]
    async fn test_dry_robot_steals_one_unit() {
        let ctx = context(&[".."], &[((0, 0), "", 0), ((0, 1), "", 3)], 3);
        settle(&ctx).await;

        assert_eq!(steal_energy(&ctx, 0).await, StealOutcome::Stole { donor: 1 });
        assert_eq!(ctx.robots.energy(0).await, 1);
        assert_eq!(ctx.robots.energy(1).await, 2);
        assert_eq!(ctx.robots.lock(0).await.steal_target(), None);
    }

    #[tokio::test]
    async fn test_powered_robot_never_steals() {
        let ctx = context(&[".."], &[((0, 0), "", 1), ((0, 1), "", 5)], 5);
        settle(&ctx).await;
        assert_eq!(steal_energy(&ctx, 0).await, StealOutcome::Ineligible);
        assert_eq!(ctx.robots.energy(1).await, 5);
    }

    #[tokio::test]
    async fn test_donor_with_one_unit_is_skipped() {
        let ctx = context(&["..."], &[((0, 1), "", 0), ((0, 0), "", 1), ((0, 2), "", 1)], 1);
        settle(&ctx).await;
        assert_eq!(steal_energy(&ctx, 0).await, StealOutcome::NoDonor);
        assert_eq!(ctx.robots.energy(1).await, 1);
        assert_eq!(ctx.robots.energy(2).await, 1);
    }

    #[tokio::test]
    async fn test_lowest_id_neighbour_is_robbed() {
        // Thief 3 in the centre; 1 to the south, 2 to the north, 0 far away
        let ctx = context(
            &["...", "...", "..."],
            &[((0, 0), "", 9), ((2, 1), "", 4), ((0, 1), "", 4), ((1, 1), "", 0)],
            4,
        );
        settle(&ctx).await;
        assert_eq!(steal_energy(&ctx, 3).await, StealOutcome::Stole { donor: 1 });
        assert_eq!(ctx.robots.energy(1).await, 3);
        assert_eq!(ctx.robots.energy(2).await, 4);
        assert_eq!(ctx.robots.energy(0).await, 9);
    }

    #[tokio::test]
    async fn test_higher_id_loses_regardless_of_arrival() {
        // Donor 0 between thieves 1 and 2 with a single unit to spare
        let ctx = context(&["..."], &[((0, 1), "", 2), ((0, 0), "", 0), ((0, 2), "", 0)], 2);
        settle(&ctx).await;

        // Thief 2 runs first and still loses the queue to thief 1
        assert_eq!(steal_energy(&ctx, 2).await, StealOutcome::Lost { donor: 0 });
        assert_eq!(steal_energy(&ctx, 1).await, StealOutcome::Stole { donor: 0 });
        assert_eq!(ctx.robots.energy(0).await, 1);
        assert_eq!(ctx.robots.energy(1).await, 1);
        assert_eq!(ctx.robots.energy(2).await, 0);
    }

    #[tokio::test]
    async fn test_thief_with_other_donor_does_not_queue() {
        // Thief 1 prefers donor 0; thief 3 only sees donor 2
        let ctx = context(
            &["....."],
            &[((0, 0), "", 2), ((0, 1), "", 0), ((0, 2), "", 2), ((0, 3), "", 0)],
            2,
        );
        settle(&ctx).await;

        assert_eq!(steal_energy(&ctx, 3).await, StealOutcome::Stole { donor: 2 });
        assert_eq!(steal_energy(&ctx, 1).await, StealOutcome::Stole { donor: 0 });
        assert_eq!(ctx.stats.snapshot().failed_steals, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_thieves_served_in_id_order() {
        // Donor 0 in the centre with 3 units, four dry thieves around it
        let ctx = Arc::new(context(
            &["...", "...", "..."],
            &[
                ((1, 1), "", 3),
                ((0, 1), "", 0),
                ((2, 1), "", 0),
                ((1, 0), "", 0),
                ((1, 2), "", 0),
            ],
            3,
        ));
        settle(&ctx).await;

        let mut handles = Vec::new();
        for thief in (1..5).rev() {
            let ctx = Arc::clone(&ctx);
            handles.push((thief, tokio::spawn(async move { steal_energy(&ctx, thief).await })));
        }
        for (thief, handle) in handles {
            let expected = if thief <= 2 {
                StealOutcome::Stole { donor: 0 }
            } else {
                StealOutcome::Lost { donor: 0 }
            };
            assert_eq!(handle.await.unwrap(), expected, "thief {}", thief);
        }

        assert_eq!(ctx.robots.energy(0).await, 1);
        let mut total = 0;
        for id in 0..5 {
            total += ctx.robots.energy(id).await;
        }
        assert_eq!(total, 3);
        assert_eq!(ctx.stats.snapshot().steals, 2);
        assert_eq!(ctx.stats.snapshot().failed_steals, 2);
    }
}
