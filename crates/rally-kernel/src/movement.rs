//! Movement transaction: plan before the turn opens, apply after the first barrier.
//!
//! ```text
//! plan_move  (before barrier 1, own robot lock)
//!   ├─ no energy / program exhausted / unknown token → stay
//!   ├─ off the grid or pillar                          → stay (aborted)
//!   └─ otherwise                                       → claim destination
//! apply_move (between barrier 1 and 2)
//!   ├─ resolve the chain of occupants (one lock at a time, none held across)
//!   └─ own robot lock → destination cell → source cell
//! ```
//!
//! A destination is free when it has no occupant, or when its occupant's own
//! move resolves. Claims, plans and the turn-start occupancy are all fixed
//! before the movement barrier opens, so the answer does not depend on which
//! worker happens to run first.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cell::{CellObject, MoveToken, RobotId};
use crate::robot::MovePlan;
use crate::simulation::SimulationContext;

/// How a robot's movement phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The robot entered its destination and paid one unit of energy
    Moved,
    /// Another robot holds the destination, or the claim was lost
    Blocked,
    /// No move was planned this turn
    Stayed,
}

/// Decide where `id` goes this turn and register the claim.
///
/// Must run before the turn's first barrier; only the robot's own state and
/// the claim board are written.
pub(crate) async fn plan_move(ctx: &SimulationContext, id: RobotId, turn: usize) -> MovePlan {
    let mut robot = ctx.robots.lock(id).await;
    let origin = robot.position();

    if robot.energy() == 0 {
        let plan = MovePlan::stay(turn, origin);
        robot.set_plan(plan);
        return plan;
    }

    let destination = match robot.next_token() {
        None => {
            ctx.stats.record_idle();
            origin
        }
        Some(MoveToken::Unknown(symbol)) => {
            debug!(robot = id, turn, symbol = %symbol, "Unknown movement symbol, holding position");
            ctx.stats.record_idle();
            origin
        }
        Some(MoveToken::Heading(direction)) => match ctx.arena.offset(origin, direction) {
            None => {
                debug!(robot = id, turn, ?direction, "Destination off the grid, move aborted");
                ctx.stats.record_aborted();
                origin
            }
            Some(target) => {
                if ctx.arena.object(target).await.is_pillar() {
                    debug!(robot = id, turn, target = %target, "Destination is a pillar, move aborted");
                    ctx.stats.record_aborted();
                    origin
                } else {
                    target
                }
            }
        },
    };

    let plan = MovePlan::toward(turn, origin, destination);
    if plan.vacates() {
        ctx.claims.claim(destination, id);
    }
    robot.set_plan(plan);
    plan
}

/// True when `id` may enter its planned destination.
///
/// Walks the chain destination → occupant → occupant's destination … until it
/// reaches a free cell (success), a robot that stays or lost its claim
/// (failure), or loops back on itself (failure: a swap or rotation never
/// resolves). Holds at most one lock at any moment and none between steps.
async fn chain_resolves(ctx: &SimulationContext, id: RobotId, plan: &MovePlan) -> bool {
    let mut visited = vec![id];
    let mut mover = id;
    let mut target = plan.destination;

    loop {
        if ctx.claims.holder(target) != Some(mover) {
            trace!(robot = id, mover, target = %target, "Claim held by a lower id");
            return false;
        }

        let Some(occupant) = ctx.arena.occupant(target).await else {
            return true;
        };

        // A chain member that already moved into its claimed cell
        if occupant == mover && mover != id {
            return true;
        }
        if visited.contains(&occupant) {
            trace!(robot = id, occupant, "Movement chain loops back, nobody moves");
            return false;
        }

        let next = *ctx.robots.lock(occupant).await.plan();
        debug_assert_eq!(next.turn, plan.turn, "occupant {} planned for another turn", occupant);

        match next.outcome {
            Some(MoveOutcome::Moved) => return true,
            Some(_) => return false,
            None if !next.vacates() => return false,
            None => {}
        }

        visited.push(occupant);
        mover = occupant;
        target = next.destination;
    }
}

/// Apply `id`'s plan for the current turn.
pub(crate) async fn apply_move(ctx: &SimulationContext, id: RobotId) -> MoveOutcome {
    let plan = *ctx.robots.lock(id).await.plan();

    if !plan.vacates() {
        ctx.robots.lock(id).await.record_outcome(MoveOutcome::Stayed);
        return MoveOutcome::Stayed;
    }

    let clear = chain_resolves(ctx, id, &plan).await;

    let mut robot = ctx.robots.lock(id).await;
    debug_assert!(robot.energy() > 0, "robot {} applied a move without energy", id);
    if !clear {
        robot.record_outcome(MoveOutcome::Blocked);
        ctx.stats.record_blocked();
        debug!(robot = id, turn = plan.turn, target = %plan.destination, "Move blocked");
        return MoveOutcome::Blocked;
    }

    {
        let mut cell = ctx.arena.lock(plan.destination).await;
        debug_assert!(!cell.object.is_pillar());
        match cell.object {
            CellObject::Battery => {
                robot.recharge(ctx.config.battery_recharge);
                ctx.stats.record_battery();
                debug!(robot = id, at = %plan.destination, "Battery picked up");
            }
            CellObject::Figure => {
                robot.collect_figure();
                ctx.stats.record_figure();
                debug!(robot = id, at = %plan.destination, "Figure collected");
            }
            CellObject::Empty | CellObject::Pillar => {}
        }
        cell.object = CellObject::Empty;
        cell.occupant = Some(id);
    }

    {
        let mut source = ctx.arena.lock(plan.origin).await;
        // A chain predecessor may already stand here
        if source.occupant == Some(id) {
            source.occupant = None;
        }
    }

    robot.relocate(plan.destination);
    robot.record_outcome(MoveOutcome::Moved);
    ctx.stats.record_move();
    trace!(robot = id, from = %plan.origin, to = %plan.destination, energy = robot.energy(), "Moved");

    MoveOutcome::Moved
}
