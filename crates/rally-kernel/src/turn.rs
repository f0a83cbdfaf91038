//! Per-robot worker loop.
//!
//! ```text
//! for turn in 0..total_turns
//!   robot 0: publish snapshot     every robot: plan_move
//!   ── wait ──
//!   energy > 0  → apply_move       every robot: post energy
//!   ── wait ──  robot 0: reset claims
//!   energy == 0 → steal_energy
//!   ── wait ──
//! ```

use std::sync::Arc;

use tracing::trace;

use crate::barrier::BarrierSeat;
use crate::cell::RobotId;
use crate::movement::{apply_move, plan_move};
use crate::observer::TurnObserver;
use crate::simulation::SimulationContext;
use crate::steal::steal_energy;

/// Robot that publishes snapshots and clears the claim board.
const COORDINATOR: RobotId = 0;

pub(crate) async fn drive_robot(
    ctx: Arc<SimulationContext>,
    id: RobotId,
    seat: BarrierSeat,
    observer: Arc<dyn TurnObserver>,
) {
    for turn in 0..ctx.config.total_turns {
        if id == COORDINATOR {
            observer.on_turn(ctx.turn_snapshot(turn).await);
        }
        plan_move(&ctx, id, turn).await;
        seat.wait().await;

        if ctx.robots.energy(id).await > 0 {
            let outcome = apply_move(&ctx, id).await;
            trace!(robot = id, turn, ?outcome, "Movement phase done");
        }
        ctx.settle(id).await;
        seat.wait().await;

        if id == COORDINATOR {
            ctx.claims.reset();
        }
        if ctx.robots.energy(id).await == 0 {
            let outcome = steal_energy(&ctx, id).await;
            trace!(robot = id, turn, ?outcome, "Steal phase done");
        }
        seat.wait().await;
    }
}
