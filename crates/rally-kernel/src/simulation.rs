//! Simulation: setup validation, worker orchestration and the final outcome.
//!
//! ```text
//! SimulationSetup ──validate──▶ Simulation::new
//!                                   │
//!              ┌────────────────────┴────────────────────┐
//!              ▼                                         ▼
//!        run()                                      run_sequential()
//!   one tokio task per robot,                  one task, robots in id order
//!   three barrier waits per turn               per phase, same transactions
//!              └────────────────────┬────────────────────┘
//!                                   ▼
//!                         SimulationOutcome
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::arena::Arena;
use crate::barrier::TurnBarrier;
use crate::cell::{CellObject, Position, RobotId};
use crate::claims::ClaimBoard;
use crate::config::SimulationConfig;
use crate::movement::{apply_move, plan_move};
use crate::observer::{ArenaSnapshot, NullObserver, TurnObserver, TurnSnapshot};
use crate::robot::{Robot, RobotRegistry, RobotReport, RobotSpec};
use crate::stats::{StatsSnapshot, TransactionStats};
use crate::steal::{steal_energy, StealBoard};
use crate::turn::drive_robot;

/// Everything a run needs before the first worker starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSetup {
    pub config: SimulationConfig,
    /// Row-major static contents
    pub grid: Vec<Vec<CellObject>>,
    /// Robot `i` gets id `i`
    pub robots: Vec<RobotSpec>,
}

impl SimulationSetup {
    /// Reject setups the core cannot run safely.
    pub fn validate(&self) -> Result<()> {
        let rows = self.grid.len();
        let cols = self.grid.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            bail!("Arena must have at least one row and one column");
        }
        if let Some((i, row)) = self.grid.iter().enumerate().find(|(_, row)| row.len() != cols) {
            bail!("Row {} has {} columns, expected {}", i, row.len(), cols);
        }
        if self.robots.is_empty() {
            bail!("At least one robot is required");
        }

        let mut taken = BTreeSet::new();
        for (id, spec) in self.robots.iter().enumerate() {
            let Position { row, col } = spec.position;
            if row >= rows || col >= cols {
                bail!(
                    "Robot {} starts at {} outside the {}x{} arena",
                    id,
                    spec.position,
                    rows,
                    cols
                );
            }
            if self.grid[row][col].is_pillar() {
                bail!("Robot {} starts on a pillar at {}", id, spec.position);
            }
            if !taken.insert(spec.position) {
                bail!("Robot {} starts on {}, which is already taken", id, spec.position);
            }
        }

        Ok(())
    }
}

/// Shared state handed by reference to every worker.
#[derive(Debug)]
pub(crate) struct SimulationContext {
    pub(crate) arena: Arena,
    pub(crate) robots: RobotRegistry,
    pub(crate) claims: ClaimBoard,
    pub(crate) steals: StealBoard,
    pub(crate) stats: TransactionStats,
    pub(crate) config: SimulationConfig,
}

impl SimulationContext {
    pub(crate) fn build(setup: SimulationSetup) -> Result<Self> {
        setup.validate()?;

        let SimulationSetup {
            config,
            grid,
            robots,
        } = setup;

        let mut arena = Arena::new(grid)?;
        for (id, spec) in robots.iter().enumerate() {
            arena.cell_mut(spec.position).occupant = Some(id);
        }

        let robots = robots
            .into_iter()
            .enumerate()
            .map(|(id, spec)| Robot::new(id, spec, config.battery_recharge))
            .collect();

        Ok(Self {
            arena,
            robots: RobotRegistry::new(robots),
            claims: ClaimBoard::new(),
            steals: StealBoard::new(),
            stats: TransactionStats::new(),
            config,
        })
    }

    /// Post `id`'s energy once its movement step is done.
    pub(crate) async fn settle(&self, id: RobotId) {
        self.steals.post(id, self.robots.energy(id).await);
    }

    /// Only meaningful between turns.
    pub(crate) async fn turn_snapshot(&self, turn: usize) -> TurnSnapshot {
        TurnSnapshot {
            turn,
            arena: self.arena.snapshot().await,
            robots: self.robots.reports().await,
        }
    }
}

/// Final state after every worker has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub turns: usize,
    pub arena: ArenaSnapshot,
    pub robots: Vec<RobotReport>,
    pub stats: StatsSnapshot,
}

impl SimulationOutcome {
    pub fn total_figures(&self) -> u32 {
        self.robots.iter().map(|r| r.collected).sum()
    }

    /// Cells occupied at the end of the run, independent of which robot holds them.
    pub fn occupancy(&self) -> BTreeSet<Position> {
        self.robots.iter().map(|r| r.position).collect()
    }

    pub fn total_energy(&self) -> u32 {
        self.robots.iter().map(|r| r.energy).sum()
    }
}

/// A validated arena and robot set, ready to run once.
pub struct Simulation {
    context: Arc<SimulationContext>,
    observer: Arc<dyn TurnObserver>,
}

impl Simulation {
    pub fn new(setup: SimulationSetup) -> Result<Self> {
        let context = SimulationContext::build(setup)?;
        debug!(
            rows = context.arena.rows(),
            cols = context.arena.cols(),
            robots = context.robots.len(),
            "Simulation built"
        );
        Ok(Self {
            context: Arc::new(context),
            observer: Arc::new(NullObserver),
        })
    }

    /// Receive a snapshot before every turn and one after the last.
    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> SimulationConfig {
        self.context.config
    }

    pub fn robot_count(&self) -> usize {
        self.context.robots.len()
    }

    pub async fn snapshot(&self) -> ArenaSnapshot {
        self.context.arena.snapshot().await
    }

    /// Run every turn with one concurrent worker per robot.
    ///
    /// A worker that panics breaks the barrier protocol for everyone else,
    /// so the remaining workers are aborted and the run fails.
    pub async fn run(self) -> Result<SimulationOutcome> {
        let ctx = &self.context;
        let total_turns = ctx.config.total_turns;
        info!(robots = ctx.robots.len(), total_turns, "Starting concurrent run");

        // Every seat must exist before the first worker can reach a wait
        let barrier = TurnBarrier::new(ctx.robots.len());
        let seats: Vec<_> = ctx.robots.ids().map(|_| barrier.seat()).collect();

        let mut workers = JoinSet::new();
        for (id, seat) in ctx.robots.ids().zip(seats) {
            workers.spawn(drive_robot(
                Arc::clone(ctx),
                id,
                seat,
                Arc::clone(&self.observer),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Robot worker failed, aborting the run");
                workers.abort_all();
                while workers.join_next().await.is_some() {}
                return Err(anyhow!("Robot worker failed: {}", e));
            }
        }

        debug!(generations = barrier.generation(), "All workers joined");
        Ok(self.finish().await)
    }

    /// Run the same transactions in a single task, robots in ascending id order.
    ///
    /// Uses the same snapshot, energy-post and claim-reset points as [`Simulation::run`].
    pub async fn run_sequential(self) -> Result<SimulationOutcome> {
        let ctx = &self.context;
        let total_turns = ctx.config.total_turns;
        info!(robots = ctx.robots.len(), total_turns, "Starting sequential run");

        for turn in 0..total_turns {
            self.observer.on_turn(ctx.turn_snapshot(turn).await);

            for id in ctx.robots.ids() {
                plan_move(ctx, id, turn).await;
            }
            for id in ctx.robots.ids() {
                if ctx.robots.energy(id).await > 0 {
                    apply_move(ctx, id).await;
                }
            }
            for id in ctx.robots.ids() {
                ctx.settle(id).await;
            }
            ctx.claims.reset();
            for id in ctx.robots.ids() {
                if ctx.robots.energy(id).await == 0 {
                    steal_energy(ctx, id).await;
                }
            }
        }

        Ok(self.finish().await)
    }

    async fn finish(self) -> SimulationOutcome {
        let ctx = &self.context;
        let turns = ctx.config.total_turns;

        let last = ctx.turn_snapshot(turns).await;
        let outcome = SimulationOutcome {
            turns,
            arena: last.arena.clone(),
            robots: last.robots.clone(),
            stats: ctx.stats.snapshot(),
        };
        self.observer.on_turn(last);

        info!(
            turns,
            figures = outcome.total_figures(),
            moves = outcome.stats.moves,
            steals = outcome.stats.steals,
            "Run complete"
        );
        outcome
    }
}
