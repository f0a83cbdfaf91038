//! Run orchestration: pick a strategy, stream turn reports, collect results.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use rally_kernel::{ChannelObserver, Simulation, SimulationSetup};

use crate::report::{render_turn, RunResult};

/// How the robots are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One concurrent worker per robot, synchronized by the turn barrier
    Concurrent,
    /// Single worker, robots in id order per phase (baseline)
    Sequential,
}

impl Strategy {
    pub fn all() -> Vec<Self> {
        vec![Self::Concurrent, Self::Sequential]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Concurrent => "concurrent",
            Self::Sequential => "sequential",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "concurrent" | "conc" | "tasks" => Ok(Self::Concurrent),
            "sequential" | "seq" => Ok(Self::Sequential),
            _ => bail!("Unknown strategy: {}. Valid: concurrent, sequential", s),
        }
    }
}

/// Configuration for the runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub strategy: Strategy,
    /// Print `Turn k:` and the grid before each turn and after the last
    pub print_turns: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Concurrent,
            print_turns: true,
        }
    }
}

/// Runs one setup with the configured strategy.
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, setup: SimulationSetup) -> Result<RunResult> {
        let strategy = self.config.strategy;
        let rows = setup.grid.len();
        let cols = setup.grid.first().map_or(0, Vec::len);
        let config = setup.config;

        let (observer, mut rx) = ChannelObserver::channel();
        let simulation = Simulation::new(setup)?.with_observer(Arc::new(observer));

        // Snapshots are printed as they arrive; the channel closes with the simulation
        let print_turns = self.config.print_turns;
        let printer = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                if print_turns {
                    print!("{}", render_turn(&snapshot));
                }
            }
        });

        info!(
            strategy = strategy.name(),
            rows,
            cols,
            robots = simulation.robot_count(),
            turns = config.total_turns,
            "Running simulation"
        );

        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = match strategy {
            Strategy::Concurrent => simulation.run().await,
            Strategy::Sequential => simulation.run_sequential().await,
        };
        let duration_ms = clock.elapsed().as_millis() as u64;
        let ended_at = Utc::now();

        printer.await.context("Snapshot printer failed")?;
        let outcome = outcome?;

        Ok(RunResult {
            run_id: Uuid::new_v4(),
            strategy: strategy.name().to_string(),
            config,
            rows,
            cols,
            started_at,
            ended_at,
            duration_ms,
            outcome,
        })
    }
}

/// Concurrent and sequential results for the same setup.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub concurrent: RunResult,
    pub sequential: RunResult,
}

impl Comparison {
    /// Order-independent aggregates that differ between the two runs.
    pub fn divergences(&self) -> Vec<String> {
        let mut found = Vec::new();

        let (a, b) = (&self.concurrent.outcome, &self.sequential.outcome);
        if a.total_figures() != b.total_figures() {
            found.push(format!(
                "total figures: concurrent {} vs sequential {}",
                a.total_figures(),
                b.total_figures()
            ));
        }
        if a.occupancy() != b.occupancy() {
            found.push(format!(
                "final occupancy: concurrent {:?} vs sequential {:?}",
                a.occupancy(),
                b.occupancy()
            ));
        }
        found
    }

    pub fn matches(&self) -> bool {
        self.divergences().is_empty()
    }
}

/// Run `setup` with both strategies, without printing turns.
pub async fn compare(setup: SimulationSetup) -> Result<Comparison> {
    let mut results = Vec::with_capacity(2);
    for strategy in Strategy::all() {
        let runner = Runner::new(RunnerConfig {
            strategy,
            print_turns: false,
        });
        results.push(runner.run(setup.clone()).await?);
    }

    let sequential = results.pop().context("Sequential run missing")?;
    let concurrent = results.pop().context("Concurrent run missing")?;
    Ok(Comparison {
        concurrent,
        sequential,
    })
}
