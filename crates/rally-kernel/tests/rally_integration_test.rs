//! Integration tests for full simulation runs.
//!
//! Covers:
//! - Occupancy and energy invariants at every inter-turn observation point
//! - The steal, pillar and figure scenarios through the public API
//! - Concurrent vs sequential aggregate cross-check on generated arenas

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Duration};

use rally_kernel::{
    CellObject, ChannelObserver, MoveToken, Position, RobotSpec, Simulation, SimulationConfig,
    SimulationSetup, SnapshotCell, TurnSnapshot,
};

/// Test helper to build a random but valid setup
fn random_setup(seed: u64, robots: usize, recharge: u32, total_turns: usize) -> SimulationSetup {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows = rng.random_range(3..8);
    let cols = rng.random_range(3..8);

    let mut grid = vec![vec![CellObject::Empty; cols]; rows];
    let mut free = Vec::new();
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            let roll: f64 = rng.random();
            *cell = if roll < 0.1 {
                CellObject::Pillar
            } else if roll < 0.2 {
                CellObject::Battery
            } else if roll < 0.4 {
                CellObject::Figure
            } else {
                CellObject::Empty
            };
            if !cell.is_pillar() {
                free.push(Position::new(r, c));
            }
        }
    }
    free.shuffle(&mut rng);

    let symbols = ['N', 'S', 'L', 'O', 'N', 'S', 'L', 'O', '?'];
    let robots = free
        .into_iter()
        .take(robots)
        .map(|position| {
            let len = rng.random_range(0..=total_turns);
            let program: String = (0..len)
                .map(|_| symbols[rng.random_range(0..symbols.len())])
                .collect();
            RobotSpec::new(position, MoveToken::parse_program(&program))
        })
        .collect();

    SimulationSetup {
        config: SimulationConfig {
            battery_recharge: recharge,
            total_turns,
        },
        grid,
        robots,
    }
}

fn drain(rx: &mut UnboundedReceiver<TurnSnapshot>) -> Vec<TurnSnapshot> {
    let mut snapshots = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        snapshots.push(snapshot);
    }
    snapshots
}

/// Every robot sits where the arena says it sits, and nowhere else.
fn assert_bijection(snapshot: &TurnSnapshot) {
    let mut seen = BTreeSet::new();
    for report in &snapshot.robots {
        assert!(
            seen.insert(report.position),
            "turn {}: two robots report {}",
            snapshot.turn,
            report.position
        );
        assert_eq!(
            snapshot.arena.get(report.position.row, report.position.col),
            Some(SnapshotCell::Robot(report.id)),
            "turn {}: robot {} not found at {}",
            snapshot.turn,
            report.id,
            report.position
        );
    }
    assert_eq!(snapshot.arena.occupants().len(), snapshot.robots.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invariants_hold_after_every_turn() {
    for seed in 0..20 {
        // Low recharge keeps robots running dry, so steals happen too
        let setup = random_setup(seed, 6, 1, 12);
        let robots = setup.robots.len();
        let (observer, mut rx) = ChannelObserver::channel();

        let outcome = Simulation::new(setup)
            .unwrap()
            .with_observer(Arc::new(observer))
            .run()
            .await
            .unwrap();

        let snapshots = drain(&mut rx);
        assert_eq!(snapshots.len(), 13, "seed {}", seed);
        for (turn, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(snapshot.turn, turn);
            assert_eq!(snapshot.robots.len(), robots);
            assert_bijection(snapshot);
        }

        // Figures are never created, only moved from the grid to a robot
        let first = &snapshots[0];
        let last = &snapshots[12];
        let collected_before: u32 = first.robots.iter().map(|r| r.collected).sum();
        assert_eq!(collected_before, 0);
        assert!(last.arena.figures_remaining() <= first.arena.figures_remaining());
        assert_eq!(outcome.total_figures() as usize, outcome.stats.figures);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_heavy_contention_completes() {
    // Dense arena, many robots, tiny recharge: every phase is contested
    for seed in 100..110 {
        let setup = random_setup(seed, 12, 1, 30);
        let run = Simulation::new(setup).unwrap().run();
        let outcome = timeout(Duration::from_secs(30), run)
            .await
            .expect("simulation deadlocked")
            .unwrap();
        assert_eq!(outcome.turns, 30);
        assert_eq!(outcome.occupancy().len(), outcome.robots.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_steal_scenario() {
    let setup = SimulationSetup {
        config: SimulationConfig {
            battery_recharge: 3,
            total_turns: 1,
        },
        grid: vec![vec![CellObject::Empty, CellObject::Empty]],
        robots: vec![
            RobotSpec::new(Position::new(0, 0), Vec::new()).with_energy(0),
            RobotSpec::new(Position::new(0, 1), Vec::new()),
        ],
    };

    let outcome = Simulation::new(setup).unwrap().run().await.unwrap();
    assert_eq!(outcome.robots[0].energy, 1);
    assert_eq!(outcome.robots[1].energy, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pillar_scenario() {
    let setup = SimulationSetup {
        config: SimulationConfig {
            battery_recharge: 2,
            total_turns: 1,
        },
        grid: vec![
            vec![CellObject::Empty, CellObject::Empty],
            vec![CellObject::Pillar, CellObject::Empty],
        ],
        robots: vec![RobotSpec::new(Position::new(0, 0), MoveToken::parse_program("S"))],
    };

    let outcome = Simulation::new(setup).unwrap().run().await.unwrap();
    assert_eq!(outcome.robots[0].position, Position::new(0, 0));
    assert_eq!(outcome.robots[0].energy, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_figure_scenario() {
    let setup = SimulationSetup {
        config: SimulationConfig {
            battery_recharge: 5,
            total_turns: 2,
        },
        grid: vec![vec![CellObject::Empty, CellObject::Figure, CellObject::Empty]],
        robots: vec![RobotSpec::new(Position::new(0, 0), MoveToken::parse_program("LL"))],
    };

    let outcome = Simulation::new(setup).unwrap().run().await.unwrap();
    assert_eq!(outcome.robots[0].collected, 1);
    assert_eq!(outcome.robots[0].energy, 3);
    assert_eq!(outcome.robots[0].position, Position::new(0, 2));
    assert_eq!(
        outcome.arena.get(0, 1),
        Some(SnapshotCell::Object(CellObject::Empty))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_matches_sequential_baseline() {
    for seed in 200..230 {
        let concurrent = Simulation::new(random_setup(seed, 8, 16, 15))
            .unwrap()
            .run()
            .await
            .unwrap();
        let sequential = Simulation::new(random_setup(seed, 8, 16, 15))
            .unwrap()
            .run_sequential()
            .await
            .unwrap();

        assert_eq!(
            concurrent.total_figures(),
            sequential.total_figures(),
            "seed {}",
            seed
        );
        assert_eq!(concurrent.occupancy(), sequential.occupancy(), "seed {}", seed);
        assert_eq!(concurrent.stats, sequential.stats, "seed {}", seed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_matches_sequential_with_steals() {
    let mut steals = 0;
    for seed in 300..340 {
        // Two units per battery: robots run dry within a few turns and rob each other
        let concurrent = Simulation::new(random_setup(seed, 10, 2, 15))
            .unwrap()
            .run()
            .await
            .unwrap();
        let sequential = Simulation::new(random_setup(seed, 10, 2, 15))
            .unwrap()
            .run_sequential()
            .await
            .unwrap();

        assert_eq!(
            concurrent.total_figures(),
            sequential.total_figures(),
            "seed {}",
            seed
        );
        assert_eq!(concurrent.occupancy(), sequential.occupancy(), "seed {}", seed);
        assert_eq!(concurrent.robots, sequential.robots, "seed {}", seed);
        assert_eq!(concurrent.stats, sequential.stats, "seed {}", seed);
        steals += sequential.stats.steals;
    }
    assert!(steals > 0);
}

#[tokio::test]
async fn test_sequential_run_publishes_same_snapshot_count() {
    let (observer, mut rx) = ChannelObserver::channel();
    let outcome = Simulation::new(random_setup(7, 4, 3, 5))
        .unwrap()
        .with_observer(Arc::new(observer))
        .run_sequential()
        .await
        .unwrap();

    let snapshots = drain(&mut rx);
    assert_eq!(snapshots.len(), 6);
    assert_eq!(snapshots.last().unwrap().robots, outcome.robots);
    for snapshot in &snapshots {
        assert_bijection(snapshot);
    }
}
