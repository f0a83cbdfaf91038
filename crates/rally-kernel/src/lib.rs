//! Rally Kernel: turn-based robot arena with one concurrent worker per robot.
//!
//! Robots move across a shared grid, collect figures, recharge from batteries and
//! steal energy from stranded neighbours. Every robot runs as its own task; the
//! tasks meet at a cyclic barrier three times per turn and mutate shared state
//! only through two lock-ordered transactions (movement and energy steal).

pub mod arena;
pub mod barrier;
pub mod cell;
pub mod claims;
pub mod config;
pub mod locks;
pub mod movement;
pub mod observer;
pub mod robot;
pub mod simulation;
pub mod stats;
pub mod steal;
mod turn;

pub use arena::Arena;
pub use barrier::{BarrierSeat, TurnBarrier};
pub use cell::{Cell, CellObject, Direction, MoveToken, Position, RobotId};
pub use claims::ClaimBoard;
pub use config::SimulationConfig;
pub use movement::MoveOutcome;
pub use observer::{ArenaSnapshot, ChannelObserver, NullObserver, SnapshotCell, TurnObserver, TurnSnapshot};
pub use robot::{MovePlan, Robot, RobotRegistry, RobotReport, RobotSpec};
pub use simulation::{Simulation, SimulationOutcome, SimulationSetup};
pub use stats::{StatsSnapshot, TransactionStats};
pub use steal::{StealBoard, StealOutcome};
