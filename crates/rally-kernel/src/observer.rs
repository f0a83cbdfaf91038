//! Read-only views handed to reporting, and the observer seam that receives them.
//!
//! Robot 0 publishes a [`TurnSnapshot`] before every turn's first barrier. The
//! kernel never prints; whoever implements [`TurnObserver`] decides what to do
//! with the view.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::cell::{CellObject, RobotId};
use crate::robot::RobotReport;

/// What a cell looks like from outside: a robot hides the object beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum SnapshotCell {
    Object(CellObject),
    Robot(RobotId),
}

/// Row-major picture of the arena at an inter-turn observation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<SnapshotCell>,
}

impl ArenaSnapshot {
    pub fn get(&self, row: usize, col: usize) -> Option<SnapshotCell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// Number of figures still lying on the floor.
    pub fn figures_remaining(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| matches!(cell, SnapshotCell::Object(CellObject::Figure)))
            .count()
    }

    /// Robot ids in row-major order of the cells they occupy.
    pub fn occupants(&self) -> Vec<RobotId> {
        self.cells
            .iter()
            .filter_map(|cell| match cell {
                SnapshotCell::Robot(id) => Some(*id),
                SnapshotCell::Object(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for ArenaSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols.max(1)) {
            for cell in row {
                match cell {
                    SnapshotCell::Object(object) => write!(f, " {}  ", object.symbol())?,
                    SnapshotCell::Robot(id) => write!(f, "({}) ", id)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Arena plus every robot's public state, taken between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Turn about to start; equals the total turn count for the final view
    pub turn: usize,
    pub arena: ArenaSnapshot,
    pub robots: Vec<RobotReport>,
}

/// Receives the snapshot published at the start of every turn.
///
/// Called from inside a worker task while every other worker is parked in
/// front of the barrier, so implementations must not block for long.
pub trait TurnObserver: Send + Sync {
    fn on_turn(&self, snapshot: TurnSnapshot);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TurnObserver for NullObserver {
    fn on_turn(&self, _snapshot: TurnSnapshot) {}
}

/// Forwards snapshots to an mpsc channel so the harness can consume them at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TurnSnapshot>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<TurnSnapshot>) -> Self {
        Self { tx }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TurnSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl TurnObserver for ChannelObserver {
    fn on_turn(&self, snapshot: TurnSnapshot) {
        // Ignore send errors - receiver may have been dropped
        let _ = self.tx.send(snapshot);
    }
}
