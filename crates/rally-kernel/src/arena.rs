//! The arena: a fixed rows × cols grid of individually locked cells.

use anyhow::{bail, Result};
use tokio::sync::{Mutex, MutexGuard};

use crate::cell::{Cell, CellObject, Direction, Position, RobotId};
use crate::observer::{ArenaSnapshot, SnapshotCell};

/// Grid of cells. Shape is fixed at construction; only cell contents change.
///
/// Each cell carries its own `tokio::sync::Mutex`. Callers never hold two cell
/// locks at once, and take a cell lock only after any robot lock they need.
#[derive(Debug)]
pub struct Arena {
    rows: usize,
    cols: usize,
    cells: Vec<Mutex<Cell>>,
}

impl Arena {
    /// Build an arena from row-major object rows.
    pub fn new(grid: Vec<Vec<CellObject>>) -> Result<Self> {
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);

        if rows == 0 || cols == 0 {
            bail!("Arena must have at least one row and one column");
        }

        for (i, row) in grid.iter().enumerate() {
            if row.len() != cols {
                bail!("Row {} has {} columns, expected {}", i, row.len(), cols);
            }
        }

        let cells = grid
            .into_iter()
            .flatten()
            .map(|object| Mutex::new(Cell::new(object)))
            .collect();

        Ok(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// The in-bounds cell one step away, if any.
    pub fn offset(&self, pos: Position, direction: Direction) -> Option<Position> {
        pos.step(direction).filter(|next| self.contains(*next))
    }

    /// In-bounds orthogonal neighbours in N, S, E, W order.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.offset(pos, direction))
    }

    fn index(&self, pos: Position) -> usize {
        assert!(self.contains(pos), "cell {} outside {}x{} arena", pos, self.rows, self.cols);
        pos.row * self.cols + pos.col
    }

    /// Lock one cell. Panics if `pos` is out of bounds.
    pub async fn lock(&self, pos: Position) -> MutexGuard<'_, Cell> {
        self.cells[self.index(pos)].lock().await
    }

    pub async fn occupant(&self, pos: Position) -> Option<RobotId> {
        self.lock(pos).await.occupant
    }

    pub async fn object(&self, pos: Position) -> CellObject {
        self.lock(pos).await.object
    }

    /// Direct access during setup, before the arena is shared.
    pub(crate) fn cell_mut(&mut self, pos: Position) -> &mut Cell {
        let idx = self.index(pos);
        self.cells[idx].get_mut()
    }

    /// Read every cell, one lock at a time.
    ///
    /// Only meaningful between turns, when no transaction is running.
    pub async fn snapshot(&self) -> ArenaSnapshot {
        let mut cells = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            let cell = cell.lock().await;
            cells.push(match cell.occupant {
                Some(id) => SnapshotCell::Robot(id),
                None => SnapshotCell::Object(cell.object),
            });
        }
        ArenaSnapshot {
            rows: self.rows,
            cols: self.cols,
            cells,
        }
    }
}
