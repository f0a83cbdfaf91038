//! ClaimBoard: per-turn reservations of destination cells.
//!
//! Every robot that plans to leave its cell claims the destination before the
//! movement barrier opens. When several robots claim the same cell the lowest
//! id holds it; the others are blocked for this turn. Robot 0 clears the
//! board once the movement phase has settled, so each turn starts empty.

use dashmap::DashMap;

use crate::cell::{Position, RobotId};

/// Destination reservations for the current turn.
#[derive(Debug, Default)]
pub struct ClaimBoard {
    /// Active claims: destination cell -> lowest robot id that claimed it
    claims: DashMap<Position, RobotId>,
}

impl ClaimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `robot`'s intent to enter `cell`. Returns true when the robot
    /// currently holds the claim.
    pub fn claim(&self, cell: Position, robot: RobotId) -> bool {
        let mut holder = self.claims.entry(cell).or_insert(robot);
        if robot < *holder {
            tracing::trace!(cell = %cell, displaced = *holder, holder = robot, "Claim taken over");
            *holder = robot;
        }
        *holder == robot
    }

    pub fn holder(&self, cell: Position) -> Option<RobotId> {
        self.claims.get(&cell).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Drop every claim. Only called while no robot is planning or moving.
    pub fn reset(&self) {
        let cleared = self.claims.len();
        self.claims.clear();
        tracing::trace!(cleared, "Claim board reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_id_holds_contested_cell() {
        let board = ClaimBoard::new();
        let cell = Position::new(2, 3);

        assert!(board.claim(cell, 5));
        assert!(!board.claim(cell, 7));
        assert!(board.claim(cell, 1));
        assert!(!board.claim(cell, 5));

        assert_eq!(board.holder(cell), Some(1));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_reset_clears_all_claims() {
        let board = ClaimBoard::new();
        board.claim(Position::new(0, 0), 0);
        board.claim(Position::new(0, 1), 1);
        assert_eq!(board.len(), 2);

        board.reset();
        assert!(board.is_empty());
        assert_eq!(board.holder(Position::new(0, 0)), None);
    }

    #[test]
    fn test_claim_order_does_not_matter() {
        let forward = ClaimBoard::new();
        let backward = ClaimBoard::new();
        let cell = Position::new(1, 1);

        for id in 0..8 {
            forward.claim(cell, id);
        }
        for id in (0..8).rev() {
            backward.claim(cell, id);
        }
        assert_eq!(forward.holder(cell), backward.holder(cell));
    }
}
