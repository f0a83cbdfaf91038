//! Robot state and the fixed-size registry that owns it.

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::cell::{MoveToken, Position, RobotId};
use crate::movement::MoveOutcome;

/// Initial description of a robot, as supplied by setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub position: Position,
    pub program: Vec<MoveToken>,
    /// Starting energy; the battery recharge amount when unset
    #[serde(default)]
    pub energy: Option<u32>,
}

impl RobotSpec {
    pub fn new(position: Position, program: Vec<MoveToken>) -> Self {
        Self {
            position,
            program,
            energy: None,
        }
    }

    pub fn with_energy(mut self, energy: u32) -> Self {
        self.energy = Some(energy);
        self
    }
}

/// Where a robot intends to be at the end of the current turn's movement phase.
///
/// Written once per turn before the first barrier and read by other robots
/// during the movement phase; only `outcome` changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub turn: usize,
    pub origin: Position,
    pub destination: Position,
    /// Set when the robot has applied (or given up on) the plan
    pub outcome: Option<MoveOutcome>,
}

impl MovePlan {
    pub fn stay(turn: usize, at: Position) -> Self {
        Self {
            turn,
            origin: at,
            destination: at,
            outcome: None,
        }
    }

    pub fn toward(turn: usize, origin: Position, destination: Position) -> Self {
        Self {
            turn,
            origin,
            destination,
            outcome: None,
        }
    }

    /// True when the robot intends to leave its cell this turn.
    pub fn vacates(&self) -> bool {
        self.destination != self.origin
    }
}

/// Per-agent mutable state. Always accessed through its registry lock.
#[derive(Debug, Clone)]
pub struct Robot {
    id: RobotId,
    position: Position,
    energy: u32,
    collected: u32,
    program: Vec<MoveToken>,
    cursor: usize,
    plan: MovePlan,
    steal_target: Option<RobotId>,
}

impl Robot {
    /// Build a robot; `default_energy` applies when the spec carries none.
    pub fn new(id: RobotId, spec: RobotSpec, default_energy: u32) -> Self {
        Self {
            id,
            position: spec.position,
            energy: spec.energy.unwrap_or(default_energy),
            collected: 0,
            program: spec.program,
            cursor: 0,
            plan: MovePlan::stay(0, spec.position),
            steal_target: None,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn energy(&self) -> u32 {
        self.energy
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn plan(&self) -> &MovePlan {
        &self.plan
    }

    pub fn steal_target(&self) -> Option<RobotId> {
        self.steal_target
    }

    pub fn program_len(&self) -> usize {
        self.program.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.program.len()
    }

    /// Consume the next program entry, if any remain.
    pub(crate) fn next_token(&mut self) -> Option<MoveToken> {
        let token = self.program.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(token)
    }

    pub(crate) fn set_plan(&mut self, plan: MovePlan) {
        self.plan = plan;
    }

    pub(crate) fn record_outcome(&mut self, outcome: MoveOutcome) {
        self.plan.outcome = Some(outcome);
    }

    pub(crate) fn set_steal_target(&mut self, target: Option<RobotId>) {
        self.steal_target = target;
    }

    /// Complete a move: relocate and pay the one unit of energy it costs.
    pub(crate) fn relocate(&mut self, to: Position) {
        debug_assert!(self.energy > 0, "robot {} moved without energy", self.id);
        self.position = to;
        self.energy = self.energy.saturating_sub(1);
    }

    pub(crate) fn recharge(&mut self, amount: u32) {
        self.energy = self.energy.saturating_add(amount);
    }

    pub(crate) fn collect_figure(&mut self) {
        self.collected += 1;
    }

    /// Hand one unit of energy to `thief`. Refuses to leave the donor below 1.
    pub(crate) fn transfer_unit_to(&mut self, thief: &mut Robot) -> bool {
        if self.energy < 2 || thief.energy != 0 {
            return false;
        }
        self.energy -= 1;
        thief.energy += 1;
        true
    }

    pub fn report(&self) -> RobotReport {
        RobotReport {
            id: self.id,
            collected: self.collected,
            energy: self.energy,
            position: self.position,
        }
    }
}

/// Final (or inter-turn) public view of one robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotReport {
    pub id: RobotId,
    pub collected: u32,
    pub energy: u32,
    pub position: Position,
}

/// All robots, indexed by id. The set never grows or shrinks during a run.
#[derive(Debug)]
pub struct RobotRegistry {
    robots: Vec<Mutex<Robot>>,
}

impl RobotRegistry {
    pub fn new(robots: Vec<Robot>) -> Self {
        debug_assert!(robots.iter().enumerate().all(|(i, r)| r.id == i));
        Self {
            robots: robots.into_iter().map(Mutex::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<RobotId> {
        0..self.robots.len()
    }

    /// Lock a single robot. Use [`crate::locks::lock_pair`] when two are needed.
    pub async fn lock(&self, id: RobotId) -> MutexGuard<'_, Robot> {
        self.robots[id].lock().await
    }

    pub async fn energy(&self, id: RobotId) -> u32 {
        self.lock(id).await.energy
    }

    pub async fn reports(&self) -> Vec<RobotReport> {
        let mut reports = Vec::with_capacity(self.robots.len());
        for robot in &self.robots {
            reports.push(robot.lock().await.report());
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Direction;

    fn robot(energy: u32, program: &str) -> Robot {
        Robot::new(
            0,
            RobotSpec::new(Position::new(1, 1), MoveToken::parse_program(program)),
            energy,
        )
    }

    #[test]
    fn test_cursor_never_passes_program_end() {
        let mut r = robot(3, "NS");
        assert_eq!(r.next_token(), Some(MoveToken::Heading(Direction::North)));
        assert_eq!(r.next_token(), Some(MoveToken::Heading(Direction::South)));
        assert!(r.is_exhausted());
        assert_eq!(r.next_token(), None);
        assert_eq!(r.cursor(), r.program_len());
    }

    #[test]
    fn test_transfer_keeps_donor_alive() {
        let mut donor = robot(2, "");
        let mut thief = robot(0, "");
        assert!(donor.transfer_unit_to(&mut thief));
        assert_eq!((donor.energy(), thief.energy()), (1, 1));

        // Donor at 1 may not give; thief with energy may not take
        let mut other = robot(0, "");
        assert!(!donor.transfer_unit_to(&mut other));
        let mut rich = robot(5, "");
        assert!(!rich.transfer_unit_to(&mut thief));
        assert_eq!(rich.energy(), 5);
    }

    #[test]
    fn test_relocate_charges_one_unit() {
        let mut r = robot(1, "L");
        r.recharge(4);
        r.relocate(Position::new(1, 2));
        assert_eq!(r.energy(), 4);
        assert_eq!(r.position(), Position::new(1, 2));
    }

    #[test]
    fn test_plan_vacates() {
        let at = Position::new(2, 2);
        assert!(!MovePlan::stay(0, at).vacates());
        assert!(MovePlan::toward(0, at, Position::new(2, 3)).vacates());
    }
}
