//! Configuration for a simulation run.

use serde::{Deserialize, Serialize};

/// Run-wide parameters shared by every robot worker.
///
/// Normally read from the header of an arena description; the CLI can
/// override either value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Energy granted by a battery, and the initial energy of every robot
    pub battery_recharge: u32,

    /// Number of turns each worker executes
    pub total_turns: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            battery_recharge: 3,
            total_turns: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserializes_from_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"battery_recharge": 7, "total_turns": 4}"#).unwrap();
        assert_eq!(config.battery_recharge, 7);
        assert_eq!(config.total_turns, 4);
    }

    #[test]
    fn test_default_config_runs_at_least_one_turn() {
        let config = SimulationConfig::default();
        assert!(config.total_turns > 0);
        assert!(config.battery_recharge > 0);
    }
}
