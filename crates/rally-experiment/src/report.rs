//! Textual reports and JSON run results.
//!
//! Captures:
//! - The grid before each turn and after the last one
//! - Final per-robot figures, energy and position
//! - Transaction statistics and timing for a whole run

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rally_kernel::{RobotReport, SimulationConfig, SimulationOutcome, TurnSnapshot};

/// `Turn k:` followed by the grid.
pub fn render_turn(snapshot: &TurnSnapshot) -> String {
    format!("Turn {}:\n{}", snapshot.turn, snapshot.arena)
}

/// Final per-robot block.
pub fn render_robots(robots: &[RobotReport]) -> String {
    robots
        .iter()
        .map(|robot| {
            format!(
                "Robot {}:\n  Figures collected: {}\n  Energy left: {}\n  Final position: {}\n",
                robot.id, robot.collected, robot.energy, robot.position
            )
        })
        .collect()
}

/// Results from a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique id for this run
    pub run_id: Uuid,
    /// Strategy name
    pub strategy: String,
    pub config: SimulationConfig,
    pub rows: usize,
    pub cols: usize,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Final arena, robots and transaction statistics
    pub outcome: SimulationOutcome,
}

impl RunResult {
    pub fn total_figures(&self) -> u32 {
        self.outcome.total_figures()
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read results from {}", path.display()))?;
        let result = serde_json::from_str(&json)?;
        Ok(result)
    }

    /// One-line summary of the run's transactions.
    pub fn summary(&self) -> String {
        let stats = &self.outcome.stats;
        format!(
            "{}: {} figures, {} moves, {} blocked, {} aborted, {} idle, {} batteries, {} steals ({} lost) in {}",
            self.strategy,
            self.total_figures(),
            stats.moves,
            stats.blocked,
            stats.aborted,
            stats.idle,
            stats.batteries,
            stats.steals,
            stats.failed_steals,
            format_duration(self.duration_ms)
        )
    }
}

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260108-010530.json"
pub fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}
