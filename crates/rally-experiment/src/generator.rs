//! Random arena generator.
//!
//! Produces setups that always pass validation: robots start on distinct
//! non-pillar cells and every program only uses the four valid headings.

use anyhow::{bail, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use rally_kernel::{
    CellObject, Direction, MoveToken, Position, RobotSpec, SimulationConfig, SimulationSetup,
};

/// Configuration for arena generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub rows: usize,
    pub cols: usize,
    pub robots: usize,
    pub battery_recharge: u32,
    pub total_turns: usize,
    /// Program length for every robot
    pub moves: usize,
    /// Fraction of cells holding a pillar (0.0 to 1.0)
    pub pillar_density: f64,
    /// Fraction of cells holding a battery (0.0 to 1.0)
    pub battery_density: f64,
    /// Fraction of cells holding a figure (0.0 to 1.0)
    pub figure_density: f64,
    /// Random seed for reproducibility (None for random)
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 8,
            robots: 4,
            battery_recharge: 3,
            total_turns: 10,
            moves: 10,
            pillar_density: 0.1,
            battery_density: 0.08,
            figure_density: 0.15,
            seed: None,
        }
    }
}

/// Generator for random rally arenas.
pub struct ArenaGenerator {
    config: GeneratorConfig,
}

impl ArenaGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    fn random_object(&self, rng: &mut impl Rng) -> CellObject {
        let roll: f64 = rng.random();
        let pillars = self.config.pillar_density;
        let batteries = pillars + self.config.battery_density;
        let figures = batteries + self.config.figure_density;

        if roll < pillars {
            CellObject::Pillar
        } else if roll < batteries {
            CellObject::Battery
        } else if roll < figures {
            CellObject::Figure
        } else {
            CellObject::Empty
        }
    }

    /// Generate one setup.
    pub fn generate(&self) -> Result<SimulationSetup> {
        let GeneratorConfig {
            rows,
            cols,
            robots,
            moves,
            ..
        } = self.config;

        if rows == 0 || cols == 0 {
            bail!("Arena must have at least one row and one column");
        }
        if robots == 0 {
            bail!("At least one robot is required");
        }
        if robots > rows * cols {
            bail!("{} robots do not fit in a {}x{} arena", robots, rows, cols);
        }

        let mut rng: Box<dyn RngCore> = match self.config.seed {
            Some(seed) => Box::new(ChaCha8Rng::seed_from_u64(seed)),
            None => Box::new(rand::rng()),
        };

        let mut grid: Vec<Vec<CellObject>> = (0..rows)
            .map(|_| (0..cols).map(|_| self.random_object(&mut rng)).collect())
            .collect();

        // Robots go on shuffled cells; a pillar under a start cell is cleared
        let mut cells: Vec<Position> = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| Position::new(row, col)))
            .collect();
        cells.shuffle(&mut rng);

        let specs = cells
            .into_iter()
            .take(robots)
            .map(|position| {
                let cell = &mut grid[position.row][position.col];
                if cell.is_pillar() {
                    *cell = CellObject::Empty;
                }
                let program = (0..moves)
                    .map(|_| {
                        let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
                        MoveToken::Heading(direction)
                    })
                    .collect();
                RobotSpec::new(position, program)
            })
            .collect();

        let setup = SimulationSetup {
            config: SimulationConfig {
                battery_recharge: self.config.battery_recharge,
                total_turns: self.config.total_turns,
            },
            grid,
            robots: specs,
        };
        setup.validate()?;
        Ok(setup)
    }
}
