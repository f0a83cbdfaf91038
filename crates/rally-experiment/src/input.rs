//! Text format for arena and robot descriptions.
//!
//! ```text
//! rows cols robots recharge turns
//! <rows lines of cols symbols: '.' empty, 'x' pillar, 'b' battery, 'f' figure>
//! <robots lines: "row col">
//! <robots entries: "count sequence">, sequence over N/S/L/O, omitted when count is 0
//! ```
//!
//! Tokens are whitespace separated, so line breaks are not significant.

use std::io::Read;
use std::path::Path;
use std::str::SplitWhitespace;

use anyhow::{bail, Context, Result};

use rally_kernel::{CellObject, MoveToken, Position, RobotSpec, SimulationConfig, SimulationSetup};

/// Whitespace tokenizer that names what it expected when input runs out.
struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .with_context(|| format!("Unexpected end of input, expected {}", what))
    }

    fn number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {}: {:?}", what, token))
    }
}

/// Parse a full setup. The result is validated before it is returned.
pub fn parse_setup(text: &str) -> Result<SimulationSetup> {
    let mut tokens = Tokens::new(text);

    let rows: usize = tokens.number("row count")?;
    let cols: usize = tokens.number("column count")?;
    let robot_count: usize = tokens.number("robot count")?;
    let battery_recharge: u32 = tokens.number("battery recharge")?;
    let total_turns: usize = tokens.number("turn count")?;

    let mut grid = Vec::with_capacity(rows);
    for r in 0..rows {
        let line = tokens.next(&format!("arena row {}", r))?;
        let row = line
            .chars()
            .enumerate()
            .map(|(c, symbol)| {
                CellObject::from_symbol(symbol).with_context(|| {
                    format!("Unknown cell symbol {:?} at ({}, {})", symbol, r, c)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if row.len() != cols {
            bail!("Arena row {} has {} cells, expected {}", r, row.len(), cols);
        }
        grid.push(row);
    }

    let mut positions = Vec::with_capacity(robot_count);
    for id in 0..robot_count {
        let row = tokens.number(&format!("row of robot {}", id))?;
        let col = tokens.number(&format!("column of robot {}", id))?;
        positions.push(Position::new(row, col));
    }

    let mut robots = Vec::with_capacity(robot_count);
    for (id, position) in positions.into_iter().enumerate() {
        let count: usize = tokens.number(&format!("move count of robot {}", id))?;
        let program = if count == 0 {
            Vec::new()
        } else {
            let sequence = tokens.next(&format!("move sequence of robot {}", id))?;
            if sequence.chars().count() != count {
                bail!(
                    "Robot {} declares {} moves but its sequence {:?} has {}",
                    id,
                    count,
                    sequence,
                    sequence.chars().count()
                );
            }
            MoveToken::parse_program(sequence)
        };
        robots.push(RobotSpec::new(position, program));
    }

    if let Some(extra) = tokens.inner.next() {
        bail!("Unexpected trailing input starting at {:?}", extra);
    }

    let setup = SimulationSetup {
        config: SimulationConfig {
            battery_recharge,
            total_turns,
        },
        grid,
        robots,
    };
    setup.validate()?;
    Ok(setup)
}

/// Read a setup from a file, or from stdin when `path` is `-`.
pub fn read_setup(path: &Path) -> Result<SimulationSetup> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read setup from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read setup from {}", path.display()))?
    };

    parse_setup(&text).with_context(|| format!("Invalid setup in {}", path.display()))
}

/// Render a setup back to the text format.
pub fn render_setup(setup: &SimulationSetup) -> String {
    let rows = setup.grid.len();
    let cols = setup.grid.first().map_or(0, Vec::len);

    let mut lines = vec![format!(
        "{} {} {} {} {}",
        rows,
        cols,
        setup.robots.len(),
        setup.config.battery_recharge,
        setup.config.total_turns
    )];
    lines.extend(
        setup
            .grid
            .iter()
            .map(|row| row.iter().map(|object| object.symbol()).collect::<String>()),
    );
    lines.extend(
        setup
            .robots
            .iter()
            .map(|robot| format!("{} {}", robot.position.row, robot.position.col)),
    );
    for robot in &setup.robots {
        let sequence: String = robot.program.iter().map(|token| token.symbol()).collect();
        if sequence.is_empty() {
            lines.push("0".to_string());
        } else {
            lines.push(format!("{} {}", robot.program.len(), sequence));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
