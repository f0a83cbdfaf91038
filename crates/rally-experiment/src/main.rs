//! Rally Experiment CLI.
//!
//! Commands:
//! - run: Run one arena and print each turn plus the final robot reports
//! - compare: Run an arena concurrently and sequentially and check the aggregates agree
//! - generate: Print a random arena in the input format

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rally_experiment::generator::{ArenaGenerator, GeneratorConfig};
use rally_experiment::input::{read_setup, render_setup};
use rally_experiment::report::{render_robots, timestamped_path};
use rally_experiment::runner::{compare, Runner, RunnerConfig, Strategy};
use rally_kernel::SimulationSetup;

#[derive(Parser)]
#[command(name = "rally-experiment")]
#[command(version)]
#[command(about = "Concurrent robot rally on a shared arena")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single arena
    Run {
        /// Arena description, or "-" for stdin
        #[arg(long, env = "RALLY_INPUT", default_value = "-")]
        input: PathBuf,

        /// Strategy to use (concurrent, sequential)
        #[arg(long, default_value = "concurrent")]
        strategy: String,

        /// Only print the final robot reports
        #[arg(short, long)]
        quiet: bool,

        /// Override the turn count from the input
        #[arg(long)]
        turns: Option<usize>,

        /// Override the battery recharge amount from the input
        #[arg(long)]
        recharge: Option<u32>,

        /// Output file for JSON results (a timestamp is appended)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run both strategies and compare total figures and final occupancy
    Compare {
        /// Arena description, or "-" for stdin
        #[arg(long, default_value = "-")]
        input: PathBuf,

        /// Override the turn count from the input
        #[arg(long)]
        turns: Option<usize>,

        /// Override the battery recharge amount from the input
        #[arg(long)]
        recharge: Option<u32>,
    },

    /// Generate and print an arena
    Generate {
        #[arg(long, default_value = "6")]
        rows: usize,

        #[arg(long, default_value = "8")]
        cols: usize,

        #[arg(long, default_value = "4")]
        robots: usize,

        #[arg(long, default_value = "10")]
        turns: usize,

        #[arg(long, default_value = "3")]
        recharge: u32,

        /// Moves per robot
        #[arg(long, default_value = "10")]
        moves: usize,

        /// Fraction of cells holding a pillar
        #[arg(long, default_value = "0.1")]
        pillars: f64,

        /// Fraction of cells holding a battery
        #[arg(long, default_value = "0.08")]
        batteries: f64,

        /// Fraction of cells holding a figure
        #[arg(long, default_value = "0.15")]
        figures: f64,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the report
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            input,
            strategy,
            quiet,
            turns,
            recharge,
            output,
        } => {
            let strategy = Strategy::parse(&strategy)?;
            let setup = load(&input, turns, recharge)?;

            let runner = Runner::new(RunnerConfig {
                strategy,
                print_turns: !quiet,
            });
            let result = runner.run(setup).await?;

            print!("{}", render_robots(&result.outcome.robots));
            info!(summary = %result.summary(), "Run finished");

            if let Some(output) = output {
                let output_path = timestamped_path(&output);
                result.save(&output_path)?;
                info!(path = %output_path.display(), "Results saved");
            }
        }

        Commands::Compare {
            input,
            turns,
            recharge,
        } => {
            let setup = load(&input, turns, recharge)?;
            let comparison = compare(setup).await?;

            println!("=== Strategy Comparison ===");
            println!("{}", comparison.concurrent.summary());
            println!("{}", comparison.sequential.summary());

            let divergences = comparison.divergences();
            if !divergences.is_empty() {
                for divergence in &divergences {
                    println!("  diverged on {}", divergence);
                }
                bail!("Concurrent and sequential runs disagree");
            }
            println!("Aggregates match");
        }

        Commands::Generate {
            rows,
            cols,
            robots,
            turns,
            recharge,
            moves,
            pillars,
            batteries,
            figures,
            seed,
        } => {
            let config = GeneratorConfig {
                rows,
                cols,
                robots,
                battery_recharge: recharge,
                total_turns: turns,
                moves,
                pillar_density: pillars,
                battery_density: batteries,
                figure_density: figures,
                seed,
            };

            let setup = ArenaGenerator::new(config).generate()?;
            print!("{}", render_setup(&setup));
        }
    }

    Ok(())
}

/// Read a setup and apply command-line overrides.
fn load(input: &Path, turns: Option<usize>, recharge: Option<u32>) -> Result<SimulationSetup> {
    let mut setup = read_setup(input)?;
    if let Some(turns) = turns {
        setup.config.total_turns = turns;
    }
    if let Some(recharge) = recharge {
        setup.config.battery_recharge = recharge;
    }
    Ok(setup)
}
