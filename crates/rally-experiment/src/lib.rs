//! Rally Experiment: the harness around the rally kernel.
//!
//! This crate:
//! - Parses and renders the text arena format
//! - Generates random arenas from a seed
//! - Runs a setup concurrently or with the sequential baseline and compares the two
//! - Prints turn-by-turn grids and final robot reports, and saves JSON results

pub mod generator;
pub mod input;
pub mod report;
pub mod runner;
