//! Command-line interface for housing-predictor.
//!
//! Provides commands for serving the API, migrating the store, running a
//! one-off prediction and listing stored predictions.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
