//! # gencontrol CLI
//!
//! This is the binary entry point for the `gencontrol` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging.
//! - Handling top-level errors, which `anyhow` prints with their causes.
//!
//! The generator itself lives in the library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
