//! CLI argument parsing and dispatch

use anyhow::Result;
use clap::Parser;

use crate::commands;

/// Generate Debian control files for kernel platform-modules packages
#[derive(Parser, Debug)]
#[command(name = "gencontrol")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    generate: commands::generate::GenerateArgs,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        commands::generate::execute(self.generate)
    }
}

/// Install the global logger. `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // a logger may already be installed when running under a test harness
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
