//! Generate command implementation
//!
//! Loads `<PREFIX>/config.defines.dump`, the changelog and the templates,
//! runs the platform-modules generator and writes `debian/control`,
//! `debian/rules.gen` and the maintainer scripts below the output
//! directory.

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use gencontrol::config::ConfigTree;
use gencontrol::gencontrol::{Driver, PlatformModules};
use gencontrol::template::Templates;
use gencontrol::version::Changelog;
use gencontrol::write;

/// Name of the configuration dump inside the prefix directory.
pub const CONFIG_DUMP: &str = "config.defines.dump";

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory containing config.defines.dump
    #[arg(value_name = "PREFIX")]
    pub prefix: PathBuf,

    /// Template directory, searched in the order given
    #[arg(
        short,
        long = "templates",
        value_name = "DIR",
        env = "GENCONTROL_TEMPLATES",
        default_value = "debian/templates"
    )]
    pub templates: Vec<PathBuf>,

    /// Changelog to take the source name and version from
    #[arg(long, value_name = "PATH", default_value = "debian/changelog")]
    pub changelog: PathBuf,

    /// Directory the debian/ files are written below
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "GENCONTROL_OUTPUT",
        default_value = "."
    )]
    pub output_dir: PathBuf,

    /// Print the generated control file instead of writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Execute the generate command
pub fn execute(args: GenerateArgs) -> Result<()> {
    let dump = args.prefix.join(CONFIG_DUMP);
    if !dump.exists() {
        anyhow::bail!("Configuration dump not found: {}", dump.display());
    }

    let config = ConfigTree::from_file(&dump)
        .with_context(|| format!("Failed to load configuration from {}", dump.display()))?;
    let changelog = Changelog::from_file(&args.changelog)
        .with_context(|| format!("Failed to read {}", args.changelog.display()))?;
    let templates = Templates::new(args.templates)?;

    let generator = PlatformModules::new(config, templates, changelog)
        .context("Invalid version configuration")?;
    let output = Driver::new(generator)
        .run()
        .context("Failed to generate control files")?;

    if args.dry_run {
        print!("{}", output.control());
        return Ok(());
    }

    let files = output.into_files();
    write::execute(&files, &args.output_dir)
        .with_context(|| format!("Failed to write to {}", args.output_dir.display()))?;
    info!("{} files written to {}", files.len(), args.output_dir.display());
    Ok(())
}
