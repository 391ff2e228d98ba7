pub mod commands;

use clap::Parser;
use std::path::PathBuf;

pub use commands::{ClassifyArgs, Command, RuleArgs, RuleCommands, ScanArgs, ServeArgs};

#[derive(Debug, Parser)]
#[command(name = "timeline-guard", version, about = "Hide timeline posts that match natural-language filter rules")]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}
