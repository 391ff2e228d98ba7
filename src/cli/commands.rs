/*
CLI Commands

Subcommands of the `timeline-guard` binary. Each one wires the same pipeline the page side uses,
so they double as a way to exercise the classifier against saved timelines.
*/

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a filter round over a saved timeline page
    Scan(ScanArgs),
    /// Check whether the classifier is reachable
    Status,
    /// Manage stored filter rules
    #[command(subcommand)]
    Rules(RuleCommands),
    /// Classify a single piece of text
    Classify(ClassifyArgs),
    /// Answer JSON requests read line by line from stdin
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Saved timeline HTML
    #[arg(short, long)]
    pub page: PathBuf,

    /// Filter rule to use instead of the stored ones (repeatable)
    #[arg(short, long = "rule")]
    pub rules: Vec<String>,

    /// HTML fragment appended to the timeline after the first round (repeatable)
    #[arg(long)]
    pub append: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Saved timeline kept open while serving; stored rule updates re-run its filter round
    #[arg(short, long)]
    pub page: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Text to classify
    #[arg(short, long)]
    pub text: String,

    /// Filter rule to use instead of the stored ones (repeatable)
    #[arg(short, long = "rule")]
    pub rules: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum RuleCommands {
    /// Print the stored rules
    List,
    /// Add a rule
    Add(RuleArgs),
    /// Remove a rule
    Remove(RuleArgs),
}

#[derive(Debug, Args)]
pub struct RuleArgs {
    /// Natural-language rule text, e.g. "political content"
    pub rule: String,
}
