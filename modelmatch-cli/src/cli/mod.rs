//! Command-line interface definitions

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelmatch-cli")]
#[command(about = "Resolve, flatten and match entity models")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/modelmatch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "modelmatch=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show inherited, local, nonlocal and composed features of an entity
    Features(FeaturesArgs),
    /// Show the descendant closure of an entity, repairing generalization cycles
    Subclasses(SubclassesArgs),
    /// Build flattened copies of entities
    Flatten(FlattenArgs),
    /// Match the entities of a source model against a target model
    Match(MatchArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
pub struct FeaturesArgs {
    /// JSON model document
    pub model: PathBuf,
    /// Entity name
    pub entity: String,
    /// Composed-path depth
    #[arg(short, long)]
    pub depth: Option<usize>,
    /// Allow revisiting entities while composing paths
    #[arg(long)]
    pub all_paths: bool,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SubclassesArgs {
    /// JSON model document
    pub model: PathBuf,
    /// Entity name
    pub entity: String,
    /// Only show leaf subclasses
    #[arg(long)]
    pub leaves: bool,
}

#[derive(Args)]
pub struct FlattenArgs {
    /// JSON model document
    pub model: PathBuf,
    /// Only flatten this entity (default: all)
    pub entity: Option<String>,
    /// Composed-path depth
    #[arg(short, long)]
    pub depth: Option<usize>,
    /// Allow revisiting entities while composing paths
    #[arg(long)]
    pub all_paths: bool,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct MatchArgs {
    /// Source model document
    pub source: PathBuf,
    /// Target model document
    pub target: PathBuf,
    /// Force strict matching
    #[arg(long, conflicts_with = "lenient")]
    pub strict: bool,
    /// Disable superclass propagation and hierarchy checks
    #[arg(long)]
    pub lenient: bool,
    /// Export the mapping to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Print the mapping as JSON instead of text
    #[arg(long)]
    pub json: bool,
}
