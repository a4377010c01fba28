mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use modelmatch::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // --log-level, then RUST_LOG, then the config file
    let filter = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| config.logging.level.clone());
    env_logger::Builder::new().parse_filters(&filter).init();
    log::debug!("Log filter: {}", filter);

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Features(args) => cli::commands::features::handle_features_command(args, &config),
        Commands::Subclasses(args) => {
            cli::commands::features::handle_subclasses_command(args, &config)
        }
        Commands::Flatten(args) => cli::commands::flatten::handle_flatten_command(args, &config),
        Commands::Match(args) => cli::commands::matching::handle_match_command(args, &config),
        Commands::Config => cli::commands::handle_config_command(&config),
    }
}
