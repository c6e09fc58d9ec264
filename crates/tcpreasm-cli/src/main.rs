//! tcpreasm CLI
//!
//! Command-line front end for TCP stream reassembly.

mod args;
mod commands;
mod logging;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tcpreasm_core::Config;
use tracing::error;

use args::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    logging::init(&args, &config.logging)?;

    let result = run(args, config);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args, config: Config) -> Result<()> {
    match args.command {
        commands::Command::Replay(replay_args) => commands::replay::execute(replay_args, &config),
        commands::Command::Packets(packet_args) => commands::packets::execute(packet_args, &config),
        commands::Command::Config(config_args) => commands::config::execute(config_args, &config),
        commands::Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let Some(path) = args.config.as_ref() else {
        return Ok(Config::default());
    };

    let config = Config::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}
