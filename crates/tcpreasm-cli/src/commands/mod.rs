//! CLI commands

pub mod completions;
pub mod config;
pub mod packets;
pub mod replay;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reassemble a TOML segment script
    Replay(replay::ReplayArgs),

    /// Reassemble one direction of a hex packet dump
    Packets(packets::PacketsArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
