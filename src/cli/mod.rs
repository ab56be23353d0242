pub mod auth;
pub mod ensure;
pub mod output;
pub mod preset;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lightconv",
    version,
    about = "Drive Home Assistant lights to a target state and confirm they got there"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as human-readable table instead of JSON
    #[arg(short = 't', long = "table", global = true)]
    pub table: bool,

    /// Verbose output (debug logging, HTTP requests/responses)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: <config dir>/lightconv/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store the Home Assistant URL and access token
    Login,

    /// Clear stored credentials
    Logout,

    /// Show authentication status
    Status,

    /// Set lights to a state, verify and retry until they match
    Ensure(ensure::EnsureArgs),

    /// Configured presets
    #[command(subcommand)]
    Preset(preset::PresetCommand),

    /// Print the current state record of one entity
    State {
        /// Entity ID, e.g. light.kitchen
        entity: String,
    },
}
