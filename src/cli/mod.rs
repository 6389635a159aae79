//! CLI module for coverdrop

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::session::ImageSize;

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "coverdrop", about = "Download album artwork for a Subsonic playlist")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the artwork of every album on a playlist
    Fetch {
        /// Playlist name (case-insensitive)
        #[arg(short = 'l', long)]
        playlist: String,

        /// Username (falls back to the keyring)
        #[arg(short, long, env = "COVERDROP_USER")]
        username: Option<String>,

        /// Password (falls back to the keyring)
        #[arg(short, long, env = "COVERDROP_PASS", hide_env_values = true)]
        password: Option<String>,

        /// Subsonic server URL (falls back to the keyring)
        #[arg(long, env = "COVERDROP_URL")]
        url: Option<String>,

        /// Directory receiving the artwork files
        #[arg(short, long, default_value = "img")]
        output: PathBuf,

        /// Cover size tier
        #[arg(long, value_enum, default_value_t = ImageSize::Large)]
        size: ImageSize,

        /// Maximum album lookups in flight
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u16).range(1..))]
        max_in_flight: u16,

        /// Fetch worker polling interval in milliseconds
        #[arg(long, default_value = "10")]
        poll_interval_ms: u64,
    },

    /// Configure Subsonic server credentials
    Auth {
        /// Subsonic server URL
        #[arg(long, env = "COVERDROP_URL")]
        url: Option<String>,

        /// Username
        #[arg(short, long, env = "COVERDROP_USER")]
        username: Option<String>,

        /// Password
        #[arg(short, long, env = "COVERDROP_PASS", hide_env_values = true)]
        password: Option<String>,

        /// Force re-authentication (ignore stored credentials)
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
