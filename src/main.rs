//! coverdrop - Download the album artwork of a Subsonic playlist

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod pipeline;
mod session;
mod storage;
mod subsonic;
mod utils;

use cli::{commands::FetchArgs, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "coverdrop=debug"
    } else {
        "coverdrop=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Fetch {
            playlist,
            username,
            password,
            url,
            output,
            size,
            max_in_flight,
            poll_interval_ms,
        } => {
            cli::commands::fetch(FetchArgs {
                playlist,
                url,
                username,
                password,
                output,
                size,
                max_in_flight: max_in_flight.into(),
                poll_interval: Duration::from_millis(poll_interval_ms),
            })
            .await?;
        }
        Commands::Auth {
            url,
            username,
            password,
            force,
        } => {
            cli::commands::auth(url, username, password, force).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
