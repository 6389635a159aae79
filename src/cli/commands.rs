//! CLI command handlers

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::AuthManager;
use crate::pipeline::{PipelineContext, PipelineDriver, PipelineSettings, RunStatus, RunSummary};
use crate::session::{ImageSize, WakeSignal};
use crate::subsonic::{SubsonicClient, SubsonicSession};

/// Options of the `fetch` command
#[derive(Debug)]
pub struct FetchArgs {
    pub playlist: String,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub output: PathBuf,
    pub size: ImageSize,
    pub max_in_flight: usize,
    pub poll_interval: Duration,
}

/// Handle the `fetch` command
pub async fn fetch(args: FetchArgs) -> Result<()> {
    let creds = AuthManager::resolve(args.url, args.username, args.password)?;

    println!(
        "{} {} {}",
        "Fetching artwork for".cyan(),
        args.playlist.bold(),
        format!("into {}", args.output.display()).cyan()
    );

    let wake = WakeSignal::new();
    let client = SubsonicClient::new(&creds.url, &creds.username, &creds.password)
        .context("Failed to create Subsonic client")?;
    let session = Arc::new(SubsonicSession::new(client, wake.clone()));

    let settings = PipelineSettings {
        target_playlist: args.playlist,
        output_dir: args.output,
        image_size: args.size,
        max_in_flight: args.max_in_flight,
        poll_interval: args.poll_interval,
        ..Default::default()
    };
    let driver = PipelineDriver::new(session, Arc::new(PipelineContext::new(wake)), settings);

    let cancel = driver.cancel_handle();
    let interrupt = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!();
                println!("{}", "Interrupted, stopping...".yellow());
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let result = driver.run(creds.account()).await;
    interrupt.abort();
    let summary = result.context("Artwork fetch failed")?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    match summary.status {
        RunStatus::NoPlaylists => {
            println!("{}", "No playlists found on this account.".yellow());
            return;
        }
        RunStatus::Completed => println!("{}", "Done!".green().bold()),
        RunStatus::Cancelled => println!("{}", "Cancelled.".yellow().bold()),
    }

    println!("  Written: {}", summary.written.to_string().green());
    println!("  Skipped: {}", summary.skipped);
    if summary.failed > 0 {
        println!("  Failed:  {}", summary.failed.to_string().red());
    }
    debug!("Run summary: {:?}", summary);
}

/// Handle the `auth` command
pub async fn auth(
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    force: bool,
) -> Result<()> {
    println!("{}", "Configuring Subsonic credentials...".cyan());

    let creds = AuthManager::authenticate(url, username, password, force).await?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!("  Server: {}", creds.url);
    println!("  User: {}", creds.username);

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "coverdrop", &mut io::stdout());
}
