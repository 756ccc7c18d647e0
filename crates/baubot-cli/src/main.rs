//! CLI entry point for Baubot.
//!
//! This binary provides the `baubot` command. The main subcommand is
//! `bot`, which runs the Telegram gateway; `status` prints a quick
//! health summary of the local database.

mod bot;
mod helpers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::helpers::init_tracing;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Baubot — Telegram assistant for a small architecture office.
#[derive(Parser)]
#[command(
    name = "baubot",
    version,
    about = "Baubot — Telegram office assistant",
    long_about = "Classifies incoming Telegram messages with an LLM and runs the matching \
                  workflow: project creation with a Drive folder tree, time recording, \
                  tasks, and calendar events."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot gateway.
    Bot {
        /// Long-poll timeout in seconds.
        #[arg(long, default_value_t = 30)]
        poll_timeout: u64,

        /// Comma-separated Telegram user ids allowed to use the bot.
        /// When omitted, everyone is allowed.
        #[arg(long)]
        allowed_users: Option<String>,
    },

    /// Show local database status.
    Status,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; missing file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.command {
        Commands::Bot {
            poll_timeout,
            allowed_users,
        } => bot::cmd_bot(poll_timeout, allowed_users).await,
        Commands::Status => cmd_status().await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status() -> Result<()> {
    init_tracing("warn");

    let db_path = std::path::Path::new("data/baubot.db");
    if !db_path.exists() {
        println!();
        println!("  Database: not initialized (run `baubot bot` once)");
        println!();
        return Ok(());
    }

    let db = baubot_store::Database::open_and_migrate(db_path)
        .await
        .context("failed to open database")?;
    let projects = baubot_store::ProjectStore::new(db);

    println!();
    println!("  Baubot v{}", env!("CARGO_PKG_VERSION"));
    println!("  Database: {}", db_path.display());
    match projects.counter_state().await? {
        Some(state) => println!(
            "  Numbering: year {:02}, last issued {}",
            state.year, state.last_issued
        ),
        None => println!("  Numbering: no numbers issued yet"),
    }
    println!();
    Ok(())
}
