//! Tally CLI - Free-text expense tracker
//!
//! Usage:
//!   tally init                     Initialize database
//!   tally add "panipuri 20"        Extract and record an expense
//!   tally summary                  Totals per category
//!   tally chart --out chart.svg    Render the category bar chart
//!   tally serve                    Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Add {
            text,
            sender,
            dry_run,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let pipeline = commands::build_pipeline()?;
            commands::cmd_add(&db, pipeline, &text, sender.as_deref(), dry_run).await
        }
        Commands::List { sender, limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_list(&db, sender.as_deref(), limit)
        }
        Commands::Summary { sender, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, sender.as_deref(), json)
        }
        Commands::Chart { sender, out } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_chart(&db, sender.as_deref(), &out)
        }
        Commands::Prompt { action } => match action {
            PromptAction::Show { prompt_id } => commands::cmd_prompt_show(&prompt_id),
            PromptAction::Path => commands::cmd_prompt_path(),
        },
        Commands::Ai { action } => match action {
            AiAction::Health => commands::cmd_ai_health().await,
        },
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                commands::resolve_port(port),
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
    }
}
