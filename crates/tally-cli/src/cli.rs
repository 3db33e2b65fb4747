//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Track expenses written in plain language
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Turn free-text expense notes into categorized spending", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Extract an expense from free text and record it
    Add {
        /// Expense description, e.g. "panipuri 20"
        text: String,

        /// Sender id to record the expense under
        #[arg(short, long)]
        sender: Option<String>,

        /// Show what would be extracted without storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// List recorded expenses, newest first
    List {
        /// Only show expenses from this sender
        #[arg(short, long)]
        sender: Option<String>,

        /// Maximum number of expenses to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show spending totals per category
    Summary {
        /// Only include expenses from this sender
        #[arg(short, long)]
        sender: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the category bar chart to an SVG file
    Chart {
        /// Only include expenses from this sender
        #[arg(short, long)]
        sender: Option<String>,

        /// Output file
        #[arg(short, long, default_value = "expense_chart.svg")]
        out: PathBuf,
    },

    /// Inspect the extraction prompt
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },

    /// Check the generative backend
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (falls back to $PORT, then 10000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, every API request needs a bearer key from TALLY_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PromptAction {
    /// Show the content of a prompt
    Show {
        /// Prompt ID
        #[arg(default_value = "extract_expense")]
        prompt_id: String,
    },

    /// Show the prompt override directory
    Path,
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Check that the configured backend is reachable
    Health,
}
