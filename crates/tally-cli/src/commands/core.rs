//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `build_pipeline` - Extraction pipeline from the environment
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::ai::AIClient;
use tally_core::config::ExtractionConfig;
use tally_core::db::Database;
use tally_core::extract::ExtractionPipeline;
use tally_core::prompts::PromptLibrary;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Build the extraction pipeline from `AI_BACKEND` and the extraction config
pub fn build_pipeline() -> Result<ExtractionPipeline> {
    let client = AIClient::require_from_env()?;
    let config = ExtractionConfig::load().context("Failed to load extraction config")?;
    let pipeline = ExtractionPipeline::new(client, config, &mut PromptLibrary::new())
        .context("Failed to load extraction prompt")?;
    Ok(pipeline)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Configure a backend: export GEMINI_API_KEY=...");
    println!("  2. Record an expense: tally add \"panipuri 20\"");
    println!("  3. Start web UI: tally serve");

    Ok(())
}
