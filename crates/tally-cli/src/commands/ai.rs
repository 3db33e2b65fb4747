//! Generative backend command implementations

use anyhow::Result;
use tally_core::ai::{AIBackend, AIClient};
use tally_core::config::ExtractionConfig;

/// Report which backend is configured and whether it answers
pub async fn cmd_ai_health() -> Result<()> {
    println!("🔍 Checking generative backend...\n");

    let Some(client) = AIClient::from_env() else {
        println!("  ⚠️  No backend configured");
        println!();
        println!("To configure one:");
        println!("  Gemini:  export GEMINI_API_KEY=...");
        println!("  Ollama:  export AI_BACKEND=ollama OLLAMA_HOST=http://localhost:11434");
        println!("  Other:   export AI_BACKEND=openai_compatible OPENAI_COMPATIBLE_HOST=...");
        return Ok(());
    };

    let config = ExtractionConfig::load()?;

    println!("  Backend: {}", client.kind());
    println!("  Host:    {}", client.host());
    println!("  Model:   {}", client.model());
    println!(
        "  Timeout: {}s, retries: {}",
        config.timeout.as_secs(),
        config.max_retries
    );
    println!();

    print!("Checking availability... ");
    if client.health_check().await {
        println!("✅ Connected");
    } else {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {} at {}", client.kind(), client.host());
    }

    Ok(())
}
