//! Extraction pipeline configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tally/config/extraction.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/extraction.toml");

/// Timeout and retry policy for calls to the generative backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Per-call timeout; expiry is reported as `BackendTimeout`
    pub timeout: Duration,
    /// Extra attempts after a transport failure
    pub max_retries: u32,
    /// Base delay between attempts, multiplied by the attempt number
    pub retry_backoff: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl ExtractionConfig {
    /// Load from the override file if present, else the embedded defaults
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => parse_config(DEFAULT_CONFIG),
        }
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        parse_config(&content)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("extraction.toml"))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    backend: Option<RawBackend>,
    retry: Option<RawRetry>,
}

#[derive(Debug, Deserialize)]
struct RawBackend {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawRetry {
    max_retries: Option<u32>,
    backoff_ms: Option<u64>,
}

fn parse_config(content: &str) -> Result<ExtractionConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = ExtractionConfig::default();

    if let Some(backend) = raw.backend {
        if let Some(timeout) = backend.timeout_secs {
            config.timeout = Duration::from_secs(timeout);
        }
    }

    if let Some(retry) = raw.retry {
        if let Some(retries) = retry.max_retries {
            config.max_retries = retries;
        }
        if let Some(backoff) = retry.backoff_ms {
            config.retry_backoff = Duration::from_millis(backoff);
        }
    }

    Ok(config)
}
