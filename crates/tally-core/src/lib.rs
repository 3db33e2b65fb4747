//! Tally Core Library
//!
//! Shared functionality for the Tally expense tracker:
//! - Extraction pipeline turning free text into validated expense records
//! - Pluggable generative backends (Gemini, Ollama, OpenAI-compatible)
//! - Prompt library with user overrides
//! - SQLite aggregation store with optional SQLCipher encryption
//! - Category chart rendering and sender replies

pub mod ai;
pub mod chart;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod notify;
pub mod prompts;
pub mod service;
pub mod store;

/// Test utilities including a mock model server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, GeminiBackend, MockBackend, MockReply, OllamaBackend,
    OpenAICompatibleBackend,
};
pub use chart::{Chart, ChartOptions, ChartRenderer, SvgBarChart};
pub use config::ExtractionConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use extract::{
    build_prompt, parse, sanitize, ExtractionFailure, ExtractionPipeline, FailureReason,
    ParseFailure, RequiredField,
};
pub use models::{
    Category, CategoryTotal, Expense, ExpenseRecord, RecordId, SpendingSummary, TextRequest,
    MAX_PRICE,
};
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use service::{ExpenseService, RecordOutcome};
pub use store::ExpenseStore;
