//! Mock backend for testing
//!
//! Replays scripted replies when given some, otherwise answers with a
//! keyword-based guess wrapped in a markdown fence (the way hosted models
//! tend to reply). Useful for unit tests and for running without an API key.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use regex::Regex;

use crate::error::{Error, Result};

use super::AIBackend;

/// One scripted backend outcome
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Fail with a transport-level error
    Fail(String),
    /// Never answer (exercises timeouts)
    Hang,
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn fail(s: impl Into<String>) -> Self {
        Self::Fail(s.into())
    }
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new mock backend (healthy, heuristic replies)
    pub fn new() -> Self {
        Self {
            healthy: true,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a mock that replays `replies` in order, then falls back to heuristics
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        let backend = Self::new();
        if let Ok(mut queue) = backend.replies.lock() {
            queue.extend(replies);
        }
        backend
    }

    /// Queue another scripted reply
    pub fn push_reply(&self, reply: MockReply) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(reply);
        }
    }

    /// Number of `generate` calls made so far (shared across clones)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let scripted = self
            .replies
            .lock()
            .map_err(|_| Error::Backend("Mock reply queue poisoned".into()))?
            .pop_front();

        match scripted {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(msg)) => Err(Error::Backend(msg)),
            Some(MockReply::Hang) => std::future::pending::<Result<String>>().await,
            None => Ok(heuristic_reply(prompt)),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

/// Guess price and category from the expense text embedded in the prompt
pub(crate) fn heuristic_reply(prompt: &str) -> String {
    let text = prompt
        .rsplit_once("Expense text:")
        .map(|(_, t)| t.trim())
        .unwrap_or(prompt);
    let lower = text.to_lowercase();

    let category = KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or("Miscellaneous");

    let price = Regex::new(r"\d+(?:\.\d+)?")
        .ok()
        .and_then(|re| re.find(text));
    let body = match price {
        Some(m) => format!(r#"{{"price": {}, "category": "{}"}}"#, m.as_str(), category),
        None => format!(r#"{{"category": "{}"}}"#, category),
    };

    format!("```json\n{}\n```", body)
}

const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Transport",
        &["uber", "taxi", "cab", "bus", "metro", "train", "petrol", "fuel", "auto"],
    ),
    (
        "Groceries",
        &["milk", "vegetable", "grocer", "rice", "eggs", "bread", "fruit"],
    ),
    (
        "Food",
        &[
            "pizza", "lunch", "dinner", "breakfast", "coffee", "chai", "tea", "panipuri", "burger",
            "restaurant", "snack",
        ],
    ),
    (
        "Utilities",
        &["electricity", "water bill", "internet", "wifi", "phone bill", "gas bill"],
    ),
    (
        "Entertainment",
        &["movie", "netflix", "concert", "cinema", "game"],
    ),
    ("Shopping", &["shirt", "shoes", "clothes", "amazon", "mall"]),
    (
        "Healthcare",
        &["doctor", "medicine", "pharmacy", "hospital", "clinic"],
    ),
    ("Education", &["book", "course", "tuition", "school", "exam"]),
];
