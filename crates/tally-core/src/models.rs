//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier assigned to a persisted expense
pub type RecordId = i64;

/// Largest price accepted for a single expense
///
/// Keeps category totals finite: `f64` sums of prices this size cannot overflow.
pub const MAX_PRICE: f64 = 1_000_000_000_000.0;

/// Allowed expense categories
///
/// `Category::ALL` is the single list consumed by both the extraction prompt
/// and the normalizer, so the two can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Groceries,
    Utilities,
    Entertainment,
    Shopping,
    Healthcare,
    Education,
    /// Fallback for anything that doesn't match the set
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Food,
        Self::Transport,
        Self::Groceries,
        Self::Utilities,
        Self::Entertainment,
        Self::Shopping,
        Self::Healthcare,
        Self::Education,
        Self::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Groceries => "Groceries",
            Self::Utilities => "Utilities",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Miscellaneous => "Miscellaneous",
        }
    }

    /// Case-insensitive match against the allowed set, falling back to
    /// `Miscellaneous` for anything unrecognized
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(Self::Miscellaneous)
    }

    /// Comma-separated list used when building prompts
    pub fn prompt_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Strict parse (no fallback), used when reading rows back from storage
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Inbound free-text expense description
///
/// Built per call from a UI submission or a messaging webhook, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    text: String,
    sender_id: Option<String>,
}

impl TextRequest {
    /// Create a request, rejecting text that is empty after trimming.
    /// Blank sender ids are treated as absent.
    pub fn new(text: impl Into<String>, sender_id: Option<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidData("Expense text must not be empty".into()));
        }
        let sender_id = sender_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Self { text, sender_id })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.sender_id.as_deref()
    }
}

/// A validated expense extracted from free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// The original free-text description
    pub description: String,
    /// Always a non-negative number
    pub price: f64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

/// A persisted expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: RecordId,
    pub description: String,
    pub price: f64,
    pub category: Category,
    pub sender_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn record(&self) -> ExpenseRecord {
        ExpenseRecord {
            description: self.description.clone(),
            price: self.price,
            category: self.category,
            sender_id: self.sender_id.clone(),
        }
    }
}

/// Spending total for one category, recomputed on every query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: f64,
    /// Number of expenses in the group
    pub count: i64,
}

/// Category breakdown for a scope (everyone, or a single sender)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub sender_id: Option<String>,
    /// Sum of all category totals
    pub total: f64,
    pub categories: Vec<CategoryTotal>,
}

impl SpendingSummary {
    pub fn from_totals(sender_id: Option<&str>, categories: Vec<CategoryTotal>) -> Self {
        let total = categories.iter().map(|c| c.total).sum();
        Self {
            sender_id: sender_id.map(str::to_string),
            total,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_normalize_is_case_insensitive() {
        assert_eq!(Category::normalize("FOOD"), Category::Food);
        assert_eq!(Category::normalize("food"), Category::Food);
        assert_eq!(Category::normalize("Food"), Category::Food);
        assert_eq!(Category::normalize("  healthcare "), Category::Healthcare);
    }

    #[test]
    fn test_category_normalize_falls_back() {
        assert_eq!(Category::normalize("Snacks"), Category::Miscellaneous);
        assert_eq!(Category::normalize(""), Category::Miscellaneous);
        assert_eq!(Category::normalize("Foods"), Category::Miscellaneous);
    }

    #[test]
    fn test_category_from_str_is_strict() {
        assert_eq!("transport".parse::<Category>(), Ok(Category::Transport));
        assert!("Snacks".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_as_display_name() {
        let json = serde_json::to_string(&Category::Groceries).unwrap();
        assert_eq!(json, "\"Groceries\"");
    }

    #[test]
    fn test_prompt_list_covers_all_categories() {
        let list = Category::prompt_list();
        for category in Category::ALL {
            assert!(list.contains(category.as_str()));
        }
    }

    #[test]
    fn test_text_request_rejects_blank_text() {
        assert!(TextRequest::new("   ", None).is_err());
        assert!(TextRequest::new("", Some("+15550100".into())).is_err());
    }

    #[test]
    fn test_text_request_blank_sender_is_none() {
        let req = TextRequest::new("spent 20 on chai", Some("  ".into())).unwrap();
        assert_eq!(req.sender_id(), None);

        let req = TextRequest::new("spent 20 on chai", Some(" +15550100 ".into())).unwrap();
        assert_eq!(req.sender_id(), Some("+15550100"));
        assert_eq!(req.text(), "spent 20 on chai");
    }

    #[test]
    fn test_summary_total_matches_categories() {
        let summary = SpendingSummary::from_totals(
            None,
            vec![
                CategoryTotal {
                    category: Category::Food,
                    total: 50.0,
                    count: 2,
                },
                CategoryTotal {
                    category: Category::Transport,
                    total: 10.0,
                    count: 1,
                },
            ],
        );
        assert_eq!(summary.total, 60.0);
    }
}
