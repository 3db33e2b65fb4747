//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod expenses;
pub mod health;
pub mod reports;
pub mod webhook;

// Re-export all handlers for use in router
pub use expenses::*;
pub use health::*;
pub use reports::*;
pub use webhook::*;

/// Treat a missing or blank `sender_id` query parameter as "everyone"
pub(crate) fn sender_filter(sender_id: &Option<String>) -> Option<&str> {
    sender_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
