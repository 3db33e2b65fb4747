//! Response sanitizer
//!
//! Models like to wrap JSON in markdown fences (```` ```json ... ``` ````).
//! This strips the fences and any language tag glued to them, leaving the
//! rest of the text untouched.

use std::sync::OnceLock;

use regex::Regex;

/// A run of three or more backticks plus an optional language tag directly after it.
/// Tags start with a letter, so an amount glued to a fence (```` ```20``` ````) is kept.
/// Matching whole runs (not fixed triples) keeps the transform idempotent:
/// what's left can never join up into a new fence.
fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)`{3,}(?:[a-z][a-z0-9_+\-]*)?").expect("valid regex"))
}

/// Remove code-fence markers and trim surrounding whitespace.
///
/// Total function: any input (including empty) yields a string with no fence markers.
pub fn sanitize(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}
