//! Property tests for the sanitizer and parser

use proptest::prelude::*;
use tally_core::{parse, sanitize, Category};

fn fence() -> impl Strategy<Value = String> {
    (3usize..6, prop_oneof![Just(""), Just("json"), Just("JSON"), Just("Json")])
        .prop_map(|(n, tag)| format!("{}{}", "`".repeat(n), tag))
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(s in ".*") {
        let once = sanitize(&s);
        prop_assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn sanitize_removes_every_fence(
        open in fence(),
        body in "[^`]*",
        close in fence(),
    ) {
        let raw = format!("{}\n{}\n{}", open, body, close);
        let out = sanitize(&raw);
        prop_assert!(!out.contains("```"));
        prop_assert_eq!(out, body.trim());
    }

    #[test]
    fn sanitize_preserves_ordering(
        parts in proptest::collection::vec("[a-z0-9 {}:,\"]{1,12}", 1..5),
        fences in proptest::collection::vec(fence(), 1..5),
    ) {
        let mut raw = String::new();
        for (i, part) in parts.iter().enumerate() {
            raw.push_str(&fences[i % fences.len()]);
            raw.push('\n');
            raw.push_str(part);
        }
        let out = sanitize(&raw);

        let mut cursor = 0;
        for part in &parts {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let found = out[cursor..].find(trimmed);
            prop_assert!(found.is_some(), "{:?} missing after {} in {:?}", trimmed, cursor, out);
            cursor += found.unwrap_or(0) + trimmed.len();
        }
    }

    #[test]
    fn parse_is_total(s in ".*") {
        let _ = parse(&s);
    }

    #[test]
    fn parsed_records_are_valid(
        price in prop_oneof![
            any::<f64>().prop_map(|p| p.to_string()),
            any::<i64>().prop_map(|p| p.to_string()),
            ".{0,8}".prop_map(|p| format!("{:?}", p)),
        ],
        category in ".{0,16}",
    ) {
        let payload = format!(r#"{{"price": {}, "category": {:?}}}"#, price, category);
        if let Ok(fields) = parse(&payload) {
            prop_assert!(fields.price >= 0.0);
            prop_assert!(fields.price.is_finite());
            prop_assert!(Category::ALL.contains(&fields.category));
        }
    }

    #[test]
    fn category_match_ignores_case(index in 0usize..9, mask in any::<u64>()) {
        let category = Category::ALL[index];
        let mixed: String = category
            .as_str()
            .chars()
            .enumerate()
            .map(|(i, c)| if mask >> (i % 64) & 1 == 1 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
            .collect();
        let payload = format!(r#"{{"price": 1, "category": "{}"}}"#, mixed);
        prop_assert_eq!(parse(&payload).map(|f| f.category), Ok(category));
    }
}
