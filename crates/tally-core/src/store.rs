//! Aggregation store boundary
//!
//! The ingest service only needs to append records and sum them per
//! category. `Database` is the production implementation; tests can swap in
//! anything that implements `ExpenseStore`.

use crate::db::Database;
use crate::error::Result;
use crate::models::{CategoryTotal, ExpenseRecord, RecordId};

/// Append-only expense store with per-category aggregation
pub trait ExpenseStore: Send + Sync {
    /// Persist a record, keeping every field including `sender_id`
    fn insert(&self, record: &ExpenseRecord) -> Result<RecordId>;

    /// Per-category totals, restricted to `sender_id` when given
    fn sum_by_category(&self, sender_id: Option<&str>) -> Result<Vec<CategoryTotal>>;
}

impl ExpenseStore for Database {
    fn insert(&self, record: &ExpenseRecord) -> Result<RecordId> {
        self.insert_expense(record)
    }

    fn sum_by_category(&self, sender_id: Option<&str>) -> Result<Vec<CategoryTotal>> {
        Database::sum_by_category(self, sender_id)
    }
}
