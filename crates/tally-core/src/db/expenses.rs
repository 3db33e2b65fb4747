//! Expense operations

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_category, parse_datetime, Database, MAX_PAGE_LIMIT};
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseRecord, RecordId, MAX_PRICE};

const EXPENSE_COLUMNS: &str = "id, description, price, category, sender_id, created_at";

impl Database {
    /// Append an expense, returning its new id
    ///
    /// Records are immutable once stored; there is no update path.
    pub fn insert_expense(&self, record: &ExpenseRecord) -> Result<RecordId> {
        if !record.price.is_finite() || !(0.0..=MAX_PRICE).contains(&record.price) {
            return Err(Error::InvalidData(format!(
                "Price must be between 0 and {}, got {}",
                MAX_PRICE, record.price
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (description, price, category, sender_id) VALUES (?, ?, ?, ?)",
            params![
                record.description,
                record.price,
                record.category.as_str(),
                record.sender_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, category = %record.category, "Inserted expense");
        Ok(id)
    }

    /// List expenses, newest first, optionally for one sender
    pub fn list_expenses(
        &self,
        sender_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE (?1 IS NULL OR sender_id = ?1)
            ORDER BY id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))?;

        let expenses = stmt
            .query_map(
                params![sender_id, limit.clamp(1, MAX_PAGE_LIMIT), offset.max(0)],
                Self::row_to_expense,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Count expenses, optionally for one sender
    pub fn count_expenses(&self, sender_id: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE (?1 IS NULL OR sender_id = ?1)",
            params![sender_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Get a single expense by ID
    pub fn get_expense(&self, id: RecordId) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"),
                params![id],
                Self::row_to_expense,
            )
            .optional()?;

        Ok(expense)
    }

    /// Distinct sender ids that have recorded at least one expense
    pub fn list_senders(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT sender_id FROM expenses WHERE sender_id IS NOT NULL ORDER BY sender_id",
        )?;

        let senders = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(senders)
    }

    fn row_to_expense(row: &rusqlite::Row) -> rusqlite::Result<Expense> {
        let category_str: String = row.get(3)?;
        let created_at_str: String = row.get(5)?;

        Ok(Expense {
            id: row.get(0)?,
            description: row.get(1)?,
            price: row.get(2)?,
            category: parse_category(&category_str),
            sender_id: row.get(4)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
