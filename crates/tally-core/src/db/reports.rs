//! Spending aggregation

use rusqlite::params;

use super::{parse_category, Database};
use crate::error::Result;
use crate::models::{CategoryTotal, SpendingSummary};

impl Database {
    /// Sum expense prices per category, largest total first
    ///
    /// Recomputed from the rows on every call. An empty scope yields an empty
    /// vector, not an error.
    pub fn sum_by_category(&self, sender_id: Option<&str>) -> Result<Vec<CategoryTotal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category, SUM(price) AS total, COUNT(*)
            FROM expenses
            WHERE (?1 IS NULL OR sender_id = ?1)
            GROUP BY category
            ORDER BY total DESC, category ASC
            "#,
        )?;

        let totals = stmt
            .query_map(params![sender_id], |row| {
                let category_str: String = row.get(0)?;
                Ok(CategoryTotal {
                    category: parse_category(&category_str),
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(totals)
    }

    /// Category breakdown plus overall total for a scope
    pub fn get_spending_summary(&self, sender_id: Option<&str>) -> Result<SpendingSummary> {
        let categories = self.sum_by_category(sender_id)?;
        Ok(SpendingSummary::from_totals(sender_id, categories))
    }
}
