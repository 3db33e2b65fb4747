//! Expense command implementations

use anyhow::{bail, Result};
use tally_core::db::Database;
use tally_core::extract::ExtractionPipeline;
use tally_core::models::TextRequest;
use tally_core::service::{ExpenseService, RecordOutcome};

use super::truncate;

/// Extract an expense from `text` and record it (or only show it with `dry_run`)
pub async fn cmd_add(
    db: &Database,
    pipeline: ExtractionPipeline,
    text: &str,
    sender: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let request = TextRequest::new(text, sender.map(str::to_string))?;

    if dry_run {
        return match pipeline.extract(&request).await {
            Ok(record) => {
                println!("🔍 Would record (dry run):");
                println!("   Price:    {:.2}", record.price);
                println!("   Category: {}", record.category);
                Ok(())
            }
            Err(failure) => bail!(
                "Could not extract an expense ({}): {}",
                failure.reason.as_str(),
                failure.detail
            ),
        };
    }

    let service = ExpenseService::new(pipeline, db.clone());
    match service.record(&request).await? {
        RecordOutcome::Recorded { id, record } => {
            println!("✅ Expense #{} added", id);
            println!("   Price:    {:.2}", record.price);
            println!("   Category: {}", record.category);
            Ok(())
        }
        RecordOutcome::Rejected(failure) => bail!(
            "Could not extract an expense ({}): {}",
            failure.reason.as_str(),
            failure.detail
        ),
    }
}

pub fn cmd_list(db: &Database, sender: Option<&str>, limit: i64) -> Result<()> {
    let expenses = db.list_expenses(sender, limit, 0)?;

    if expenses.is_empty() {
        println!("No expenses found. Record one with:");
        println!("  tally add \"panipuri 20\"");
        return Ok(());
    }

    let total = db.count_expenses(sender)?;

    println!();
    println!("📝 Recent Expenses ({} total)", total);
    println!("   ─────────────────────────────────────────────────────────────");

    for expense in expenses {
        println!(
            "   {} │ {:>10.2} │ {:<13} │ {}",
            expense.created_at.format("%Y-%m-%d %H:%M"),
            expense.price,
            expense.category,
            truncate(&expense.description, 30)
        );
    }

    Ok(())
}
