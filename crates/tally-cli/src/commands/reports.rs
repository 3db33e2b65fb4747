//! Report command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::chart::{ChartOptions, ChartRenderer, SvgBarChart};
use tally_core::db::Database;

/// Print per-category totals
pub fn cmd_summary(db: &Database, sender: Option<&str>, json: bool) -> Result<()> {
    let summary = db.get_spending_summary(sender)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.categories.is_empty() {
        println!("No expense data available.");
        return Ok(());
    }

    println!();
    match sender {
        Some(s) => println!("📊 Spending by Category ({})", s),
        None => println!("📊 Spending by Category"),
    }
    println!("   ─────────────────────────────────────");

    for category in &summary.categories {
        let pct = if summary.total > 0.0 {
            category.total / summary.total * 100.0
        } else {
            0.0
        };
        println!(
            "   {:<14} {:>10.2}  {:>5.1}%  ({} item{})",
            category.category,
            category.total,
            pct,
            category.count,
            if category.count == 1 { "" } else { "s" }
        );
    }

    println!("   ─────────────────────────────────────");
    println!("   {:<14} {:>10.2}", "Total", summary.total);

    Ok(())
}

/// Render the category bar chart to `out`
pub fn cmd_chart(db: &Database, sender: Option<&str>, out: &Path) -> Result<()> {
    let totals = db.sum_by_category(sender)?;

    if totals.is_empty() {
        println!("No expense data available.");
        return Ok(());
    }

    let chart = SvgBarChart.render(&totals, &ChartOptions::default())?;
    std::fs::write(out, &chart.bytes)
        .with_context(|| format!("Failed to write chart to {}", out.display()))?;

    println!("📈 Chart written to {}", out.display());
    Ok(())
}
