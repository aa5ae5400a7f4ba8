//! Merchant registry command implementations

use anyhow::Result;
use kosh_core::Database;

use super::truncate;

pub fn cmd_merchants_list(db: &Database, limit: usize) -> Result<()> {
    let merchants = db.list_merchants()?;

    if merchants.is_empty() {
        println!("No merchants yet. Import transactions with:");
        println!("  kosh import --file statement.csv --account hdfc");
        return Ok(());
    }

    println!();
    println!("🏪 Merchants");
    println!("   ─────────────────────────────────────────────────────────────");

    for merchant in merchants.iter().take(limit) {
        println!(
            "   [{:>4}] {:25} │ {:>5} txns │ ₹{:>10.2} │ {} variants",
            merchant.id,
            truncate(&merchant.normalized_name, 25),
            merchant.transaction_count,
            merchant.total_spent,
            merchant.variants.len()
        );
    }
    if merchants.len() > limit {
        println!("   ... and {} more (use --limit)", merchants.len() - limit);
    }

    Ok(())
}

pub fn cmd_merchants_merge(db: &Database, into: i64, sources: &[i64]) -> Result<()> {
    if sources.is_empty() {
        anyhow::bail!("No source merchant IDs given");
    }

    let target = db
        .get_merchant(into)?
        .ok_or_else(|| anyhow::anyhow!("Target merchant not found: {}", into))?;

    db.merge_merchants(into, sources)?;

    let merged = db.get_merchant(into)?.expect("target survives the merge");
    println!(
        "✅ Merged {} merchants into \"{}\" ({} transactions, {} variants)",
        sources.len(),
        target.normalized_name,
        merged.transaction_count,
        merged.variants.len()
    );
    Ok(())
}
