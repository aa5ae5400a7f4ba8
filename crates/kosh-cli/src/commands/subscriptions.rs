//! Detection and subscription command implementations

use anyhow::Result;
use kosh_core::models::SubscriptionStatus;
use kosh_core::{
    detect_subscriptions, save_detected_subscriptions, subscription_metrics, CoreConfig, Database,
};

use super::{resolve_account, truncate};

pub fn cmd_detect(
    db: &Database,
    config: &CoreConfig,
    account: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    println!("🔍 Detecting recurring charges...");

    let account_id = account.map(|name| resolve_account(db, name)).transpose()?;
    let proposals = detect_subscriptions(db, account_id, &config.detection)?;

    if proposals.is_empty() {
        println!("✅ No new recurring charges found.");
        return Ok(());
    }

    println!();
    println!("📋 Detected Patterns");
    println!("   ─────────────────────────────────────────────────────────────");
    for p in &proposals {
        println!(
            "   {:20} │ ₹{:>9.2}/{:<9} │ {} charges since {}",
            truncate(&p.merchant_name, 20),
            p.average_amount,
            p.billing_frequency.as_str(),
            p.transaction_ids.len(),
            p.first_charge_date
        );
    }

    if dry_run {
        println!();
        println!("   (dry run, nothing saved)");
        return Ok(());
    }

    let ids = save_detected_subscriptions(db, &proposals, None)?;
    println!();
    println!("✅ Saved {} subscriptions.", ids.len());
    println!("   Review them with: kosh subscriptions");
    Ok(())
}

fn status_icon(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "✅",
        SubscriptionStatus::Paused => "⏸️",
        SubscriptionStatus::Cancelled => "❌",
    }
}

pub fn cmd_subscriptions_list(db: &Database) -> Result<()> {
    let subscriptions = db.list_subscriptions(None)?;

    if subscriptions.is_empty() {
        println!("No subscriptions yet. Run:");
        println!("  kosh detect");
        return Ok(());
    }

    println!();
    println!("📋 Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────");

    for sub in subscriptions {
        let name = db
            .get_merchant(sub.merchant_id)?
            .map(|m| m.normalized_name)
            .unwrap_or_else(|| format!("merchant #{}", sub.merchant_id));
        let confirmed = if sub.is_confirmed { "" } else { " (unconfirmed)" };
        let next = sub
            .next_expected_date
            .map(|d| format!("next {}", d))
            .unwrap_or_else(|| "next ?".to_string());

        println!(
            "   {} [{:>3}] {:20} │ ₹{:>9.2}/{:<9} │ {}{}",
            status_icon(sub.status),
            sub.id,
            truncate(&name, 20),
            sub.average_amount,
            sub.billing_frequency.as_str(),
            next,
            confirmed
        );
    }

    Ok(())
}

pub fn cmd_subscriptions_confirm(db: &Database, id: i64) -> Result<()> {
    db.confirm_subscription(id)?;
    println!("✅ Subscription {} confirmed.", id);
    Ok(())
}

pub fn cmd_subscriptions_set_status(
    db: &Database,
    id: i64,
    status: SubscriptionStatus,
) -> Result<()> {
    db.update_subscription_status(id, status)?;
    println!("✅ Subscription {} is now {}.", id, status.as_str());
    Ok(())
}

pub fn cmd_subscriptions_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_subscription(id)?;
    println!("✅ Subscription {} deleted. Its transactions were kept.", id);
    Ok(())
}

pub fn cmd_metrics(db: &Database, account: Option<&str>) -> Result<()> {
    let account_id = account.map(|name| resolve_account(db, name)).transpose()?;
    let metrics = subscription_metrics(db, account_id)?;

    println!();
    println!("💸 Subscription Cost");
    println!("   ─────────────────────────────");
    println!("   Active subscriptions: {}", metrics.active_count);
    println!("   Monthly: ₹{:.2}", metrics.monthly_total);
    println!("   Annual:  ₹{:.2}", metrics.annual_total);
    Ok(())
}
