//! Subscription detection
//!
//! Groups a debit history by merchant, measures the day-gaps between
//! consecutive charges, and treats low relative variance as the periodicity
//! signal. Detection is side-effect-free: it returns proposals, and nothing
//! is persisted until [`save_detected_subscriptions`] is called with the ones
//! the user accepted.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::db::Database;
use crate::error::Result;
use crate::events::{ChangeEvent, ChangeNotifier};
use crate::models::{BillingFrequency, NewSubscription, PricePoint, Transaction};
use crate::normalize::normalize_merchant;

/// A detected recurring-charge pattern, not yet persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionProposal {
    /// Canonical merchant name the group was keyed on
    pub merchant_name: String,
    /// Resolved identity when the group's transactions carried one
    pub merchant_id: Option<i64>,
    pub account_id: Option<i64>,
    pub billing_frequency: BillingFrequency,
    pub average_amount: f64,
    pub last_amount: f64,
    pub first_charge_date: NaiveDate,
    pub last_charge_date: NaiveDate,
    pub next_expected_date: Option<NaiveDate>,
    pub price_history: Vec<PricePoint>,
    /// The charges behind the pattern at detection time. Saving re-resolves
    /// the group, so this is for display and counting only.
    pub transaction_ids: Vec<i64>,
}

/// Aggregate cost of active subscriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionMetrics {
    pub active_count: usize,
    /// Sum of average amounts normalized to a monthly cadence
    pub monthly_total: f64,
    pub annual_total: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_deviation(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Classify a mean charge interval into a billing cadence. Each bound is
/// inclusive; anything beyond quarterly reads as annual.
fn classify_frequency(mean_interval_days: f64, config: &DetectionConfig) -> BillingFrequency {
    if mean_interval_days <= config.weekly_max_days {
        BillingFrequency::Weekly
    } else if mean_interval_days <= config.monthly_max_days {
        BillingFrequency::Monthly
    } else if mean_interval_days <= config.quarterly_max_days {
        BillingFrequency::Quarterly
    } else {
        BillingFrequency::Annual
    }
}

/// One merchant's charge group during detection
struct ChargeGroup {
    display_name: String,
    merchant_id: Option<i64>,
    transactions: Vec<Transaction>,
}

/// Scan the debit history for periodic charge patterns.
///
/// A merchant qualifies only with at least two measurable intervals and a
/// coefficient of variation (std dev / mean) below the configured threshold.
/// Merchants that already have a subscription are skipped.
pub fn detect_subscriptions(
    db: &Database,
    account_id: Option<i64>,
    config: &DetectionConfig,
) -> Result<Vec<SubscriptionProposal>> {
    let transactions = db.list_debit_transactions(account_id)?;

    // Group by canonical merchant name, case-insensitively. Transactions
    // with a resolved identity use its stored name; the rest go through
    // normalization on the fly.
    let mut merchant_names: HashMap<i64, String> = HashMap::new();
    let mut groups: HashMap<String, ChargeGroup> = HashMap::new();

    for tx in transactions {
        let display_name = charge_display_name(db, &mut merchant_names, &tx)?;

        let group = groups
            .entry(display_name.to_lowercase())
            .or_insert_with(|| ChargeGroup {
                display_name,
                merchant_id: tx.merchant_id,
                transactions: Vec::new(),
            });
        if group.merchant_id.is_none() {
            group.merchant_id = tx.merchant_id;
        }
        group.transactions.push(tx);
    }

    let mut proposals = Vec::new();

    for group in groups.into_values() {
        if group.transactions.len() < config.min_transactions.max(2) {
            continue;
        }

        let mut charges = group.transactions;
        charges.sort_by_key(|t| t.date);

        let intervals: Vec<f64> = charges
            .windows(2)
            .map(|pair| (pair[1].date - pair[0].date).num_days() as f64)
            .collect();
        // A single interval is never sufficient evidence
        if intervals.len() < 2 {
            continue;
        }

        let mean_interval = mean(&intervals);
        if mean_interval <= 0.0 {
            continue; // repeated same-day charges, not a cadence
        }
        let cov = std_deviation(&intervals, mean_interval) / mean_interval;
        if cov >= config.cov_threshold {
            debug!(
                merchant = %group.display_name,
                cov,
                "interval variance too high, not periodic"
            );
            continue;
        }

        // One subscription per merchant per account: skip if a record
        // already references this identity.
        let merchant_id = match group.merchant_id {
            Some(mid) => Some(mid),
            None => db.find_merchant_by_name(&group.display_name)?.map(|m| m.id),
        };
        if let Some(mid) = merchant_id {
            if db.subscription_exists_for_merchant(mid, account_id)? {
                continue;
            }
        }

        let frequency = classify_frequency(mean_interval, config);
        let amounts: Vec<f64> = charges.iter().map(|t| t.amount).collect();
        let last = charges.last().expect("group is non-empty");

        proposals.push(SubscriptionProposal {
            merchant_name: group.display_name,
            merchant_id,
            account_id,
            billing_frequency: frequency,
            average_amount: mean(&amounts),
            last_amount: last.amount,
            first_charge_date: charges[0].date,
            last_charge_date: last.date,
            next_expected_date: Some(frequency.advance(last.date)),
            price_history: charges
                .iter()
                .map(|t| PricePoint {
                    date: t.date,
                    amount: t.amount,
                })
                .collect(),
            transaction_ids: charges.iter().map(|t| t.id).collect(),
        });
    }

    proposals.sort_by(|a, b| a.merchant_name.cmp(&b.merchant_name));
    info!(proposals = proposals.len(), "subscription detection complete");
    Ok(proposals)
}

/// Canonical display name for one charge: the resolved identity's stored
/// name when it has one, otherwise on-the-fly normalization of the raw text.
fn charge_display_name(
    db: &Database,
    names: &mut HashMap<i64, String>,
    tx: &Transaction,
) -> Result<String> {
    match tx.merchant_id {
        Some(mid) => {
            if let Some(name) = names.get(&mid) {
                return Ok(name.clone());
            }
            let name = db
                .get_merchant(mid)?
                .map(|m| m.normalized_name)
                .unwrap_or_else(|| normalize_merchant(&tx.merchant_raw));
            names.insert(mid, name.clone());
            Ok(name)
        }
        None => Ok(normalize_merchant(&tx.merchant_raw)),
    }
}

/// Charges currently in the store that belong to a proposal's merchant
/// group, keyed the same way detection keys them (case-insensitive
/// canonical name).
fn matching_charge_ids(db: &Database, proposal: &SubscriptionProposal) -> Result<Vec<i64>> {
    let mut names = HashMap::new();
    let mut ids = Vec::new();
    for tx in db.list_debit_transactions(proposal.account_id)? {
        let name = charge_display_name(db, &mut names, &tx)?;
        if name.eq_ignore_ascii_case(&proposal.merchant_name) {
            ids.push(tx.id);
        }
    }
    Ok(ids)
}

/// Persist accepted proposals and back-link their charges.
///
/// Each proposal becomes a subscription record (resolving a merchant
/// identity first if the group never had one). The charge group is
/// re-resolved against the store at save time, so charges imported after
/// detection are flagged recurring too. Returns the new ids in input order.
pub fn save_detected_subscriptions(
    db: &Database,
    proposals: &[SubscriptionProposal],
    notifier: Option<&ChangeNotifier>,
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(proposals.len());

    for proposal in proposals {
        let merchant_id = match proposal.merchant_id {
            Some(mid) => mid,
            None => db.resolve_or_create_merchant(&proposal.merchant_name, None)?,
        };

        let subscription_id = db.insert_subscription(&NewSubscription {
            merchant_id,
            account_id: proposal.account_id,
            billing_frequency: proposal.billing_frequency,
            average_amount: proposal.average_amount,
            last_amount: proposal.last_amount,
            first_charge_date: proposal.first_charge_date,
            last_charge_date: proposal.last_charge_date,
            next_expected_date: proposal.next_expected_date,
            price_history: proposal.price_history.clone(),
        })?;

        let charge_ids = matching_charge_ids(db, proposal)?;
        db.mark_transactions_recurring(&charge_ids, subscription_id)?;
        ids.push(subscription_id);
    }

    if let (Some(notifier), false) = (notifier, ids.is_empty()) {
        notifier.notify(ChangeEvent::SubscriptionsChanged { count: ids.len() });
    }
    Ok(ids)
}

/// Monthly and annual cost of the active subscriptions
pub fn subscription_metrics(
    db: &Database,
    account_id: Option<i64>,
) -> Result<SubscriptionMetrics> {
    let active = db.list_active_subscriptions(account_id)?;

    let monthly_total: f64 = active
        .iter()
        .map(|s| s.average_amount * s.billing_frequency.monthly_factor())
        .sum();

    Ok(SubscriptionMetrics {
        active_count: active.len(),
        monthly_total,
        annual_total: monthly_total * 12.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::transaction_hash;
    use crate::models::{NewTransaction, TransactionType};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn insert_charge(db: &Database, account_id: i64, merchant: &str, date: NaiveDate, amount: f64) {
        let tx = NewTransaction {
            account_id,
            date,
            merchant_raw: merchant.to_string(),
            merchant_id: None,
            category_id: None,
            amount,
            transaction_type: TransactionType::Debit,
            confidence_score: 90.0,
            description: None,
            source_file_name: None,
            transaction_hash: transaction_hash(account_id, date, amount, merchant),
        };
        db.insert_transaction(&tx, false).unwrap();
    }

    /// Dates spaced by the given day-gaps, starting 2024-01-01
    fn spaced_dates(gaps: &[i64]) -> Vec<NaiveDate> {
        let mut dates = vec![day(2024, 1, 1)];
        for gap in gaps {
            dates.push(*dates.last().unwrap() + chrono::Duration::days(*gap));
        }
        dates
    }

    #[test]
    fn regular_monthly_charges_are_detected() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        for date in spaced_dates(&[30, 31, 29, 30, 31]) {
            insert_charge(&db, account, "NETFLIX.COM", date, 15.99);
        }

        let proposals =
            detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        assert_eq!(proposals.len(), 1);

        let p = &proposals[0];
        assert_eq!(p.merchant_name, "Netflix");
        assert_eq!(p.billing_frequency, BillingFrequency::Monthly);
        assert_eq!(p.average_amount, 15.99);
        assert_eq!(p.first_charge_date, day(2024, 1, 1));
        assert_eq!(p.price_history.len(), 6);
        assert_eq!(
            p.next_expected_date,
            Some(BillingFrequency::Monthly.advance(p.last_charge_date))
        );
    }

    #[test]
    fn irregular_charges_are_not_detected() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        for date in spaced_dates(&[5, 40, 12, 90]) {
            insert_charge(&db, account, "RANDOM SHOP", date, 20.0);
        }

        let proposals =
            detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn single_interval_is_not_enough() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        for date in spaced_dates(&[30]) {
            insert_charge(&db, account, "SPOTIFY", date, 9.99);
        }

        let proposals =
            detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn weekly_and_annual_classification() {
        let config = DetectionConfig::default();
        assert_eq!(classify_frequency(7.0, &config), BillingFrequency::Weekly);
        // Boundary values belong to the lower bucket
        assert_eq!(classify_frequency(10.0, &config), BillingFrequency::Weekly);
        assert_eq!(classify_frequency(45.0, &config), BillingFrequency::Monthly);
        assert_eq!(classify_frequency(90.0, &config), BillingFrequency::Quarterly);
        assert_eq!(classify_frequency(365.0, &config), BillingFrequency::Annual);
    }

    #[test]
    fn existing_subscription_suppresses_reproposal() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        for date in spaced_dates(&[30, 30, 30]) {
            insert_charge(&db, account, "NETFLIX.COM", date, 15.99);
        }

        let first = detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        assert_eq!(first.len(), 1);
        save_detected_subscriptions(&db, &first, None).unwrap();

        let second = detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn saving_back_links_transactions() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        for date in spaced_dates(&[30, 30, 30]) {
            insert_charge(&db, account, "NETFLIX.COM", date, 15.99);
        }

        let proposals =
            detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        let ids = save_detected_subscriptions(&db, &proposals, None).unwrap();
        assert_eq!(ids.len(), 1);

        for tx in db.list_transactions(Some(account), 100, 0).unwrap() {
            assert!(tx.is_recurring);
            assert_eq!(tx.subscription_id, Some(ids[0]));
        }

        let sub = db.get_subscription(ids[0]).unwrap().unwrap();
        assert_eq!(sub.billing_frequency, BillingFrequency::Monthly);
        assert!(!sub.is_confirmed);
        assert_eq!(sub.price_history.len(), 4);
    }

    #[test]
    fn saving_links_charges_imported_after_detection() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let dates = spaced_dates(&[30, 30, 30]);
        for date in &dates {
            insert_charge(&db, account, "NETFLIX.COM", *date, 15.99);
        }

        let proposals =
            detect_subscriptions(&db, Some(account), &DetectionConfig::default()).unwrap();
        assert_eq!(proposals.len(), 1);

        // Another charge lands between detection and save
        let late = *dates.last().unwrap() + chrono::Duration::days(30);
        insert_charge(&db, account, "NETFLIX.COM", late, 15.99);

        let ids = save_detected_subscriptions(&db, &proposals, None).unwrap();
        let linked = db.list_transactions(Some(account), 100, 0).unwrap();
        assert_eq!(linked.len(), 5);
        for tx in linked {
            assert!(tx.is_recurring);
            assert_eq!(tx.subscription_id, Some(ids[0]));
        }
    }

    #[test]
    fn metrics_normalize_to_monthly() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();

        let netflix = db.resolve_or_create_merchant("NETFLIX.COM", None).unwrap();
        let gym = db.resolve_or_create_merchant("GYM MEMBERSHIP", None).unwrap();

        db.insert_subscription(&NewSubscription {
            merchant_id: netflix,
            account_id: Some(account),
            billing_frequency: BillingFrequency::Monthly,
            average_amount: 15.0,
            last_amount: 15.0,
            first_charge_date: day(2024, 1, 1),
            last_charge_date: day(2024, 6, 1),
            next_expected_date: None,
            price_history: vec![],
        })
        .unwrap();
        db.insert_subscription(&NewSubscription {
            merchant_id: gym,
            account_id: Some(account),
            billing_frequency: BillingFrequency::Annual,
            average_amount: 120.0,
            last_amount: 120.0,
            first_charge_date: day(2024, 1, 1),
            last_charge_date: day(2024, 1, 1),
            next_expected_date: None,
            price_history: vec![],
        })
        .unwrap();

        let metrics = subscription_metrics(&db, Some(account)).unwrap();
        assert_eq!(metrics.active_count, 2);
        assert!((metrics.monthly_total - 25.0).abs() < 1e-9);
        assert!((metrics.annual_total - 300.0).abs() < 1e-9);
    }
}
