//! Import pipeline
//!
//! Candidates from any extraction path flow through the same steps: score
//! the confidence, resolve the merchant identity, fingerprint, insert with
//! the dedup check, and bump merchant stats. Items are processed in input
//! order; a duplicate is counted, never fatal to the batch.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ScoringConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::events::{ChangeEvent, ChangeNotifier};
use crate::extract::{process_csv_content, process_text_content, CsvColumnMap};
use crate::hash::transaction_hash;
use crate::models::{CandidateTransaction, NewTransaction, RowError, TransactionType};
use crate::score::score_confidence;

/// Per-batch import options
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Keep items the dedup check flags; set only after human review
    pub allow_duplicates: bool,
    /// Provenance recorded on every inserted transaction
    pub source_file_name: Option<String>,
}

/// Structured outcome of a batch import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub added: usize,
    pub duplicates: usize,
    pub errors: Vec<RowError>,
    /// IDs of the inserted transactions, in input order
    pub transaction_ids: Vec<i64>,
}

/// Run scored candidates through dedup and persistence.
pub fn import_candidates(
    db: &Database,
    account_id: i64,
    candidates: &[CandidateTransaction],
    options: &ImportOptions,
    config: &ScoringConfig,
    notifier: Option<&ChangeNotifier>,
) -> Result<ImportSummary> {
    let today = Utc::now().date_naive();
    let mut summary = ImportSummary::default();

    for candidate in candidates {
        let confidence = score_confidence(
            candidate.confidence_score,
            candidate.amount,
            candidate.date,
            &candidate.merchant_raw,
            today,
            config,
        );
        let hash = transaction_hash(
            account_id,
            candidate.date,
            candidate.amount,
            &candidate.merchant_raw,
        );
        // Check the fingerprint before resolving the merchant so a rejected
        // duplicate never creates an identity as a side effect.
        if !options.allow_duplicates && db.find_transaction_by_hash(&hash)?.is_some() {
            summary.duplicates += 1;
            continue;
        }
        let merchant_id = db.resolve_or_create_merchant(&candidate.merchant_raw, None)?;

        let tx = NewTransaction {
            account_id,
            date: candidate.date,
            merchant_raw: candidate.merchant_raw.clone(),
            merchant_id: Some(merchant_id),
            category_id: None,
            amount: candidate.amount,
            transaction_type: candidate.transaction_type,
            confidence_score: confidence,
            description: candidate.description.clone(),
            source_file_name: options.source_file_name.clone(),
            transaction_hash: hash,
        };

        match db.insert_transaction(&tx, options.allow_duplicates) {
            Ok(id) => {
                let spent = if candidate.transaction_type == TransactionType::Debit {
                    candidate.amount
                } else {
                    0.0
                };
                db.update_merchant_stats(merchant_id, spent, 1)?;
                summary.transaction_ids.push(id);
                summary.added += 1;
            }
            Err(Error::Duplicate { .. }) => summary.duplicates += 1,
            Err(e) => return Err(e),
        }
    }

    if summary.added > 0 {
        if let Some(notifier) = notifier {
            notifier.notify(ChangeEvent::TransactionsChanged {
                added: summary.added,
            });
        }
    }

    info!(
        added = summary.added,
        duplicates = summary.duplicates,
        "import complete"
    );
    Ok(summary)
}

/// Extract a free-text statement and import the results.
pub fn import_text(
    db: &Database,
    account_id: i64,
    text: &str,
    options: &ImportOptions,
    config: &ScoringConfig,
    notifier: Option<&ChangeNotifier>,
) -> Result<ImportSummary> {
    let batch = process_text_content(text);
    let mut summary = import_candidates(db, account_id, &batch.transactions, options, config, notifier)?;
    summary.errors.extend(batch.errors);
    Ok(summary)
}

/// Extract CSV content and import the results. Row errors from extraction
/// ride along in the summary.
pub fn import_csv(
    db: &Database,
    account_id: i64,
    csv: &str,
    map: &CsvColumnMap,
    options: &ImportOptions,
    config: &ScoringConfig,
    notifier: Option<&ChangeNotifier>,
) -> Result<ImportSummary> {
    let batch = process_csv_content(csv, map);
    let mut summary = import_candidates(db, account_id, &batch.transactions, options, config, notifier)?;
    summary.errors.extend(batch.errors);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn candidate(date: NaiveDate, merchant: &str, amount: f64) -> CandidateTransaction {
        CandidateTransaction {
            date,
            merchant_raw: merchant.to_string(),
            amount,
            transaction_type: TransactionType::Debit,
            confidence_score: 70.0,
            description: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn duplicates_are_counted_not_fatal() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let config = ScoringConfig::default();

        let items = vec![
            candidate(day(2024, 3, 15), "AMAZON.COM", 45.99),
            // Same day, same amount, merchant differs only in formatting
            candidate(day(2024, 3, 15), "Amazon com", 45.99),
            candidate(day(2024, 3, 16), "STARBUCKS", 5.50),
        ];

        let summary = import_candidates(
            &db,
            account,
            &items,
            &ImportOptions::default(),
            &config,
            None,
        )
        .unwrap();
        assert_eq!(summary.added, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.transaction_ids.len(), 2);
    }

    #[test]
    fn allow_duplicates_bypasses_the_check() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let config = ScoringConfig::default();

        let items = vec![
            candidate(day(2024, 3, 15), "AMAZON.COM", 45.99),
            candidate(day(2024, 3, 15), "AMAZON.COM", 45.99),
        ];

        let options = ImportOptions {
            allow_duplicates: true,
            ..ImportOptions::default()
        };
        let summary = import_candidates(&db, account, &items, &options, &config, None).unwrap();
        assert_eq!(summary.added, 2);
        assert_eq!(summary.duplicates, 0);
    }

    #[test]
    fn merchant_stats_track_debits() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let config = ScoringConfig::default();

        let mut refund = candidate(day(2024, 3, 20), "AMAZON.COM", 10.00);
        refund.transaction_type = TransactionType::Credit;
        let items = vec![
            candidate(day(2024, 3, 15), "AMAZON.COM", 45.99),
            candidate(day(2024, 3, 16), "AMAZON.COM", 4.01),
            refund,
        ];

        import_candidates(&db, account, &items, &ImportOptions::default(), &config, None).unwrap();

        let merchant = db.find_merchant_by_name("Amazon").unwrap().unwrap();
        assert_eq!(merchant.transaction_count, 3);
        assert!((merchant.total_spent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn imported_transactions_are_scored_and_linked() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let config = ScoringConfig::default();

        let today = Utc::now().date_naive();
        let items = vec![candidate(today, "NETFLIX.COM", 15.99)];
        let options = ImportOptions {
            source_file_name: Some("march.txt".to_string()),
            ..ImportOptions::default()
        };
        let summary = import_candidates(&db, account, &items, &options, &config, None).unwrap();

        let tx = db.get_transaction(summary.transaction_ids[0]).unwrap().unwrap();
        assert_eq!(tx.confidence_score, 90.0); // 70 + 5 + 10 + 5
        assert!(tx.merchant_id.is_some());
        assert_eq!(tx.source_file_name.as_deref(), Some("march.txt"));
    }

    #[test]
    fn text_import_end_to_end() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let config = ScoringConfig::default();

        let statement = "Statement of Account\n\
                         03/15/2024 NETFLIX.COM $15.99\n\
                         03/16/2024 SALARY DEPOSIT $2,000.00\n";
        let summary = import_text(
            &db,
            account,
            statement,
            &ImportOptions::default(),
            &config,
            None,
        )
        .unwrap();
        assert_eq!(summary.added, 2);

        let txs = db.list_transactions(Some(account), 10, 0).unwrap();
        let deposit = txs.iter().find(|t| t.amount == 2000.0).unwrap();
        assert_eq!(deposit.transaction_type, TransactionType::Credit);
    }

    #[test]
    fn csv_import_carries_row_errors() {
        let db = Database::in_memory().unwrap();
        let account = db.upsert_account("hdfc", None, None).unwrap();
        let config = ScoringConfig::default();

        let csv = "Date,Description,Amount\n\
                   2024-03-15,\"AMAZON, INC\",-45.99\n\
                   bad-date,SHOP,-1.00\n";
        let summary = import_csv(
            &db,
            account,
            csv,
            &CsvColumnMap::default(),
            &ImportOptions::default(),
            &config,
            None,
        )
        .unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].line, 3);
    }
}
