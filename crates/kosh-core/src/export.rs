//! Export functionality for transactions and full database backups
//!
//! Supports:
//! - Transaction CSV export with filtering (account, date range)
//! - Full JSON backup export/import with all database tables

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Account, Merchant, Subscription, Transaction};

/// Options for transaction export
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub account_id: Option<i64>,
    /// Start date filter (inclusive)
    pub from: Option<NaiveDate>,
    /// End date filter (inclusive)
    pub to: Option<NaiveDate>,
}

/// One exported transaction row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub date: String,
    /// Canonical merchant name, falling back to the raw statement text
    pub merchant: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub recurring: bool,
    pub source_file: String,
}

impl Database {
    /// Export transactions matching the options, date ascending
    pub fn export_transactions(&self, opts: &ExportOptions) -> Result<Vec<ExportRow>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            r#"
            SELECT t.date, COALESCE(m.normalized_name, t.merchant_raw), t.amount,
                   t.transaction_type, t.is_recurring, COALESCE(t.source_file_name, '')
            FROM transactions t
            LEFT JOIN merchants m ON m.id = t.merchant_id
            WHERE 1 = 1
            "#,
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(aid) = opts.account_id {
            sql.push_str(" AND t.account_id = ?");
            params_vec.push(Box::new(aid));
        }
        if let Some(from) = opts.from {
            sql.push_str(" AND t.date >= ?");
            params_vec.push(Box::new(from.to_string()));
        }
        if let Some(to) = opts.to {
            sql.push_str(" AND t.date <= ?");
            params_vec.push(Box::new(to.to_string()));
        }
        sql.push_str(" ORDER BY t.date ASC, t.id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(ExportRow {
                    date: row.get(0)?,
                    merchant: row.get(1)?,
                    amount: row.get(2)?,
                    transaction_type: row.get(3)?,
                    recurring: row.get(4)?,
                    source_file: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Export transactions to CSV text
    pub fn export_transactions_csv(&self, opts: &ExportOptions) -> Result<String> {
        let rows = self.export_transactions(opts)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        // Explicit header row, so an export matching nothing is still a
        // valid CSV
        writer.write_record(["date", "merchant", "amount", "type", "recurring", "source_file"])?;
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Import(format!("CSV buffer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV not UTF-8: {}", e)))
    }

    /// Export a full database backup
    pub fn export_full_backup(&self) -> Result<FullBackup> {
        let accounts = self.list_accounts()?;
        let merchants = self.list_merchants()?;
        let subscriptions = self.list_subscriptions(None)?;
        let transactions = self.list_transactions(None, i64::MAX, 0)?;

        let total_records =
            accounts.len() + merchants.len() + subscriptions.len() + transactions.len();

        Ok(FullBackup {
            metadata: BackupMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: Utc::now().to_rfc3339(),
                total_records: total_records as i64,
            },
            accounts,
            merchants,
            subscriptions,
            transactions,
        })
    }

    /// Import a full backup, preserving row ids.
    ///
    /// Clears existing data first when `clear_existing` is true. Tables are
    /// restored in dependency order (accounts, merchants, subscriptions,
    /// transactions).
    pub fn import_full_backup(
        &self,
        backup: &FullBackup,
        clear_existing: bool,
    ) -> Result<RestoreStats> {
        use rusqlite::params;

        let conn = self.conn()?;

        if clear_existing {
            conn.execute_batch(
                r#"
                DELETE FROM transactions;
                DELETE FROM subscriptions;
                DELETE FROM merchants;
                DELETE FROM accounts;
                "#,
            )?;
        }

        let mut stats = RestoreStats::default();

        for account in &backup.accounts {
            conn.execute(
                "INSERT INTO accounts (id, name, account_type, currency, pdf_password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.id,
                    account.name,
                    account.account_type.map(|t| t.as_str()),
                    account.currency,
                    account.pdf_password,
                    sqlite_datetime(&account.created_at),
                ],
            )?;
            stats.accounts += 1;
        }

        for merchant in &backup.merchants {
            conn.execute(
                "INSERT INTO merchants (id, normalized_name, variants, transaction_count,
                                        total_spent, category_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    merchant.id,
                    merchant.normalized_name,
                    serde_json::to_string(&merchant.variants)?,
                    merchant.transaction_count,
                    merchant.total_spent,
                    merchant.category_id,
                    sqlite_datetime(&merchant.created_at),
                ],
            )?;
            stats.merchants += 1;
        }

        for sub in &backup.subscriptions {
            conn.execute(
                "INSERT INTO subscriptions (id, merchant_id, account_id, billing_frequency,
                                            average_amount, last_amount, first_charge_date,
                                            last_charge_date, next_expected_date, status,
                                            price_history, is_confirmed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    sub.id,
                    sub.merchant_id,
                    sub.account_id,
                    sub.billing_frequency.as_str(),
                    sub.average_amount,
                    sub.last_amount,
                    sub.first_charge_date.to_string(),
                    sub.last_charge_date.to_string(),
                    sub.next_expected_date.map(|d| d.to_string()),
                    sub.status.as_str(),
                    serde_json::to_string(&sub.price_history)?,
                    sub.is_confirmed,
                    sqlite_datetime(&sub.created_at),
                ],
            )?;
            stats.subscriptions += 1;
        }

        for tx in &backup.transactions {
            conn.execute(
                "INSERT INTO transactions (id, account_id, date, merchant_raw, merchant_id,
                                           category_id, subscription_id, amount, transaction_type,
                                           confidence_score, description, source_file_name,
                                           is_recurring, transaction_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    tx.id,
                    tx.account_id,
                    tx.date.to_string(),
                    tx.merchant_raw,
                    tx.merchant_id,
                    tx.category_id,
                    tx.subscription_id,
                    tx.amount,
                    tx.transaction_type.as_str(),
                    tx.confidence_score,
                    tx.description,
                    tx.source_file_name,
                    tx.is_recurring,
                    tx.transaction_hash,
                    sqlite_datetime(&tx.created_at),
                ],
            )?;
            stats.transactions += 1;
        }

        Ok(stats)
    }
}

fn sqlite_datetime(dt: &chrono::DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Backup metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Application version that created the backup
    pub version: String,
    /// When the backup was created
    pub created_at: String,
    /// Total number of records in backup
    pub total_records: i64,
}

/// Full database backup structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullBackup {
    pub metadata: BackupMetadata,
    pub accounts: Vec<Account>,
    pub merchants: Vec<Merchant>,
    pub subscriptions: Vec<Subscription>,
    pub transactions: Vec<Transaction>,
}

/// Counts of restored rows per table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreStats {
    pub accounts: i64,
    pub merchants: i64,
    pub subscriptions: i64,
    pub transactions: i64,
}
