//! Transaction operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionType};

impl Database {
    /// Insert a transaction with the dedup check.
    ///
    /// Looks up the content hash first; a hit is rejected as
    /// [`Error::Duplicate`] unless `allow_duplicate` is set, which a caller
    /// passes only after a human has reviewed and confirmed the item. Batch
    /// paths catch the rejection per item and count it instead of aborting.
    pub fn insert_transaction(&self, tx: &NewTransaction, allow_duplicate: bool) -> Result<i64> {
        let conn = self.conn()?;

        if !allow_duplicate {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM transactions WHERE transaction_hash = ?",
                    params![tx.transaction_hash],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                return Err(Error::Duplicate {
                    hash: tx.transaction_hash.clone(),
                });
            }
        }

        conn.execute(
            r#"
            INSERT INTO transactions (account_id, date, merchant_raw, merchant_id, category_id,
                                      amount, transaction_type, confidence_score, description,
                                      source_file_name, transaction_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_id,
                tx.date.to_string(),
                tx.merchant_raw,
                tx.merchant_id,
                tx.category_id,
                tx.amount,
                tx.transaction_type.as_str(),
                tx.confidence_score,
                tx.description,
                tx.source_file_name,
                tx.transaction_hash,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_TRANSACTION),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// List transactions, newest first, optionally filtered to one account
    pub fn list_transactions(
        &self,
        account_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let (sql, params_vec): (String, Vec<Box<dyn rusqlite::ToSql>>) =
            if let Some(aid) = account_id {
                (
                    format!(
                        "{} WHERE account_id = ? ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
                        SELECT_TRANSACTION
                    ),
                    vec![Box::new(aid), Box::new(limit), Box::new(offset)],
                )
            } else {
                (
                    format!(
                        "{} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
                        SELECT_TRANSACTION
                    ),
                    vec![Box::new(limit), Box::new(offset)],
                )
            };

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Load all debit transactions, date ascending, optionally filtered to
    /// one account. This is the detector's input set.
    pub fn list_debit_transactions(&self, account_id: Option<i64>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let (sql, params_vec): (String, Vec<Box<dyn rusqlite::ToSql>>) =
            if let Some(aid) = account_id {
                (
                    format!(
                        "{} WHERE transaction_type = 'debit' AND account_id = ? ORDER BY date ASC, id ASC",
                        SELECT_TRANSACTION
                    ),
                    vec![Box::new(aid)],
                )
            } else {
                (
                    format!(
                        "{} WHERE transaction_type = 'debit' ORDER BY date ASC, id ASC",
                        SELECT_TRANSACTION
                    ),
                    vec![],
                )
            };

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions, optionally for one account
    pub fn count_transactions(&self, account_id: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match account_id {
            Some(aid) => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE account_id = ?",
                params![aid],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// Look up a transaction ID by content hash
    pub fn find_transaction_by_hash(&self, hash: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM transactions WHERE transaction_hash = ?",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Back-link a set of transactions to a subscription and flag them
    /// recurring. One SQL transaction; all links land or none do.
    pub fn mark_transactions_recurring(&self, ids: &[i64], subscription_id: i64) -> Result<()> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| {
            for id in ids {
                conn.execute(
                    "UPDATE transactions SET is_recurring = 1, subscription_id = ? WHERE id = ?",
                    params![subscription_id, id],
                )?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    pub(crate) fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let type_str: String = row.get(8)?;
        let created_at_str: String = row.get(14)?;

        Ok(Transaction {
            id: row.get(0)?,
            account_id: row.get(1)?,
            date: parse_date(&date_str),
            merchant_raw: row.get(3)?,
            merchant_id: row.get(4)?,
            category_id: row.get(5)?,
            subscription_id: row.get(6)?,
            amount: row.get(7)?,
            transaction_type: type_str.parse().unwrap_or(TransactionType::Debit),
            confidence_score: row.get(9)?,
            description: row.get(10)?,
            source_file_name: row.get(11)?,
            is_recurring: row.get(12)?,
            transaction_hash: row.get(13)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

const SELECT_TRANSACTION: &str = r#"
    SELECT id, account_id, date, merchant_raw, merchant_id, category_id, subscription_id,
           amount, transaction_type, confidence_score, description, source_file_name,
           is_recurring, transaction_hash, created_at
    FROM transactions
"#;
