//! Merchant identity registry
//!
//! Raw statement spellings are folded into canonical identities here. The
//! variants column holds the raw strings known to map to an identity, stored
//! as a JSON array with case-insensitive set semantics.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Merchant;
use crate::normalize::normalize_merchant;

fn variants_from_json(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn variants_to_json(variants: &[String]) -> Result<String> {
    Ok(serde_json::to_string(variants)?)
}

/// Case-insensitive set insert; returns true if the variant was new
fn add_variant(variants: &mut Vec<String>, raw: &str) -> bool {
    if variants.iter().any(|v| v.eq_ignore_ascii_case(raw)) {
        return false;
    }
    variants.push(raw.to_string());
    true
}

impl Database {
    /// Resolve a raw merchant string to an identity, creating one if needed.
    ///
    /// Lookup order: case-insensitive match on the normalized name, then a
    /// scan of every merchant's variants for the raw string (some variant
    /// spellings don't round-trip through normalization). Idempotent:
    /// resolving the same raw string twice returns the same id and never
    /// duplicates a variant entry.
    pub fn resolve_or_create_merchant(&self, raw: &str, category_id: Option<i64>) -> Result<i64> {
        let normalized = normalize_merchant(raw);
        let conn = self.conn()?;

        let by_name: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, variants FROM merchants WHERE normalized_name = ? COLLATE NOCASE",
                params![normalized],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let found = match by_name {
            Some(hit) => Some(hit),
            None => self.scan_variants_for(raw, &conn)?,
        };

        if let Some((id, variants_json)) = found {
            let mut variants = variants_from_json(&variants_json);
            if add_variant(&mut variants, raw) {
                conn.execute(
                    "UPDATE merchants SET variants = ? WHERE id = ?",
                    params![variants_to_json(&variants)?, id],
                )?;
            }
            return Ok(id);
        }

        let variants = variants_to_json(&[raw.to_string()])?;
        conn.execute(
            "INSERT INTO merchants (normalized_name, variants, category_id) VALUES (?, ?, ?)",
            params![normalized, variants, category_id],
        )?;
        let id = conn.last_insert_rowid();
        debug!(merchant_id = id, name = %normalized, "created merchant identity");
        Ok(id)
    }

    /// Scan all merchants' variant lists for a raw string.
    ///
    /// O(merchants) per call; acceptable for a personal-finance-sized
    /// merchant table.
    fn scan_variants_for(
        &self,
        raw: &str,
        conn: &super::DbConn,
    ) -> Result<Option<(i64, String)>> {
        let mut stmt = conn.prepare("SELECT id, variants FROM merchants")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (id, variants_json) in rows {
            let variants = variants_from_json(&variants_json);
            if variants.iter().any(|v| v.eq_ignore_ascii_case(raw)) {
                return Ok(Some((id, variants_json)));
            }
        }
        Ok(None)
    }

    /// Get a merchant by ID
    pub fn get_merchant(&self, id: i64) -> Result<Option<Merchant>> {
        let conn = self.conn()?;
        let merchant = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_MERCHANT),
                params![id],
                Self::row_to_merchant,
            )
            .optional()?;
        Ok(merchant)
    }

    /// Find a merchant by its canonical name, case-insensitively
    pub fn find_merchant_by_name(&self, normalized_name: &str) -> Result<Option<Merchant>> {
        let conn = self.conn()?;
        let merchant = conn
            .query_row(
                &format!(
                    "{} WHERE normalized_name = ? COLLATE NOCASE",
                    SELECT_MERCHANT
                ),
                params![normalized_name],
                Self::row_to_merchant,
            )
            .optional()?;
        Ok(merchant)
    }

    /// List all merchants, heaviest first
    pub fn list_merchants(&self) -> Result<Vec<Merchant>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY transaction_count DESC, normalized_name ASC",
            SELECT_MERCHANT
        ))?;

        let merchants = stmt
            .query_map([], Self::row_to_merchant)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(merchants)
    }

    /// Bump a merchant's running stats after an insert. Debit amounts add to
    /// `total_spent`; credits only bump the count.
    pub fn update_merchant_stats(&self, id: i64, spent_delta: f64, count_delta: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE merchants SET total_spent = total_spent + ?, transaction_count = transaction_count + ? WHERE id = ?",
            params![spent_delta, count_delta, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Merchant {} does not exist", id)));
        }
        Ok(())
    }

    /// Merge source merchant identities into a target.
    ///
    /// Unions variants (set semantics), re-points every transaction from the
    /// sources to the target, sums stats, then deletes the sources. Runs in
    /// one SQL transaction so no transaction is ever left pointing at a
    /// deleted identity.
    pub fn merge_merchants(&self, target_id: i64, source_ids: &[i64]) -> Result<()> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| {
            let target: Option<(String, i64, f64)> = conn
                .query_row(
                    "SELECT variants, transaction_count, total_spent FROM merchants WHERE id = ?",
                    params![target_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let (variants_json, mut count, mut spent) = target
                .ok_or_else(|| Error::NotFound(format!("Merchant {} does not exist", target_id)))?;
            let mut variants = variants_from_json(&variants_json);

            for source_id in source_ids {
                if *source_id == target_id {
                    continue;
                }
                let source: Option<(String, i64, f64)> = conn
                    .query_row(
                        "SELECT variants, transaction_count, total_spent FROM merchants WHERE id = ?",
                        params![source_id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                let (source_variants_json, source_count, source_spent) = source.ok_or_else(|| {
                    Error::NotFound(format!("Merchant {} does not exist", source_id))
                })?;

                for variant in variants_from_json(&source_variants_json) {
                    add_variant(&mut variants, &variant);
                }
                count += source_count;
                spent += source_spent;

                conn.execute(
                    "UPDATE transactions SET merchant_id = ? WHERE merchant_id = ?",
                    params![target_id, source_id],
                )?;
                conn.execute(
                    "UPDATE subscriptions SET merchant_id = ? WHERE merchant_id = ?",
                    params![target_id, source_id],
                )?;
                conn.execute("DELETE FROM merchants WHERE id = ?", params![source_id])?;
            }

            conn.execute(
                "UPDATE merchants SET variants = ?, transaction_count = ?, total_spent = ? WHERE id = ?",
                params![variants_to_json(&variants)?, count, spent, target_id],
            )?;
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

    pub(crate) fn row_to_merchant(row: &Row<'_>) -> rusqlite::Result<Merchant> {
        let variants_json: String = row.get(2)?;
        let created_at_str: String = row.get(6)?;

        Ok(Merchant {
            id: row.get(0)?,
            normalized_name: row.get(1)?,
            variants: variants_from_json(&variants_json),
            transaction_count: row.get(3)?,
            total_spent: row.get(4)?,
            category_id: row.get(5)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

const SELECT_MERCHANT: &str = r#"
    SELECT id, normalized_name, variants, transaction_count, total_spent, category_id, created_at
    FROM merchants
"#;
