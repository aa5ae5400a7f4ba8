//! Subscription operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewSubscription, PricePoint, Subscription, SubscriptionStatus};

fn price_history_from_json(json: &str) -> Vec<PricePoint> {
    serde_json::from_str(json).unwrap_or_default()
}

impl Database {
    /// Insert a new subscription record (status active, unconfirmed)
    pub fn insert_subscription(&self, sub: &NewSubscription) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO subscriptions (merchant_id, account_id, billing_frequency, average_amount,
                                       last_amount, first_charge_date, last_charge_date,
                                       next_expected_date, status, price_history)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?)
            "#,
            params![
                sub.merchant_id,
                sub.account_id,
                sub.billing_frequency.as_str(),
                sub.average_amount,
                sub.last_amount,
                sub.first_charge_date.to_string(),
                sub.last_charge_date.to_string(),
                sub.next_expected_date.map(|d| d.to_string()),
                serde_json::to_string(&sub.price_history)?,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Check whether a subscription already references this merchant for
    /// this account. The detector calls this before proposing.
    pub fn subscription_exists_for_merchant(
        &self,
        merchant_id: i64,
        account_id: Option<i64>,
    ) -> Result<bool> {
        let conn = self.conn()?;

        let count: i64 = match account_id {
            Some(aid) => conn.query_row(
                "SELECT COUNT(*) FROM subscriptions WHERE merchant_id = ? AND (account_id = ? OR account_id IS NULL)",
                params![merchant_id, aid],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM subscriptions WHERE merchant_id = ?",
                params![merchant_id],
                |row| row.get(0),
            )?,
        };

        Ok(count > 0)
    }

    /// List subscriptions, optionally filtered by account
    pub fn list_subscriptions(&self, account_id: Option<i64>) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;

        let (sql, params_vec): (String, Vec<Box<dyn rusqlite::ToSql>>) =
            if let Some(aid) = account_id {
                (
                    format!(
                        "{} WHERE account_id = ? ORDER BY last_charge_date DESC",
                        SELECT_SUBSCRIPTION
                    ),
                    vec![Box::new(aid)],
                )
            } else {
                (
                    format!("{} ORDER BY last_charge_date DESC", SELECT_SUBSCRIPTION),
                    vec![],
                )
            };

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let subscriptions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_subscription)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subscriptions)
    }

    /// List only active subscriptions (metrics input)
    pub fn list_active_subscriptions(&self, account_id: Option<i64>) -> Result<Vec<Subscription>> {
        Ok(self
            .list_subscriptions(account_id)?
            .into_iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .collect())
    }

    /// Get a subscription by ID
    pub fn get_subscription(&self, id: i64) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let sub = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_SUBSCRIPTION),
                params![id],
                Self::row_to_subscription,
            )
            .optional()?;
        Ok(sub)
    }

    /// Update subscription status
    pub fn update_subscription_status(&self, id: i64, status: SubscriptionStatus) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE subscriptions SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    /// Mark a detected subscription as user-confirmed
    pub fn confirm_subscription(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE subscriptions SET is_confirmed = 1 WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    /// Delete a subscription and unlink its transactions
    pub fn delete_subscription(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| {
            conn.execute(
                "UPDATE transactions SET subscription_id = NULL, is_recurring = 0 WHERE subscription_id = ?",
                params![id],
            )?;
            conn.execute("DELETE FROM subscriptions WHERE id = ?", params![id])?;
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

    pub(crate) fn row_to_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
        let frequency_str: String = row.get(3)?;
        let first_str: String = row.get(6)?;
        let last_str: String = row.get(7)?;
        let next_str: Option<String> = row.get(8)?;
        let status_str: String = row.get(9)?;
        let history_json: String = row.get(10)?;
        let created_at_str: String = row.get(12)?;

        Ok(Subscription {
            id: row.get(0)?,
            merchant_id: row.get(1)?,
            account_id: row.get(2)?,
            billing_frequency: frequency_str
                .parse()
                .unwrap_or(crate::models::BillingFrequency::Monthly),
            average_amount: row.get(4)?,
            last_amount: row.get(5)?,
            first_charge_date: parse_date(&first_str),
            last_charge_date: parse_date(&last_str),
            next_expected_date: next_str.map(|s| parse_date(&s)),
            status: status_str.parse().unwrap_or(SubscriptionStatus::Active),
            price_history: price_history_from_json(&history_json),
            is_confirmed: row.get(11)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

const SELECT_SUBSCRIPTION: &str = r#"
    SELECT id, merchant_id, account_id, billing_frequency, average_amount, last_amount,
           first_charge_date, last_charge_date, next_expected_date, status, price_history,
           is_confirmed, created_at
    FROM subscriptions
"#;
