//! Account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, AccountType};

impl Database {
    /// Create or get an account by name
    pub fn upsert_account(
        &self,
        name: &str,
        account_type: Option<AccountType>,
        currency: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO accounts (name, account_type, currency) VALUES (?, ?, ?)",
            params![
                name,
                account_type.map(|t| t.as_str()),
                currency.unwrap_or("INR"),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, account_type, currency, pdf_password, created_at FROM accounts ORDER BY name",
        )?;

        let accounts = stmt
            .query_map([], |row| {
                let account_type_str: Option<String> = row.get(2)?;
                let created_at_str: String = row.get(5)?;

                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    account_type: account_type_str.and_then(|s| s.parse().ok()),
                    currency: row.get(3)?,
                    pdf_password: row.get(4)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, name, account_type, currency, pdf_password, created_at FROM accounts WHERE id = ?",
                params![id],
                |row| {
                    let account_type_str: Option<String> = row.get(2)?;
                    let created_at_str: String = row.get(5)?;

                    Ok(Account {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        account_type: account_type_str.and_then(|s| s.parse().ok()),
                        currency: row.get(3)?,
                        pdf_password: row.get(4)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;

        Ok(account)
    }

    /// Set or clear the stored statement password for an account
    pub fn update_account_password(&self, id: i64, pdf_password: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET pdf_password = ? WHERE id = ?",
            params![pdf_password, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Account {} does not exist", id)));
        }
        Ok(())
    }

    /// Delete an account and all its transactions and subscriptions
    pub fn delete_account(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        // Use explicit transaction for atomicity
        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            conn.execute(
                "DELETE FROM subscriptions WHERE account_id = ?",
                params![id],
            )?;
            conn.execute("DELETE FROM transactions WHERE account_id = ?", params![id])?;
            conn.execute("DELETE FROM accounts WHERE id = ?", params![id])?;
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
}
