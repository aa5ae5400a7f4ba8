//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, load_config)
//! - `import` - Statement import commands (CSV/text import, document processing, export)
//! - `merchants` - Merchant registry commands (list, merge)
//! - `status` - Status/accounts/transactions commands
//! - `subscriptions` - Detection and subscription management commands

pub mod core;
pub mod import;
pub mod merchants;
pub mod status;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use merchants::*;
pub use status::*;
pub use subscriptions::*;

use anyhow::Result;
use kosh_core::db::Database;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. Counts chars, not bytes, so multibyte merchant names cut
/// cleanly.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Look up an existing account by name
pub fn resolve_account(db: &Database, name: &str) -> Result<i64> {
    let accounts = db.list_accounts()?;
    accounts
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .map(|a| a.id)
        .ok_or_else(|| anyhow::anyhow!("Account not found: {} (run 'kosh accounts')", name))
}
