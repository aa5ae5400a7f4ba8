//! Status-related command implementations (status, accounts, transactions)

use std::path::Path;

use anyhow::Result;
use kosh_core::{Database, ProcessorClient};

use super::{open_db, resolve_account, truncate};

pub async fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use kosh_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Kosh Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Try to open the database and show counts
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                println!();
                println!("   Accounts: {}", db.list_accounts()?.len());
                println!("   Transactions: {}", db.count_transactions(None)?);
                println!(
                    "   Active subscriptions: {}",
                    db.list_active_subscriptions(None)?.len()
                );
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    // Processor service reachability
    let client = ProcessorClient::from_env();
    println!();
    println!("   Processor service: {}", client.base_url());
    match client.health().await {
        Ok(health) => {
            println!("   ✅ Service status: {}", health.status);
            if health.docling_available {
                println!("   🤖 Advanced extraction: available");
            } else {
                println!("   💡 Advanced extraction: unavailable (pattern fallback)");
            }
        }
        Err(e) => println!("   ❌ Service unreachable: {}", e),
    }

    println!();
    Ok(())
}

pub fn cmd_accounts(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;
    let accounts = db.list_accounts()?;

    if accounts.is_empty() {
        println!("No accounts found. Import transactions with:");
        println!("  kosh import --file statement.csv --account hdfc");
        return Ok(());
    }

    println!();
    println!("📁 Accounts");
    println!("   ─────────────────────────────");

    for account in accounts {
        let kind = account
            .account_type
            .map(|t| t.as_str())
            .unwrap_or("unknown");
        println!(
            "   [{:>3}] {} ({}, {})",
            account.id, account.name, kind, account.currency
        );
    }

    Ok(())
}

pub fn cmd_transactions_list(db: &Database, limit: i64, account: Option<&str>) -> Result<()> {
    let account_id = account.map(|name| resolve_account(db, name)).transpose()?;
    let transactions = db.list_transactions(account_id, limit, 0)?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!();
    println!("💳 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let sign = match tx.transaction_type {
            kosh_core::models::TransactionType::Debit => "-",
            kosh_core::models::TransactionType::Credit => "+",
        };
        let recurring = if tx.is_recurring { " 🔁" } else { "" };
        println!(
            "   [{:>5}] {} │ {:25} │ {}₹{:>9.2}{}",
            tx.id,
            tx.date,
            truncate(&tx.merchant_raw, 25),
            sign,
            tx.amount,
            recurring
        );
    }

    Ok(())
}
