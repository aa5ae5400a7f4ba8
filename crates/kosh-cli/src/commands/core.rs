//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Shared utility to load detection/scoring config
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use kosh_core::{CoreConfig, Database};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_str().unwrap();
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load config, applying an optional override file over the built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<CoreConfig> {
    CoreConfig::load(path).context("Failed to load config")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: kosh import --file statement.csv --account hdfc");
    println!("  2. Detect recurring charges: kosh detect");

    Ok(())
}
