//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kosh - Track spending and surface recurring charges
#[derive(Parser)]
#[command(name = "kosh")]
#[command(about = "Self-hosted personal finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "kosh.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set KOSH_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Path to a TOML config file overriding the built-in detection
    /// and scoring defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from a statement file (CSV or plain text)
    Import {
        /// File to import
        #[arg(short, long)]
        file: PathBuf,

        /// Account name (created on first use)
        #[arg(short, long)]
        account: String,

        /// File format: auto, csv, text
        #[arg(long, default_value = "auto")]
        format: String,

        /// Keep rows whose fingerprint already exists
        #[arg(long)]
        allow_duplicates: bool,

        /// CSV column index holding the date
        #[arg(long, default_value = "0")]
        date_col: usize,

        /// CSV column index holding the description
        #[arg(long, default_value = "1")]
        description_col: usize,

        /// CSV column index holding the amount
        #[arg(long, default_value = "2")]
        amount_col: usize,

        /// Optional CSV column index holding a debit/credit marker
        #[arg(long)]
        type_col: Option<usize>,
    },

    /// Send a document (e.g. PDF statement) to the processor service
    /// and import the extracted transactions
    Process {
        /// Document to process
        #[arg(short, long)]
        file: PathBuf,

        /// Account name (created on first use)
        #[arg(short, long)]
        account: String,

        /// Password for protected PDFs (falls back to the account's
        /// stored password)
        #[arg(long)]
        password: Option<String>,

        /// Keep rows whose fingerprint already exists
        #[arg(long)]
        allow_duplicates: bool,
    },

    /// Detect recurring charges and save them as subscriptions
    Detect {
        /// Restrict detection to one account
        #[arg(short, long)]
        account: Option<String>,

        /// Show proposals without saving them
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage subscriptions
    Subscriptions {
        #[command(subcommand)]
        action: Option<SubscriptionsAction>,
    },

    /// Show monthly and annual subscription cost
    Metrics {
        /// Restrict to one account
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Manage merchants
    Merchants {
        #[command(subcommand)]
        action: Option<MerchantsAction>,
    },

    /// List accounts
    Accounts,

    /// List recent transactions
    Transactions {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Restrict to one account
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Show database and processor service status
    Status,

    /// Export a full database backup to JSON
    Backup {
        /// Output file (required)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Restore a JSON backup
    Restore {
        /// JSON backup file to restore from
        #[arg(short, long)]
        file: PathBuf,

        /// Clear all existing data before restoring
        #[arg(long)]
        clear: bool,
    },

    /// Export transactions to CSV
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Restrict to one account
        #[arg(short, long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// List all subscriptions
    List,

    /// Confirm a detected subscription
    Confirm {
        /// Subscription ID
        id: i64,
    },

    /// Pause a subscription
    Pause {
        /// Subscription ID
        id: i64,
    },

    /// Resume a paused subscription
    Resume {
        /// Subscription ID
        id: i64,
    },

    /// Mark a subscription as cancelled
    Cancel {
        /// Subscription ID
        id: i64,
    },

    /// Delete a subscription (its transactions are kept, unlinked)
    Delete {
        /// Subscription ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum MerchantsAction {
    /// List merchants by transaction count
    List {
        /// Number of merchants to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Merge merchants into a target identity
    Merge {
        /// Target merchant ID (survives the merge)
        #[arg(long)]
        into: i64,

        /// Source merchant IDs (deleted after the merge)
        sources: Vec<i64>,
    },
}
