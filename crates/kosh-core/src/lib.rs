//! Kosh Core Library
//!
//! Shared functionality for the kosh personal finance tracker:
//! - Statement extraction (free-text lines and CSV rows)
//! - Merchant normalization and the identity registry
//! - Content-addressed transaction deduplication
//! - Confidence scoring heuristics
//! - Interval-variance subscription detection
//! - Encrypted SQLite persistence and migrations
//! - Client for the remote document processor service

pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod events;
pub mod export;
pub mod extract;
pub mod hash;
pub mod import;
pub mod models;
pub mod normalize;
pub mod score;
pub mod service;

pub use config::{CoreConfig, DetectionConfig, ScoringConfig};
pub use db::Database;
pub use detect::{
    detect_subscriptions, save_detected_subscriptions, subscription_metrics, SubscriptionMetrics,
    SubscriptionProposal,
};
pub use error::{Error, Result};
pub use events::{ChangeEvent, ChangeNotifier};
pub use export::{ExportOptions, ExportRow, FullBackup, RestoreStats};
pub use extract::{
    extract_transaction_line, parse_amount, parse_date, process_csv_content, process_text_content,
    CsvColumnMap, ExtractionBatch,
};
pub use hash::transaction_hash;
pub use import::{import_candidates, import_csv, import_text, ImportOptions, ImportSummary};
pub use normalize::normalize_merchant;
pub use score::score_confidence;
pub use service::{ProcessorClient, ProcessResponse, ServiceHealth};
