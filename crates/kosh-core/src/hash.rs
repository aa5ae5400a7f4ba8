//! Content-addressed transaction fingerprinting.
//!
//! The hash is intentionally coarser than exact string equality: the calendar
//! day (time-of-day discarded) and an alphanumeric-only lowercase merchant
//! residue go into the digest, so "Amazon.com" and "AMAZON COM" on the same
//! day for the same amount collapse to one fingerprint.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Lowercase and strip everything non-alphanumeric.
fn merchant_residue(merchant_raw: &str) -> String {
    merchant_raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Compute the deduplication fingerprint for a transaction.
///
/// Deterministic over (account, calendar day, amount, merchant residue);
/// rendered as lowercase hex.
pub fn transaction_hash(account_id: i64, date: NaiveDate, amount: f64, merchant_raw: &str) -> String {
    let canonical = format!(
        "{}|{}|{}|{}",
        account_id,
        date.format("%Y-%m-%d"),
        amount,
        merchant_residue(merchant_raw)
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formatting_differences_collapse() {
        let a = transaction_hash(1, day(2024, 3, 15), 45.99, "Amazon.com");
        let b = transaction_hash(1, day(2024, 3, 15), 45.99, "AMAZON COM");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn distinct_inputs_differ() {
        let base = transaction_hash(1, day(2024, 3, 15), 45.99, "Amazon.com");
        assert_ne!(base, transaction_hash(1, day(2024, 3, 15), 46.99, "Amazon.com"));
        assert_ne!(base, transaction_hash(2, day(2024, 3, 15), 45.99, "Amazon.com"));
        assert_ne!(base, transaction_hash(1, day(2024, 3, 16), 45.99, "Amazon.com"));
        assert_ne!(base, transaction_hash(1, day(2024, 3, 15), 45.99, "Flipkart"));
    }
}
