//! Domain models for kosh

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: Option<AccountType>,
    pub currency: String,
    /// Password used when resubmitting this account's protected statements
    /// to the document processor
    pub pdf_password: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Account types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction direction. The amount itself is always non-negative; the sign
/// lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" | "dr" => Ok(Self::Debit),
            "credit" | "cr" => Ok(Self::Credit),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An extracted-but-unpersisted transaction, pending confidence scoring and
/// the dedup check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTransaction {
    pub date: NaiveDate,
    /// Unmodified extracted merchant text (post whitespace cleanup)
    pub merchant_raw: String,
    /// Absolute value, always non-negative
    pub amount: f64,
    pub transaction_type: TransactionType,
    /// Extraction confidence in [0, 100]
    pub confidence_score: f64,
    pub description: Option<String>,
}

/// A new transaction ready for insertion (hash already computed)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub date: NaiveDate,
    pub merchant_raw: String,
    pub merchant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub confidence_score: f64,
    pub description: Option<String>,
    pub source_file_name: Option<String>,
    pub transaction_hash: String,
}

/// A persisted financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    pub merchant_raw: String,
    /// Resolved merchant identity, if any
    pub merchant_id: Option<i64>,
    pub category_id: Option<i64>,
    /// Set when this charge was recognized as part of a subscription
    pub subscription_id: Option<i64>,
    /// Always non-negative; direction is in `transaction_type`
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub confidence_score: f64,
    pub description: Option<String>,
    /// Provenance: statement file this row came from
    pub source_file_name: Option<String>,
    pub is_recurring: bool,
    /// Content hash over (account, calendar day, amount, merchant residue)
    pub transaction_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A merchant identity: one canonical name plus the raw statement spellings
/// known to map to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: i64,
    /// Canonical display name, unique case-insensitively
    pub normalized_name: String,
    /// Raw strings known to resolve to this identity (set semantics)
    pub variants: Vec<String>,
    pub transaction_count: i64,
    /// Sum of debit amounts
    pub total_spent: f64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Billing cadence of a detected subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingFrequency {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl BillingFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }

    /// Factor that converts one charge at this cadence to a monthly cost
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 4.33,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::Annual => 1.0 / 12.0,
        }
    }

    /// Advance a charge date by one billing period
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => date + chrono::Duration::days(7),
            Self::Monthly => date + chrono::Months::new(1),
            Self::Quarterly => date + chrono::Months::new(3),
            Self::Annual => date + chrono::Months::new(12),
        }
    }
}

impl std::str::FromStr for BillingFrequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annual" | "yearly" => Ok(Self::Annual),
            _ => Err(format!("Unknown billing frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observed charge in a subscription's price history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub amount: f64,
}

/// A detected (or manually created) recurring charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub merchant_id: i64,
    pub account_id: Option<i64>,
    pub billing_frequency: BillingFrequency,
    pub average_amount: f64,
    pub last_amount: f64,
    pub first_charge_date: NaiveDate,
    pub last_charge_date: NaiveDate,
    pub next_expected_date: Option<NaiveDate>,
    pub status: SubscriptionStatus,
    pub price_history: Vec<PricePoint>,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// A subscription ready for persistence: a detector proposal the user has
/// accepted, or a manual entry. Status starts `active` and unconfirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub merchant_id: i64,
    pub account_id: Option<i64>,
    pub billing_frequency: BillingFrequency,
    pub average_amount: f64,
    pub last_amount: f64,
    pub first_charge_date: NaiveDate,
    pub last_charge_date: NaiveDate,
    pub next_expected_date: Option<NaiveDate>,
    pub price_history: Vec<PricePoint>,
}

/// A structurally addressable failure within a batch parse. Collected and
/// returned alongside successes; never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based line number in the source input
    pub line: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn billing_frequency_round_trip() {
        for f in [
            BillingFrequency::Weekly,
            BillingFrequency::Monthly,
            BillingFrequency::Quarterly,
            BillingFrequency::Annual,
        ] {
            assert_eq!(f.as_str().parse::<BillingFrequency>().unwrap(), f);
        }
        assert_eq!(
            "yearly".parse::<BillingFrequency>().unwrap(),
            BillingFrequency::Annual
        );
    }

    #[test]
    fn frequency_advance() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            BillingFrequency::Weekly.advance(d),
            NaiveDate::from_ymd_opt(2024, 2, 7).unwrap()
        );
        // Month arithmetic clamps to the end of shorter months
        assert_eq!(
            BillingFrequency::Monthly.advance(d),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            BillingFrequency::Annual.advance(d),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
    }

    #[test]
    fn transaction_type_from_suffix() {
        assert_eq!("CR".parse::<TransactionType>(), Ok(TransactionType::Credit));
        assert_eq!("dr".parse::<TransactionType>(), Ok(TransactionType::Debit));
        assert!("xyz".parse::<TransactionType>().is_err());
    }
}
