//! Confidence scoring heuristics.

use chrono::{Months, NaiveDate};

use crate::config::ScoringConfig;

/// Adjust a base extraction confidence with plausibility heuristics.
///
/// Pure function: bonuses for a plausible consumer-sized amount, a date in
/// the trailing recency window up to `today` inclusive, and a merchant string
/// of sane length. The result is clamped to 100; no floor clamp is needed
/// since inputs are non-negative.
pub fn score_confidence(
    base: f64,
    amount: f64,
    date: NaiveDate,
    merchant_raw: &str,
    today: NaiveDate,
    config: &ScoringConfig,
) -> f64 {
    let mut score = base;

    if amount > 0.0 && amount < config.plausible_amount_max {
        score += config.amount_bonus;
    }

    let window_start = today - Months::new(config.recency_months);
    if date >= window_start && date <= today {
        score += config.recency_bonus;
    }

    let len = merchant_raw.chars().count();
    if len >= config.merchant_len_min && len <= config.merchant_len_max {
        score += config.merchant_bonus;
    }

    score.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{CSV_BASE_CONFIDENCE, MANUAL_BASE_CONFIDENCE, TEXT_BASE_CONFIDENCE};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn all_bonuses_apply() {
        let today = day(2024, 3, 15);
        let score = score_confidence(
            TEXT_BASE_CONFIDENCE,
            45.99,
            today,
            "NETFLIX.COM",
            today,
            &ScoringConfig::default(),
        );
        assert_eq!(score, 90.0);
    }

    #[test]
    fn stale_and_future_dates_lose_recency_bonus() {
        let today = day(2024, 3, 15);
        let config = ScoringConfig::default();
        let stale = score_confidence(TEXT_BASE_CONFIDENCE, 45.99, day(2019, 1, 1), "NETFLIX", today, &config);
        assert_eq!(stale, 80.0);
        let future = score_confidence(TEXT_BASE_CONFIDENCE, 45.99, day(2024, 3, 16), "NETFLIX", today, &config);
        assert_eq!(future, 80.0);
        // Window start is inclusive
        let edge = score_confidence(TEXT_BASE_CONFIDENCE, 45.99, day(2022, 3, 15), "NETFLIX", today, &config);
        assert_eq!(edge, 90.0);
    }

    #[test]
    fn implausible_amount_and_merchant_lose_bonuses() {
        let today = day(2024, 3, 15);
        let config = ScoringConfig::default();
        let huge = score_confidence(CSV_BASE_CONFIDENCE, 250_000.0, today, "NETFLIX", today, &config);
        assert_eq!(huge, 100.0); // 90 + 10 + 5 clamps to 100; no amount bonus
        let zero = score_confidence(TEXT_BASE_CONFIDENCE, 0.0, today, "NETFLIX", today, &config);
        assert_eq!(zero, 85.0);
        let short = score_confidence(TEXT_BASE_CONFIDENCE, 45.99, today, "NF", today, &config);
        assert_eq!(short, 85.0);
    }

    #[test]
    fn clamped_at_100() {
        let today = day(2024, 3, 15);
        let score = score_confidence(
            MANUAL_BASE_CONFIDENCE,
            45.99,
            today,
            "NETFLIX.COM",
            today,
            &ScoringConfig::default(),
        );
        assert_eq!(score, 100.0);
    }
}
