//! Statement extraction: free-text lines and CSV rows into candidate
//! transactions.
//!
//! Both paths are best-effort batch parsers. A line that yields nothing is
//! skipped silently; a row that is addressable but broken (bad date, missing
//! description, non-numeric amount) becomes a [`RowError`] collected alongside
//! the successes. Errors are data, not control flow.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::models::{CandidateTransaction, RowError, TransactionType};

/// Base confidence for free-text extraction
pub const TEXT_BASE_CONFIDENCE: f64 = 70.0;
/// Base confidence for CSV extraction (structured data is trusted more)
pub const CSV_BASE_CONFIDENCE: f64 = 90.0;
/// Base confidence for manually entered transactions
pub const MANUAL_BASE_CONFIDENCE: f64 = 100.0;

/// Result of a batch extraction: successes plus per-row failures
#[derive(Debug, Default)]
pub struct ExtractionBatch {
    pub transactions: Vec<CandidateTransaction>,
    pub errors: Vec<RowError>,
}

/// How a date pattern's capture groups map onto a calendar date
#[derive(Debug, Clone, Copy)]
enum DateShape {
    /// MM/DD/YYYY
    MonthDayYear4,
    /// MM/DD/YY
    MonthDayYear2,
    /// YYYY-MM-DD
    YearMonthDay,
    /// DD-MM-YYYY
    DayMonthYear,
    /// "Mon DD, YYYY"
    MonthNameDayYear,
    /// "DD Mon YYYY"
    DayMonthNameYear,
}

/// Ordered date matcher table, compiled once on first use. Priority order
/// governs disambiguation: the 4-digit-year form wins over the 2-digit one
/// only because it is tried first.
fn date_patterns() -> &'static [(Regex, DateShape)] {
    static PATTERNS: OnceLock<Vec<(Regex, DateShape)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        const MON: &str = "jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec";
        [
            (r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b", DateShape::MonthDayYear4),
            (r"\b(\d{1,2})/(\d{1,2})/(\d{2})\b", DateShape::MonthDayYear2),
            (r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b", DateShape::YearMonthDay),
            (r"\b(\d{1,2})-(\d{1,2})-(\d{4})\b", DateShape::DayMonthYear),
            (
                &format!(r"(?i)\b({MON})[a-z]*\.?\s+(\d{{1,2}}),?\s+(\d{{4}})\b"),
                DateShape::MonthNameDayYear,
            ),
            (
                &format!(r"(?i)\b(\d{{1,2}})\s+({MON})[a-z]*\.?,?\s+(\d{{4}})\b"),
                DateShape::DayMonthNameYear,
            ),
        ]
        .iter()
        .map(|(pat, shape)| (Regex::new(pat).expect("static date pattern"), *shape))
        .collect()
    })
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

fn expand_two_digit_year(year: i32) -> i32 {
    if year < 50 {
        2000 + year
    } else {
        1900 + year
    }
}

fn date_from_captures(caps: &regex::Captures, shape: DateShape) -> Option<NaiveDate> {
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());
    let (year, month, day) = match shape {
        DateShape::MonthDayYear4 => (num(3)?, num(1)? as u32, num(2)? as u32),
        DateShape::MonthDayYear2 => (
            expand_two_digit_year(num(3)? as i32) as i64,
            num(1)? as u32,
            num(2)? as u32,
        ),
        DateShape::YearMonthDay => (num(1)?, num(2)? as u32, num(3)? as u32),
        DateShape::DayMonthYear => (num(3)?, num(2)? as u32, num(1)? as u32),
        DateShape::MonthNameDayYear => (num(3)?, month_number(&caps[1])?, num(2)? as u32),
        DateShape::DayMonthNameYear => (num(3)?, month_number(&caps[2])?, num(1)? as u32),
    };
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

/// Parse the first calendar-valid date found in `text`.
///
/// Patterns are tried in a fixed priority order; within one pattern the
/// left-most match that survives calendar validation wins. Absence of a date
/// is a valid "no result", not an error.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    for (regex, shape) in date_patterns() {
        for caps in regex.captures_iter(text) {
            if let Some(date) = date_from_captures(&caps, *shape) {
                return Some(date);
            }
        }
    }
    None
}

/// Ordered amount matcher table, compiled once on first use: `$1,234.56`,
/// then `1,234.56 CR/DR`, then `-$1,234.56`.
fn amount_patterns() -> &'static [(Regex, bool)] {
    static PATTERNS: OnceLock<Vec<(Regex, bool)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // bool: pattern carries a CR/DR suffix in capture group 2
        [
            (r"\$\s*(\d[\d,]*(?:\.\d{1,2})?)", false),
            (r"(?i)\b(\d[\d,]*\.\d{1,2})\s*(cr|dr)\b", true),
            (r"-\s*\$\s*(\d[\d,]*(?:\.\d{1,2})?)", false),
        ]
        .iter()
        .map(|(pat, suffixed)| (Regex::new(pat).expect("static amount pattern"), *suffixed))
        .collect()
    })
}

/// A parsed monetary amount
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedAmount {
    /// Absolute value; sign never lives here
    pub amount: f64,
    /// Direction, from an explicit CR/DR suffix or keyword/sign inference
    pub transaction_type: TransactionType,
}

/// Parse the first recognizable amount in `text` and infer its direction.
pub fn parse_amount(text: &str) -> Option<ParsedAmount> {
    for (regex, suffixed) in amount_patterns() {
        if let Some(caps) = regex.captures(text) {
            let cleaned: String = caps[1].replace([',', ' '], "");
            let value: f64 = match cleaned.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            if !f64::is_finite(value) {
                continue;
            }
            let suffix = if *suffixed {
                caps.get(2).and_then(|m| m.as_str().parse().ok())
            } else {
                None
            };
            return Some(ParsedAmount {
                amount: value.abs(),
                transaction_type: suffix.unwrap_or_else(|| infer_direction(text)),
            });
        }
    }
    None
}

/// Direction inference from the surrounding text: a standalone "cr" token,
/// "credit", "deposit", or a plus sign marks a credit; everything else is a
/// debit. ("cr" is matched as a whole token so that e.g. "Grocery" does not
/// read as a credit.)
fn infer_direction(text: &str) -> TransactionType {
    if text.contains('+') {
        return TransactionType::Credit;
    }
    static CREDIT_WORDS: OnceLock<Regex> = OnceLock::new();
    let credit_words = CREDIT_WORDS.get_or_init(|| {
        Regex::new(r"(?i)\b(cr|credit|deposit)\b").expect("static keyword pattern")
    });
    if credit_words.is_match(text) {
        TransactionType::Credit
    } else {
        TransactionType::Debit
    }
}

/// Remove every date-pattern and amount-pattern substring from `line`.
///
/// The minus-prefixed amount form is stripped before the bare `$` form so a
/// leading sign does not linger in the merchant text.
fn strip_matched_substrings(line: &str) -> String {
    let mut rest = line.to_string();
    for (regex, _) in date_patterns() {
        rest = regex.replace_all(&rest, " ").into_owned();
    }
    for (regex, _) in amount_patterns().iter().rev() {
        rest = regex.replace_all(&rest, " ").into_owned();
    }
    rest
}

/// Collapse whitespace and strip everything but word characters, hyphens and
/// periods.
fn clean_merchant_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                ' '
            }
        })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract zero or one candidate transaction from a free-text statement line.
///
/// Both a date and an amount must be present; the remaining text becomes the
/// raw merchant string. Lines whose cleaned merchant text is shorter than two
/// characters are treated as false positives (page headers and the like).
pub fn extract_transaction_line(line: &str) -> Option<CandidateTransaction> {
    let date = parse_date(line)?;
    let parsed = parse_amount(line)?;

    let merchant_raw = clean_merchant_text(&strip_matched_substrings(line));
    if merchant_raw.chars().count() < 2 {
        return None;
    }

    Some(CandidateTransaction {
        date,
        merchant_raw,
        amount: parsed.amount,
        transaction_type: parsed.transaction_type,
        confidence_score: TEXT_BASE_CONFIDENCE,
        description: None,
    })
}

/// Run line extraction over a whole statement text.
///
/// Unparseable lines are skipped; nothing in here raises for a bad line.
pub fn process_text_content(text: &str) -> ExtractionBatch {
    let mut batch = ExtractionBatch::default();
    let mut skipped = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match extract_transaction_line(line) {
            Some(tx) => batch.transactions.push(tx),
            None => skipped += 1,
        }
    }

    debug!(
        extracted = batch.transactions.len(),
        skipped, "text extraction complete"
    );
    batch
}

/// Caller-supplied zero-based column indices for CSV ingestion
#[derive(Debug, Clone)]
pub struct CsvColumnMap {
    pub date: usize,
    pub description: usize,
    pub amount: usize,
    /// Optional explicit debit/credit column; overrides sign-based direction
    pub transaction_type: Option<usize>,
}

impl Default for CsvColumnMap {
    /// Date, description, amount in the first three columns
    fn default() -> Self {
        Self {
            date: 0,
            description: 1,
            amount: 2,
            transaction_type: None,
        }
    }
}

/// Split one CSV line into fields, honoring double quotes around fields that
/// contain commas. One character at a time; quote state simply toggles, so
/// escaped quotes inside a quoted field are not supported.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a CSV amount field, handling currency symbols and thousands
/// separators.
fn parse_csv_amount(field: &str) -> Option<f64> {
    let cleaned: String = field.trim().replace(['$', ',', ' '], "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Direction for a CSV row: an explicit type column wins, otherwise the sign
/// of the parsed amount decides (non-negative reads as credit).
fn csv_direction(type_field: Option<&str>, amount: f64) -> TransactionType {
    if let Some(field) = type_field {
        let lower = field.to_lowercase();
        if lower.contains("debit") || lower.contains("dr") {
            return TransactionType::Debit;
        }
        if lower.contains("credit") || lower.contains("cr") {
            return TransactionType::Credit;
        }
    }
    if amount >= 0.0 {
        TransactionType::Credit
    } else {
        TransactionType::Debit
    }
}

/// Parse CSV content into candidate transactions.
///
/// The first row is always treated as a header and skipped. Rows with fewer
/// than three columns are skipped outright; rows that are addressable but
/// broken contribute a [`RowError`] and never abort the batch.
pub fn process_csv_content(text: &str, map: &CsvColumnMap) -> ExtractionBatch {
    let mut batch = ExtractionBatch::default();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if idx == 0 {
            continue; // header
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_csv_line(line);
        if fields.len() < 3 {
            continue;
        }

        let date = match fields.get(map.date).and_then(|f| parse_date(f)) {
            Some(d) => d,
            None => {
                batch.errors.push(RowError {
                    line: line_no,
                    message: format!(
                        "Unable to parse date: {}",
                        fields.get(map.date).map(|s| s.trim()).unwrap_or("")
                    ),
                });
                continue;
            }
        };

        let description = fields
            .get(map.description)
            .map(|f| f.trim().to_string())
            .unwrap_or_default();
        if description.is_empty() {
            batch.errors.push(RowError {
                line: line_no,
                message: "Missing description".to_string(),
            });
            continue;
        }

        let raw_amount = match fields.get(map.amount).and_then(|f| parse_csv_amount(f)) {
            Some(v) => v,
            None => {
                batch.errors.push(RowError {
                    line: line_no,
                    message: format!(
                        "Unable to parse amount: {}",
                        fields.get(map.amount).map(|s| s.trim()).unwrap_or("")
                    ),
                });
                continue;
            }
        };

        let type_field = map
            .transaction_type
            .and_then(|col| fields.get(col))
            .map(|s| s.as_str());

        batch.transactions.push(CandidateTransaction {
            date,
            merchant_raw: description,
            amount: raw_amount.abs(),
            transaction_type: csv_direction(type_field, raw_amount),
            confidence_score: CSV_BASE_CONFIDENCE,
            description: None,
        });
    }

    debug!(
        extracted = batch.transactions.len(),
        errors = batch.errors.len(),
        "csv extraction complete"
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("03/15/2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("03/15/24"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("2024-03-15"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("15-03-2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("Mar 15, 2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("15 Mar 2024"), Some(ymd(2024, 3, 15)));
    }

    #[test]
    fn test_parse_date_priority() {
        // The 4-digit-year pattern is tried first, so the full year wins
        assert_eq!(parse_date("01/02/2024"), Some(ymd(2024, 1, 2)));
    }

    #[test]
    fn test_parse_date_rejects_non_dates() {
        assert_eq!(parse_date("Invoice #12345"), None);
        assert_eq!(parse_date("OPENING BALANCE"), None);
        // Matches the pattern shape but is not a calendar date
        assert_eq!(parse_date("13/45/2024"), None);
    }

    #[test]
    fn test_parse_amount_dollar() {
        let parsed = parse_amount("$1,234.56").unwrap();
        assert_eq!(parsed.amount, 1234.56);
        assert_eq!(parsed.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_parse_amount_cr_suffix() {
        let parsed = parse_amount("1234.56 CR").unwrap();
        assert_eq!(parsed.amount, 1234.56);
        assert_eq!(parsed.transaction_type, TransactionType::Credit);

        let parsed = parse_amount("1,234.56 dr").unwrap();
        assert_eq!(parsed.amount, 1234.56);
        assert_eq!(parsed.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_parse_amount_negative() {
        let parsed = parse_amount("-$50.00").unwrap();
        assert_eq!(parsed.amount, 50.00);
        assert_eq!(parsed.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_parse_amount_keywords() {
        let parsed = parse_amount("SALARY DEPOSIT $2,000.00").unwrap();
        assert_eq!(parsed.transaction_type, TransactionType::Credit);

        // "Grocery" contains the letters c-r but is not a credit
        let parsed = parse_amount("GROCERY STORE $45.00").unwrap();
        assert_eq!(parsed.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_extract_transaction_line() {
        let tx = extract_transaction_line("03/15/2024 AMAZON.COM 123-4567 $45.99").unwrap();
        assert_eq!(tx.date, ymd(2024, 3, 15));
        assert_eq!(tx.amount, 45.99);
        assert_eq!(tx.transaction_type, TransactionType::Debit);
        assert!(tx.merchant_raw.contains("AMAZON.COM"));
        assert!(!tx.merchant_raw.contains("45.99"));
        assert!(!tx.merchant_raw.contains("03/15"));
        assert_eq!(tx.confidence_score, TEXT_BASE_CONFIDENCE);
    }

    #[test]
    fn test_extract_line_requires_both_fields() {
        // Amount but no date
        assert!(extract_transaction_line("AMAZON.COM $45.99").is_none());
        // Date but no amount
        assert!(extract_transaction_line("03/15/2024 AMAZON.COM").is_none());
        // Date and amount but nothing left for a merchant (page-header shape)
        assert!(extract_transaction_line("03/15/2024 $45.99").is_none());
    }

    #[test]
    fn test_process_text_content_is_best_effort() {
        let text = "Statement of Account\n\
                    03/15/2024 NETFLIX.COM $15.99\n\
                    \n\
                    Page 1 of 3\n\
                    03/16/2024 STARBUCKS #1234 $5.50\n";
        let batch = process_text_content(text);
        assert_eq!(batch.transactions.len(), 2);
        assert!(batch.errors.is_empty());
        assert_eq!(batch.transactions[0].merchant_raw, "NETFLIX.COM");
    }

    #[test]
    fn test_split_csv_line_quoted_comma() {
        let fields = split_csv_line(r#"2024-03-15,"AMAZON, INC",-45.99"#);
        assert_eq!(fields, vec!["2024-03-15", "AMAZON, INC", "-45.99"]);
    }

    #[test]
    fn test_process_csv_content() {
        let csv = "Date,Description,Amount\n\
                   2024-03-15,\"AMAZON, INC\",-45.99\n\
                   2024-03-16,SALARY,2000.00\n";
        let batch = process_csv_content(csv, &CsvColumnMap::default());
        assert_eq!(batch.transactions.len(), 2);
        assert!(batch.errors.is_empty());

        let amazon = &batch.transactions[0];
        assert_eq!(amazon.merchant_raw, "AMAZON, INC");
        assert_eq!(amazon.amount, 45.99);
        assert_eq!(amazon.transaction_type, TransactionType::Debit);
        assert_eq!(amazon.confidence_score, CSV_BASE_CONFIDENCE);

        let salary = &batch.transactions[1];
        assert_eq!(salary.transaction_type, TransactionType::Credit);
    }

    #[test]
    fn test_process_csv_collects_row_errors() {
        let csv = "Date,Description,Amount\n\
                   not-a-date,STORE,10.00\n\
                   2024-03-15,,10.00\n\
                   2024-03-16,STORE,ten dollars\n\
                   2024-03-17,GOOD ROW,-5.00\n";
        let batch = process_csv_content(csv, &CsvColumnMap::default());
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.errors.len(), 3);
        assert_eq!(batch.errors[0].line, 2);
        assert!(batch.errors[1].message.contains("description"));
    }

    #[test]
    fn test_csv_type_column_overrides_sign() {
        let csv = "Date,Description,Amount,Type\n\
                   2024-03-15,REFUND LLC,45.99,Debit\n\
                   2024-03-16,PAYROLL,-10.00,CR\n";
        let map = CsvColumnMap {
            transaction_type: Some(3),
            ..CsvColumnMap::default()
        };
        let batch = process_csv_content(csv, &map);
        assert_eq!(
            batch.transactions[0].transaction_type,
            TransactionType::Debit
        );
        assert_eq!(
            batch.transactions[1].transaction_type,
            TransactionType::Credit
        );
    }

    #[test]
    fn test_csv_short_rows_skipped() {
        let csv = "Date,Description,Amount\n\
                   just-two,cols\n\
                   2024-03-15,STORE,-1.00\n";
        let batch = process_csv_content(csv, &CsvColumnMap::default());
        assert_eq!(batch.transactions.len(), 1);
        assert!(batch.errors.is_empty());
    }
}
