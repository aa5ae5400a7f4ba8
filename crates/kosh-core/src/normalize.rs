//! Merchant name normalization.
//!
//! Bank statements bury the actual merchant under processor prefixes
//! ("PAYPAL *", "SQ *"), reference numbers, store ids and location trailers.
//! [`normalize_merchant`] is the pure cleanup pipeline; identity resolution
//! against the registry lives in the db layer.

use std::sync::OnceLock;

use regex::Regex;

/// Payment-processor prefixes, tried in order against the start of the
/// string. Patterns are mutually exclusive by construction; each removal is a
/// no-op when absent.
const PREFIX_PATTERNS: &[&str] = &[
    r"(?i)^PAYPAL\s*\*\s*",
    r"(?i)^PP\s*\*\s*",
    r"(?i)^SQ\s*\*\s*",
    r"(?i)^TST\s*\*\s*",
    r"(?i)^AMZN\s*MKTP\s*\*?\s*",
    r"(?i)^AMZN\s*\*\s*",
    r"(?i)^GOOGLE\s*\*\s*",
    r"(?i)^POS\s+",
    r"(?i)^DEBIT\s+CARD\s+PURCHASE\s+",
    r"(?i)^CHECKCARD\s+",
    r"(?i)^ACH\s+(DEBIT|CREDIT)\s+",
    r"(?i)^UPI[/-]",
];

/// Trailing-noise suffixes, applied in order. State codes are matched before
/// ".COM" so that "AMAZON.COM WA" reduces all the way to "AMAZON".
const SUFFIX_PATTERNS: &[&str] = &[
    r"(?i)\s+(REF|REFERENCE)\s*[:#]?\s*\S+$",
    r"[\s#]*\d{6,}$",
    r"\s+\d{1,2}/\d{1,2}$",
    r"\s*-\s*\d+$",
    r"\s+[A-Z]{2}$",
    r"(?i)\.COM/BILL$",
    r"(?i)\.COM$",
];

fn prefix_regexes() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PREFIX_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("static prefix pattern"))
            .collect()
    })
}

fn suffix_regexes() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SUFFIX_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("static suffix pattern"))
            .collect()
    })
}

/// A long numeric-id chain: three or more leading digits, a hyphen, then more
/// digits or hyphens. UPI and wire descriptors take this shape, with the
/// merchant name buried in one of the hyphen-delimited parts.
fn looks_like_id_chain(text: &str) -> bool {
    static ID_CHAIN: OnceLock<Regex> = OnceLock::new();
    ID_CHAIN
        .get_or_init(|| Regex::new(r"^\d{3,}-[\d-]").expect("static id-chain pattern"))
        .is_match(text)
}

fn rescue_from_id_chain(text: &str) -> Option<String> {
    static HAS_LETTERS: OnceLock<Regex> = OnceLock::new();
    let has_letters =
        HAS_LETTERS.get_or_init(|| Regex::new(r"[A-Za-z]{3}").expect("static letters pattern"));
    let parts: Vec<&str> = text.split('-').collect();

    if let Some(part) = parts.iter().find(|p| has_letters.is_match(p)) {
        return Some(part.to_string());
    }
    parts
        .last()
        .filter(|p| p.chars().count() >= 3)
        .map(|p| p.to_string())
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a raw statement merchant string to a canonical display name.
///
/// Pure and deterministic: trim, strip the first matching processor prefix,
/// rescue the name out of a numeric-id chain, strip trailing noise, collapse
/// whitespace, title-case. Never returns an empty string for non-empty input;
/// if the pipeline strips everything, the title-cased input survives.
pub fn normalize_merchant(raw: &str) -> String {
    let mut name = raw.trim().to_string();

    for regex in prefix_regexes() {
        name = regex.replace(&name, "").into_owned();
    }

    if looks_like_id_chain(&name) {
        if let Some(rescued) = rescue_from_id_chain(&name) {
            name = rescued;
        }
    }

    for regex in suffix_regexes() {
        name = regex.replace(&name, "").into_owned();
    }

    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return title_case(raw.trim());
    }
    title_case(&collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_processor_prefixes() {
        assert_eq!(normalize_merchant("PAYPAL *NETFLIX.COM"), "Netflix");
        assert_eq!(normalize_merchant("SQ *BLUE BOTTLE COFFEE"), "Blue Bottle Coffee");
        assert_eq!(normalize_merchant("TST* THE DINER"), "The Diner");
        assert_eq!(normalize_merchant("AMZN*PRIME VIDEO"), "Prime Video");
    }

    #[test]
    fn strips_trailing_noise() {
        assert_eq!(normalize_merchant("STARBUCKS 00012345678"), "Starbucks");
        assert_eq!(normalize_merchant("SHELL OIL 03/15"), "Shell Oil");
        assert_eq!(normalize_merchant("WALGREENS - 4"), "Walgreens");
        assert_eq!(normalize_merchant("AMAZON.COM WA"), "Amazon");
        assert_eq!(normalize_merchant("APPLE.COM/BILL"), "Apple");
    }

    #[test]
    fn rescues_name_from_id_chain() {
        assert_eq!(normalize_merchant("123456-SWIGGY-789012-31"), "Swiggy");
        // No lettered part: fall back to the last part when long enough
        assert_eq!(normalize_merchant("123-456-7890"), "7890");
    }

    #[test]
    fn title_cases_and_collapses() {
        assert_eq!(normalize_merchant("  whole   FOODS  market "), "Whole Foods Market");
    }

    #[test]
    fn never_returns_empty_for_nonempty_input() {
        // The suffix pass would otherwise consume the whole string
        assert!(!normalize_merchant("1234567").is_empty());
    }

    #[test]
    fn is_deterministic() {
        let a = normalize_merchant("PAYPAL *SPOTIFY USA 8887778888");
        let b = normalize_merchant("PAYPAL *SPOTIFY USA 8887778888");
        assert_eq!(a, b);
    }
}
