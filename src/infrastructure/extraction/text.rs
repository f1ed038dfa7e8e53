//! Text cleanup and field parsing shared by all extractors
//!
//! Price, rating and count parsing over the messy strings real product
//! pages serve. Everything here is pure and returns `Option` — a value
//! that doesn't parse is an expected outcome, not an error.

use once_cell::sync::Lazy;
use regex::Regex;

static RATING_OUT_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]+(?:[.,][0-9]+)?)\s*(?:out\s+of|/)\s*5").expect("static regex")
});

static LEADING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+(?:[.,][0-9]+)?)").expect("static regex"));

/// Collapse runs of whitespace to single spaces and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a price amount out of raw price text.
///
/// The text is first reduced to digits and separators, then separators
/// are disambiguated heuristically:
/// - both comma and dot present: the one occurring last is the decimal
///   separator (so "$1,234.56" and "1.234,56" both read 1234.56); a
///   trailing comma without an exact two-digit tail is grouping.
/// - comma only: decimal iff exactly two digits follow it, else grouping.
/// - dot only: decimal, unless several dots appear (grouping).
///
/// Known failure mode (kept deliberately): locales that group thousands
/// with a comma and a two-digit tail — "1,23" meaning 123 — are read as
/// a decimal 1.23. There is no signal in the text to tell these apart.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    // strip leading/trailing separators left by e.g. "approx. $10"
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ',');
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // European style: dots group, comma may be the decimal
                let without_dots: String = cleaned.chars().filter(|c| *c != '.').collect();
                comma_normalized(&without_dots)
            } else {
                cleaned.chars().filter(|c| *c != ',').collect()
            }
        }
        (Some(_), None) => comma_normalized(cleaned),
        (None, Some(_)) => {
            if cleaned.matches('.').count() > 1 {
                // "1.234.567" is grouped, not a decimal
                cleaned.chars().filter(|c| *c != '.').collect()
            } else {
                cleaned.to_string()
            }
        }
        (None, None) => cleaned.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|amount| amount.is_finite() && *amount >= 0.0)
}

/// Apply the comma-as-decimal rule: the last comma becomes a dot iff
/// exactly two digits follow it; otherwise every comma is grouping.
fn comma_normalized(text: &str) -> String {
    match text.rsplit_once(',') {
        Some((head, tail)) if tail.len() == 2 && tail.chars().all(|c| c.is_ascii_digit()) => {
            let head: String = head.chars().filter(|c| *c != ',').collect();
            format!("{head}.{tail}")
        }
        _ => text.chars().filter(|c| *c != ',').collect(),
    }
}

/// Parse a star rating out of text like "4.3 out of 5 stars", "4/5" or a
/// bare leading number no greater than 5.
#[must_use]
pub fn parse_rating_text(text: &str) -> Option<f32> {
    if let Some(captures) = RATING_OUT_OF_RE.captures(text) {
        return parse_rating_number(&captures[1]);
    }
    LEADING_NUMBER_RE
        .captures(text)
        .and_then(|captures| parse_rating_number(&captures[1]))
        .filter(|rating| *rating <= 5.0)
}

fn parse_rating_number(raw: &str) -> Option<f32> {
    raw.replace(',', ".")
        .parse::<f32>()
        .ok()
        .filter(|rating| (0.0..=5.0).contains(rating))
}

/// Digits-only parse of a review/rating count ("1,234 ratings" → 1234).
#[must_use]
pub fn parse_count_text(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Resolve a possibly relative or protocol-relative image URL against the
/// platform's canonical host.
#[must_use]
pub fn resolve_image_url(raw: &str, canonical_host: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = raw.strip_prefix('/') {
        format!("https://{canonical_host}/{rest}")
    } else {
        format!("https://{canonical_host}/{raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_us_style_prices() {
        assert_eq!(parse_price_text("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price_text("USD 99.99"), Some(99.99));
        assert_eq!(parse_price_text("$0.99"), Some(0.99));
    }

    #[test]
    fn parses_european_style_prices() {
        assert_eq!(parse_price_text("1.234,56"), Some(1234.56));
        assert_eq!(parse_price_text("€ 1.234,56"), Some(1234.56));
    }

    #[test]
    fn lone_comma_is_decimal_only_with_two_digit_tail() {
        assert_eq!(parse_price_text("12,34"), Some(12.34));
        assert_eq!(parse_price_text("₦ 45,000"), Some(45000.0));
        assert_eq!(parse_price_text("1,234,567"), Some(1_234_567.0));
    }

    #[test]
    fn grouped_dots_without_comma_are_thousands() {
        assert_eq!(parse_price_text("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_price_text("19.99"), Some(19.99));
    }

    #[test]
    fn garbage_prices_do_not_parse() {
        assert_eq!(parse_price_text("call for price"), None);
        assert_eq!(parse_price_text(""), None);
        assert_eq!(parse_price_text("..,,"), None);
    }

    #[test]
    fn rating_patterns() {
        assert_eq!(parse_rating_text("4.3 out of 5 stars"), Some(4.3));
        assert_eq!(parse_rating_text("4/5"), Some(4.0));
        assert_eq!(parse_rating_text("3,5 out of 5"), Some(3.5));
        assert_eq!(parse_rating_text("4.7"), Some(4.7));
        assert_eq!(parse_rating_text("7.2"), None);
        assert_eq!(parse_rating_text("no rating"), None);
    }

    #[test]
    fn count_parses_digits_only() {
        assert_eq!(parse_count_text("1,234 ratings"), Some(1234));
        assert_eq!(parse_count_text("(89)"), Some(89));
        assert_eq!(parse_count_text("no reviews yet"), None);
    }

    #[test]
    fn image_urls_resolve_against_canonical_host() {
        assert_eq!(
            resolve_image_url("https://cdn.example/a.jpg", "www.amazon.com"),
            "https://cdn.example/a.jpg"
        );
        assert_eq!(
            resolve_image_url("//cdn.example/a.jpg", "www.amazon.com"),
            "https://cdn.example/a.jpg"
        );
        assert_eq!(
            resolve_image_url("/images/a.jpg", "www.jumia.com.ng"),
            "https://www.jumia.com.ng/images/a.jpg"
        );
        assert_eq!(
            resolve_image_url("images/a.jpg", "www.jumia.com.ng"),
            "https://www.jumia.com.ng/images/a.jpg"
        );
    }
}
