//! Raw extraction to canonical product mapping
//!
//! The mapper owns the authoritative data rules: deterministic id
//! generation, title re-validation, platform price bounds, currency
//! resolution (the extractor's currency is advisory only), category
//! classification and the completeness score. `validate` is a
//! side-channel report callers may run before or instead of `map`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;
use crate::domain::product::{NormalizedProduct, RawProduct};
use crate::domain::taxonomy;

/// Title length bounds after cleaning.
const MIN_TITLE_CHARS: usize = 3;
const MAX_TITLE_CHARS: usize = 500;

/// Hex characters kept from the blake3 digest in the generated id.
const ID_HASH_LEN: usize = 12;

/// Completeness weights. Required fields carry the bulk; the optional
/// tail rewards richer extractions. Sums to 1.0.
const WEIGHT_TITLE: f64 = 0.25;
const WEIGHT_PRICE: f64 = 0.25;
const WEIGHT_CURRENCY: f64 = 0.10;
const WEIGHT_CATEGORY: f64 = 0.10;
const WEIGHT_IMAGE: f64 = 0.10;
const WEIGHT_RATING: f64 = 0.10;
const WEIGHT_RATING_COUNT: f64 = 0.10;

/// Side-channel validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(rename = "completenessScore")]
    pub completeness_score: f64,
}

/// Maps raw extractions into canonical products.
#[derive(Debug, Clone, Default)]
pub struct ProductMapper;

impl ProductMapper {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Map a raw extraction into a canonical record.
    pub fn map(
        &self,
        raw: &RawProduct,
        platform: Platform,
        url: &str,
    ) -> Result<NormalizedProduct, ScrapeError> {
        let title = normalize_title(&raw.title)?;

        let bounds = platform.price_bounds();
        let amount = raw.price.amount;
        if !raw.price.is_plausible() || amount < bounds.min || amount > bounds.max {
            return Err(ScrapeError::Mapping {
                field: "price".to_string(),
                reason: format!(
                    "amount {amount} outside [{}, {}] for {platform}",
                    bounds.min, bounds.max
                ),
            });
        }

        let currency = resolve_currency(&raw.price.currency, platform);
        let category = classify_category(platform, raw.platform_category.as_deref(), &raw.title);
        let completeness_score = completeness(raw);

        let id = generate_id(platform, url, &raw.title);
        debug!(%id, category, completeness_score, "mapped product");

        Ok(NormalizedProduct {
            id,
            title,
            price: amount,
            currency,
            category,
            platform,
            platform_id: raw.platform_id.clone(),
            image_url: raw.image_url.clone(),
            rating: raw.rating,
            rating_count: raw.rating_count,
            completeness_score,
            scraped_at: Utc::now(),
        })
    }

    /// Check a raw extraction without producing a record.
    #[must_use]
    pub fn validate(&self, raw: &RawProduct) -> ValidationReport {
        let mut errors = Vec::new();

        let title = raw.title.trim();
        if title.is_empty() {
            errors.push("title is empty".to_string());
        } else if title.chars().count() < MIN_TITLE_CHARS {
            errors.push(format!("title shorter than {MIN_TITLE_CHARS} characters"));
        }

        if raw.price.amount <= 0.0 {
            errors.push("price is not positive".to_string());
        } else if !raw.price.is_plausible() {
            errors.push("price is implausibly large".to_string());
        }

        if raw.price.currency.trim().len() != 3 {
            errors.push("currency is not a 3-letter code".to_string());
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            completeness_score: completeness(raw),
        }
    }
}

/// Deterministic id: uppercase platform prefix plus a truncated blake3
/// digest of url + title.
#[must_use]
pub fn generate_id(platform: Platform, url: &str, title: &str) -> String {
    let digest = blake3::hash(format!("{url}{title}").as_bytes());
    let hex = digest.to_hex();
    format!("{}-{}", platform.id_prefix(), &hex.as_str()[..ID_HASH_LEN])
}

fn normalize_title(raw_title: &str) -> Result<String, ScrapeError> {
    let title = raw_title.trim();
    let char_count = title.chars().count();

    if char_count < MIN_TITLE_CHARS {
        return Err(ScrapeError::Mapping {
            field: "title".to_string(),
            reason: format!("title has {char_count} characters, minimum is {MIN_TITLE_CHARS}"),
        });
    }

    if char_count > MAX_TITLE_CHARS {
        // over-long titles are truncated, not rejected
        let truncated: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        return Ok(format!("{truncated}..."));
    }

    Ok(title.to_string())
}

/// Authoritative currency: keep a known ISO code, otherwise re-apply the
/// symbol table to whatever the extractor left, then the platform
/// default, then "USD".
fn resolve_currency(raw_currency: &str, platform: Platform) -> String {
    let candidate = raw_currency.trim().to_uppercase();
    if taxonomy::CURRENCY_CODES.contains(&candidate.as_str()) {
        return candidate;
    }
    if let Some(iso) = taxonomy::currency_from_text(raw_currency) {
        return iso.to_string();
    }
    let fallback = platform.default_currency();
    if taxonomy::CURRENCY_CODES.contains(&fallback) {
        fallback.to_string()
    } else {
        "USD".to_string()
    }
}

/// Score each platform bucket by the summed character length of its
/// keywords found in the combined category+title text; highest wins,
/// ties break to the first-declared bucket.
fn classify_category(platform: Platform, raw_category: Option<&str>, title: &str) -> String {
    let haystack =
        format!("{} {}", raw_category.unwrap_or_default(), title).to_lowercase();

    let mut best: Option<(&taxonomy::CategoryBucket, usize)> = None;
    for bucket in taxonomy::category_buckets(platform) {
        // keyword tables are declared lowercase
        let score: usize = bucket
            .keywords
            .iter()
            .filter(|keyword| haystack.contains(**keyword))
            .map(|keyword| keyword.len())
            .sum();
        if score > 0 && best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((bucket, score));
        }
    }

    match best {
        Some((bucket, _)) => bucket.name.to_string(),
        None => raw_category
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map_or_else(|| "General".to_string(), String::from),
    }
}

fn completeness(raw: &RawProduct) -> f64 {
    let mut score = 0.0;
    if !raw.title.trim().is_empty() {
        score += WEIGHT_TITLE;
    }
    if raw.price.amount > 0.0 {
        score += WEIGHT_PRICE;
    }
    if raw.price.currency.trim().len() == 3 {
        score += WEIGHT_CURRENCY;
    }
    if raw.platform_category.as_deref().is_some_and(|c| !c.trim().is_empty()) {
        score += WEIGHT_CATEGORY;
    }
    if raw.image_url.as_deref().is_some_and(|i| !i.trim().is_empty()) {
        score += WEIGHT_IMAGE;
    }
    if raw.rating.is_some() {
        score += WEIGHT_RATING;
    }
    if raw.rating_count > 0 {
        score += WEIGHT_RATING_COUNT;
    }
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Price;

    fn raw(title: &str, amount: f64, currency: &str) -> RawProduct {
        RawProduct {
            title: title.to_string(),
            price: Price::new(amount, currency),
            rating: None,
            rating_count: 0,
            image_url: None,
            platform_category: None,
            platform_id: None,
        }
    }

    const URL: &str = "https://www.amazon.com/dp/B08N5WRWNW";

    #[test]
    fn id_is_deterministic_and_platform_prefixed() {
        let a = generate_id(Platform::Amazon, URL, "Echo Dot");
        let b = generate_id(Platform::Amazon, URL, "Echo Dot");
        let c = generate_id(Platform::Amazon, URL, "Echo Dot 2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("AMAZON-"));
        assert_eq!(a.len(), "AMAZON-".len() + 12);

        let jumia = generate_id(Platform::Jumia, URL, "Echo Dot");
        assert!(jumia.starts_with("JUMIA-"));
    }

    #[test]
    fn maps_a_complete_raw_product() {
        let mut input = raw("Echo Dot (4th Gen)", 49.99, "USD");
        input.rating = Some(4.6);
        input.rating_count = 12000;
        input.image_url = Some("https://cdn.example/dot.jpg".to_string());
        input.platform_category = Some("Smart Speakers".to_string());
        input.platform_id = Some("B08N5WRWNW".to_string());

        let product = ProductMapper::new().map(&input, Platform::Amazon, URL).unwrap();
        assert_eq!(product.price, 49.99);
        assert_eq!(product.currency, "USD");
        assert_eq!(product.platform_id.as_deref(), Some("B08N5WRWNW"));
        assert_eq!(product.completeness_score, 1.0);
    }

    #[test]
    fn out_of_range_prices_are_rejected_per_platform() {
        let mapper = ProductMapper::new();
        let too_cheap = raw("Freebie Widget", 0.001, "USD");
        assert!(matches!(
            mapper.map(&too_cheap, Platform::Amazon, URL),
            Err(ScrapeError::Mapping { ref field, .. }) if field == "price"
        ));

        // fine for Jumia's looser ceiling, rejected by Amazon's
        let pricey = raw("Generator Set", 5_000_000.0, "NGN");
        assert!(mapper.map(&pricey, Platform::Jumia, URL).is_ok());
        assert!(mapper.map(&pricey, Platform::Amazon, URL).is_err());
    }

    #[test]
    fn short_titles_reject_long_titles_truncate() {
        let mapper = ProductMapper::new();
        assert!(matches!(
            mapper.map(&raw("ab", 10.0, "USD"), Platform::Amazon, URL),
            Err(ScrapeError::Mapping { ref field, .. }) if field == "title"
        ));

        let long_title = "x".repeat(600);
        let product = mapper.map(&raw(&long_title, 10.0, "USD"), Platform::Amazon, URL).unwrap();
        assert_eq!(product.title.chars().count(), 500);
        assert!(product.title.ends_with("..."));
    }

    #[test]
    fn unknown_currency_falls_back_to_platform_default() {
        assert_eq!(resolve_currency("???", Platform::Jumia), "NGN");
        assert_eq!(resolve_currency("usd", Platform::Jumia), "USD");
        assert_eq!(resolve_currency("₦", Platform::Amazon), "NGN");
        assert_eq!(resolve_currency("", Platform::Amazon), "USD");
    }

    #[test]
    fn category_classification_scores_keyword_lengths() {
        // "phone" matches inside "Mobile Phones"; no fashion keyword hits
        let category = classify_category(
            Platform::Amazon,
            Some("Mobile Phones"),
            "Samsung Galaxy Case",
        );
        assert_eq!(category, "Electronics");
    }

    #[test]
    fn unmatched_category_falls_back_to_raw_then_general() {
        assert_eq!(
            classify_category(Platform::Amazon, Some("Collectible Stamps"), "Rare stamp 1923"),
            "Collectible Stamps"
        );
        assert_eq!(classify_category(Platform::Amazon, None, "Rare stamp 1923"), "General");
    }

    #[test]
    fn completeness_reflects_populated_fields() {
        let bare = raw("Widget", 10.0, "USD");
        // title + price + currency only
        assert_eq!(completeness(&bare), 0.60);

        let mut rich = raw("Widget", 10.0, "USD");
        rich.rating = Some(4.0);
        rich.rating_count = 5;
        rich.image_url = Some("https://cdn/img.jpg".to_string());
        rich.platform_category = Some("Gadgets".to_string());
        assert_eq!(completeness(&rich), 1.0);
    }

    #[test]
    fn validate_reports_without_failing() {
        let mapper = ProductMapper::new();
        let report = mapper.validate(&raw("ok title", 10.0, "USD"));
        assert!(report.valid);
        assert!(report.errors.is_empty());

        let bad = mapper.validate(&raw("", -1.0, "??"));
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 3);
    }
}
