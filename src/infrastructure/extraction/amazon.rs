//! Amazon product page extractor
//!
//! Selector chains cover the layout variants Amazon serves for product
//! detail pages (buybox redesigns, legacy price blocks, media-heavy
//! templates). The ASIN comes from the URL path first, then the query
//! string, then the DOM.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{advisory_currency, compile_selectors, first_attr, first_text, last_text, structured, text};
use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;
use crate::domain::product::{Price, RawProduct};

static ASIN_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(?:dp|gp/product|gp/aw/d|product)/([A-Z0-9]{10})(?:[/?]|$)").expect("static regex")
});

const TITLE_SELECTORS: &[&str] = &[
    "#productTitle",
    "span#productTitle",
    "#title_feature_div #title",
    "h1.product-title-word-break",
    "h1 span",
];

const PRICE_SELECTORS: &[&str] = &[
    "#corePrice_feature_div span.a-offscreen",
    "#corePriceDisplay_desktop_feature_div span.a-offscreen",
    "span.a-price:not(.a-text-price) span.a-offscreen",
    "#priceblock_ourprice",
    "#priceblock_dealprice",
    "#price_inside_buybox",
    "#tp_price_block_total_price_ww span.a-offscreen",
    "span.a-price span.a-offscreen",
];

const RATING_SELECTORS: &[&str] = &[
    "#acrPopover span.a-icon-alt",
    "span[data-hook='rating-out-of-text']",
    "i.a-icon-star span.a-icon-alt",
    "i.a-icon-star-small span.a-icon-alt",
];

const RATING_COUNT_SELECTORS: &[&str] = &[
    "#acrCustomerReviewText",
    "span[data-hook='total-review-count']",
    "#ratings-summary a span",
];

const IMAGE_SELECTORS: &[&str] = &[
    "#landingImage",
    "#imgBlkFront",
    "#main-image",
    "#imgTagWrapperId img",
    "#ebooksImgBlkFront",
];

const IMAGE_ATTRS: &[&str] = &["src", "data-old-hires", "data-src", "data-lazy-src"];

const BREADCRUMB_SELECTORS: &[&str] = &[
    "#wayfinding-breadcrumbs_feature_div ul li a",
    "#wayfinding-breadcrumbs_container a",
    "ul.a-unordered-list.a-horizontal.a-size-small a",
];

const ASIN_DOM_SELECTORS: &[&str] = &["input#ASIN", "[data-asin]", "#averageCustomerReviews[data-asin]"];

/// Extractor for Amazon product detail pages.
pub struct AmazonExtractor {
    title_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    rating_count_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
    breadcrumb_selectors: Vec<Selector>,
    asin_dom_selectors: Vec<Selector>,
}

impl AmazonExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title_selectors: compile_selectors(TITLE_SELECTORS)?,
            price_selectors: compile_selectors(PRICE_SELECTORS)?,
            rating_selectors: compile_selectors(RATING_SELECTORS)?,
            rating_count_selectors: compile_selectors(RATING_COUNT_SELECTORS)?,
            image_selectors: compile_selectors(IMAGE_SELECTORS)?,
            breadcrumb_selectors: compile_selectors(BREADCRUMB_SELECTORS)?,
            asin_dom_selectors: compile_selectors(ASIN_DOM_SELECTORS)?,
        })
    }

    /// Extract raw product fields from an Amazon page.
    pub fn extract(&self, html: &str, url: &str) -> Result<RawProduct, ScrapeError> {
        let document = Html::parse_document(html);
        let block = structured::product_block(&document).unwrap_or_default();

        let title = block
            .name
            .clone()
            .or_else(|| first_text(&document, &self.title_selectors))
            .filter(|title| !title.is_empty())
            .ok_or_else(|| ScrapeError::ExtractionFailed { field: "title".to_string() })?;

        let price_text = first_text(&document, &self.price_selectors);
        let amount = block
            .price
            .or_else(|| price_text.as_deref().and_then(text::parse_price_text))
            .ok_or_else(|| ScrapeError::ExtractionFailed { field: "price".to_string() })?;

        let currency = block.currency.clone().unwrap_or_else(|| {
            advisory_currency(Platform::Amazon, price_text.as_deref().unwrap_or_default(), url)
        });

        let rating = block.rating.or_else(|| {
            first_text(&document, &self.rating_selectors)
                .as_deref()
                .and_then(text::parse_rating_text)
        });

        let rating_count = block.rating_count.unwrap_or_else(|| {
            first_text(&document, &self.rating_count_selectors)
                .as_deref()
                .and_then(text::parse_count_text)
                .unwrap_or(0)
        });

        let image_url = block
            .image_url
            .clone()
            .or_else(|| first_attr(&document, &self.image_selectors, IMAGE_ATTRS))
            .map(|raw| text::resolve_image_url(&raw, Platform::Amazon.canonical_host()));

        let platform_category = block
            .category
            .clone()
            .or_else(|| last_text(&document, &self.breadcrumb_selectors));

        let platform_id = block
            .sku
            .clone()
            .filter(|sku| looks_like_asin(sku))
            .or_else(|| extract_asin(url, &document, &self.asin_dom_selectors));

        Ok(RawProduct {
            title,
            price: Price::new(amount, currency),
            rating,
            rating_count,
            image_url,
            platform_category,
            platform_id,
        })
    }
}

/// ASIN resolution: URL path, then `asin` query parameter, then the DOM.
fn extract_asin(url: &str, document: &Html, dom_chain: &[Selector]) -> Option<String> {
    if let Some(captures) = ASIN_PATH_RE.captures(url) {
        return Some(captures[1].to_string());
    }

    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, value)) =
            parsed.query_pairs().find(|(key, _)| key.eq_ignore_ascii_case("asin"))
        {
            if looks_like_asin(&value) {
                return Some(value.to_uppercase());
            }
        }
    }

    dom_chain.iter().find_map(|selector| {
        document.select(selector).find_map(|element| {
            element
                .value()
                .attr("value")
                .or_else(|| element.value().attr("data-asin"))
                .map(str::trim)
                .filter(|candidate| looks_like_asin(candidate))
                .map(str::to_uppercase)
        })
    })
}

fn looks_like_asin(candidate: &str) -> bool {
    candidate.len() == 10
        && candidate.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
}
