//! Jumia product page extractor
//!
//! Jumia's markup leans on utility classes ("-fs20", "-b"), so the
//! chains carry several class-combination variants per field. Ratings
//! appear both as text ("4.2 out of 5") and as a star-class encoding
//! ("stars _s4" means four stars). The SKU is the trailing uppercase
//! code of the URL path, before ".html".

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{advisory_currency, compile_selectors, first_attr, first_text, last_text, structured, text};
use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;
use crate::domain::product::{Price, RawProduct};

static SKU_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([A-Z0-9]{6,})\.html").expect("static regex"));

/// Star class encoding: "stars _s4" → 4 stars, "_s35" → 3.5 stars.
static STARS_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_s(\d)(\d)?").expect("static regex"));

const TITLE_SELECTORS: &[&str] = &[
    "h1.-fs20.-pts.-pbxs",
    "section.card h1",
    "h1.-fs20",
    "h1.-fs24",
    "h1",
];

const PRICE_SELECTORS: &[&str] = &[
    "span.-b.-ubpt.-tal.-fs24.-prxs",
    "span.-b.-ltr.-tal.-fs24",
    "div.-hr.-mtxs.-pvs span.-b",
    "span.-b.-fs24",
    "span[dir='ltr'].-b",
    "div.price-box span.price",
];

const RATING_TEXT_SELECTORS: &[&str] = &[
    "div.stars",
    "div[class*='stars']",
    "span.-gy5.-fsh",
];

const STARS_CLASS_SELECTORS: &[&str] = &["div.stars", "div[class*='stars']"];

const RATING_COUNT_SELECTORS: &[&str] = &[
    "a.-plxs.-upp",
    "a[href='#customer-reviews']",
    "p.-fs16 a",
];

const IMAGE_SELECTORS: &[&str] = &[
    "#imgs img",
    "div.sldr img",
    "img.-fw.-fh",
    "section.card img",
];

const IMAGE_ATTRS: &[&str] = &["data-src", "src", "data-lazy-src"];

const BREADCRUMB_SELECTORS: &[&str] = &[
    "div.brcbs a.cbs",
    "div.brcbs a",
    "nav a.cbs",
];

const SKU_DOM_SELECTORS: &[&str] = &["[data-sku]", "meta[itemprop='sku']"];

/// Extractor for Jumia product detail pages.
pub struct JumiaExtractor {
    title_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    rating_text_selectors: Vec<Selector>,
    stars_class_selectors: Vec<Selector>,
    rating_count_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
    breadcrumb_selectors: Vec<Selector>,
    sku_dom_selectors: Vec<Selector>,
}

impl JumiaExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title_selectors: compile_selectors(TITLE_SELECTORS)?,
            price_selectors: compile_selectors(PRICE_SELECTORS)?,
            rating_text_selectors: compile_selectors(RATING_TEXT_SELECTORS)?,
            stars_class_selectors: compile_selectors(STARS_CLASS_SELECTORS)?,
            rating_count_selectors: compile_selectors(RATING_COUNT_SELECTORS)?,
            image_selectors: compile_selectors(IMAGE_SELECTORS)?,
            breadcrumb_selectors: compile_selectors(BREADCRUMB_SELECTORS)?,
            sku_dom_selectors: compile_selectors(SKU_DOM_SELECTORS)?,
        })
    }

    /// Extract raw product fields from a Jumia page.
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
            advisory_currency(Platform::Jumia, price_text.as_deref().unwrap_or_default(), url)
        });

        let rating = block.rating.or_else(|| self.rating_from_dom(&document));

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
            .map(|raw| text::resolve_image_url(&raw, Platform::Jumia.canonical_host()));

        let platform_category = block
            .category
            .clone()
            .or_else(|| last_text(&document, &self.breadcrumb_selectors));

        let platform_id = block
            .sku
            .clone()
            .or_else(|| extract_sku(url, &document, &self.sku_dom_selectors));

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

    /// Rating from text patterns first, then the star-class encoding.
    fn rating_from_dom(&self, document: &Html) -> Option<f32> {
        if let Some(rating) = first_text(document, &self.rating_text_selectors)
            .as_deref()
            .and_then(text::parse_rating_text)
        {
            return Some(rating);
        }

        self.stars_class_selectors.iter().find_map(|selector| {
            document.select(selector).find_map(|element| {
                element.value().attr("class").and_then(rating_from_stars_class)
            })
        })
    }
}

/// Decode "stars _s4" / "stars _s45" style classes into a 0–5 rating.
fn rating_from_stars_class(class_attr: &str) -> Option<f32> {
    let captures = STARS_CLASS_RE.captures(class_attr)?;
    let whole: f32 = captures[1].parse().ok()?;
    let fraction = captures
        .get(2)
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .map_or(0.0, |digit| digit / 10.0);
    let rating = whole + fraction;
    (0.0..=5.0).contains(&rating).then_some(rating)
}

/// SKU resolution: URL path, then `sku` query parameter, then the DOM.
fn extract_sku(url: &str, document: &Html, dom_chain: &[Selector]) -> Option<String> {
    if let Some(captures) = SKU_PATH_RE.captures(url) {
        return Some(captures[1].to_string());
    }

    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, value)) =
            parsed.query_pairs().find(|(key, _)| key.eq_ignore_ascii_case("sku"))
        {
            let value = value.trim().to_uppercase();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    dom_chain.iter().find_map(|selector| {
        document.select(selector).find_map(|element| {
            element
                .value()
                .attr("data-sku")
                .or_else(|| element.value().attr("content"))
                .map(str::trim)
                .filter(|candidate| !candidate.is_empty())
                .map(str::to_uppercase)
        })
    })
}
