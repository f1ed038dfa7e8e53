//! JSON-LD structured data extraction
//!
//! Product pages frequently embed a machine-readable `Product` entity in
//! `<script type="application/ld+json">`. When present it is the most
//! reliable source, so every field it supplies takes precedence over
//! selector-based extraction. Blocks may be a bare object, an array of
//! entities, or wrapped in `@graph`.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

use super::text;

static LD_JSON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector"));

/// Fields a structured-data Product block can supply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f32>,
    pub rating_count: Option<u32>,
    pub category: Option<String>,
    pub sku: Option<String>,
}

impl StructuredProduct {
    /// A block is only worth merging when it carries at least one of the
    /// required fields.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.name.is_some() || self.price.is_some()
    }
}

/// Find the first usable `Product` entity in the document's JSON-LD
/// blocks.
#[must_use]
pub fn product_block(html: &Html) -> Option<StructuredProduct> {
    for script in html.select(&LD_JSON_SELECTOR) {
        let body = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&body) else {
            continue;
        };
        for entity in candidate_entities(&value) {
            if is_product(entity) {
                let product = parse_product(entity);
                if product.is_usable() {
                    return Some(product);
                }
            }
        }
    }
    None
}

/// The entity itself, array elements, and `@graph` members.
fn candidate_entities(value: &Value) -> Vec<&Value> {
    let mut entities = Vec::new();
    match value {
        Value::Array(items) => entities.extend(items.iter()),
        Value::Object(_) => {
            entities.push(value);
            if let Some(Value::Array(graph)) = value.get("@graph") {
                entities.extend(graph.iter());
            }
        }
        _ => {}
    }
    entities
}

fn is_product(entity: &Value) -> bool {
    match entity.get("@type") {
        Some(Value::String(kind)) => kind.eq_ignore_ascii_case("product"),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| kind.eq_ignore_ascii_case("product")),
        _ => false,
    }
}

fn parse_product(entity: &Value) -> StructuredProduct {
    let offers = primary_offer(entity);

    StructuredProduct {
        name: entity
            .get("name")
            .and_then(Value::as_str)
            .map(text::collapse_whitespace)
            .filter(|name| !name.is_empty()),
        price: offers.as_ref().and_then(|offer| {
            offer
                .get("price")
                .or_else(|| offer.get("lowPrice"))
                .and_then(number_or_numeric_string)
        }),
        currency: offers.as_ref().and_then(|offer| {
            offer
                .get("priceCurrency")
                .and_then(Value::as_str)
                .map(|code| code.trim().to_uppercase())
                .filter(|code| code.len() == 3)
        }),
        image_url: image_url(entity),
        rating: entity
            .get("aggregateRating")
            .and_then(|rating| rating.get("ratingValue"))
            .and_then(number_or_numeric_string)
            .map(|value| value as f32)
            .filter(|value| (0.0..=5.0).contains(value)),
        rating_count: entity.get("aggregateRating").and_then(|rating| {
            rating
                .get("reviewCount")
                .or_else(|| rating.get("ratingCount"))
                .and_then(number_or_numeric_string)
                .map(|count| count as u32)
        }),
        category: category(entity),
        sku: entity
            .get("sku")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|sku| !sku.is_empty())
            .map(String::from),
    }
}

/// `offers` may be a single object or an array; take the first.
fn primary_offer(entity: &Value) -> Option<&Value> {
    match entity.get("offers")? {
        offer @ Value::Object(_) => Some(offer),
        Value::Array(offers) => offers.first(),
        _ => None,
    }
}

fn image_url(entity: &Value) -> Option<String> {
    let image = entity.get("image")?;
    let url = match image {
        Value::String(url) => Some(url.clone()),
        Value::Array(urls) => urls.first().and_then(Value::as_str).map(String::from),
        Value::Object(_) => image.get("url").and_then(Value::as_str).map(String::from),
        _ => None,
    };
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// `category` is a string or an array of breadcrumb-like strings; the
/// last entry is the most specific.
fn category(entity: &Value) -> Option<String> {
    match entity.get("category")? {
        Value::String(category) => Some(text::collapse_whitespace(category)),
        Value::Array(categories) => categories
            .iter()
            .filter_map(Value::as_str)
            .map(text::collapse_whitespace)
            .filter(|category| !category.is_empty())
            .last(),
        _ => None,
    }
    .filter(|category| !category.is_empty())
}

/// JSON-LD prices arrive as numbers or strings; accept both.
fn number_or_numeric_string(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => text::parse_price_text(raw),
        _ => None,
    }
}
