//! HTML extraction layer
//!
//! One extractor per platform, behind a registry built once at startup so
//! platform dispatch is an exhaustive `match` instead of a runtime map
//! that can silently miss. Every extractor follows the same strategy:
//!
//! 1. An embedded JSON-LD `Product` block wins for every field it
//!    supplies.
//! 2. Any remaining field walks an ordered list of precompiled CSS
//!    selectors; the first non-empty value wins. Later selectors exist
//!    purely for page-layout variants.
//!
//! A selector that doesn't match is an expected outcome, expressed as
//! `None` and folded over — never as an error.

pub mod amazon;
pub mod jumia;
pub mod structured;
pub mod text;

use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use tracing::warn;

use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;
use crate::domain::product::RawProduct;
use crate::domain::taxonomy;

pub use amazon::AmazonExtractor;
pub use jumia::JumiaExtractor;

/// All platform extractors, compiled once and reused for every page.
pub struct ExtractorRegistry {
    amazon: AmazonExtractor,
    jumia: JumiaExtractor,
}

impl ExtractorRegistry {
    /// Compile every selector chain. Fails fast at startup on an invalid
    /// pattern instead of surfacing mid-batch.
    pub fn new() -> Result<Self> {
        Ok(Self {
            amazon: AmazonExtractor::new()?,
            jumia: JumiaExtractor::new()?,
        })
    }

    /// Extract raw fields from `html` for the given platform.
    pub fn extract(
        &self,
        platform: Platform,
        html: &str,
        url: &str,
    ) -> Result<RawProduct, ScrapeError> {
        match platform {
            Platform::Amazon => self.amazon.extract(html, url),
            Platform::Jumia => self.jumia.extract(html, url),
        }
    }
}

/// Compile selector strings, skipping (and logging) invalid ones the way
/// the rest of the chain skips non-matching selectors.
pub(crate) fn compile_selectors(selector_strings: &[&str]) -> Result<Vec<Selector>> {
    let mut selectors = Vec::with_capacity(selector_strings.len());
    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => warn!("failed to compile selector '{selector_str}': {e}"),
        }
    }
    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(anyhow!("no valid selectors among {} patterns", selector_strings.len()));
    }
    Ok(selectors)
}

/// First non-empty, whitespace-collapsed text produced by the chain.
pub(crate) fn first_text(html: &Html, chain: &[Selector]) -> Option<String> {
    chain.iter().find_map(|selector| {
        html.select(selector)
            .map(|element| text::collapse_whitespace(&element.text().collect::<String>()))
            .find(|text| !text.is_empty())
    })
}

/// Text of the LAST match of the first selector that matches anything.
/// Breadcrumb trails want the deepest (final) crumb, not the root.
pub(crate) fn last_text(html: &Html, chain: &[Selector]) -> Option<String> {
    chain.iter().find_map(|selector| {
        html.select(selector)
            .map(|element| text::collapse_whitespace(&element.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .last()
    })
}

/// First populated attribute among `attrs` on any element the chain
/// matches, in chain order.
pub(crate) fn first_attr(html: &Html, chain: &[Selector], attrs: &[&str]) -> Option<String> {
    chain.iter().find_map(|selector| {
        html.select(selector).find_map(|element| {
            attrs.iter().find_map(|attr| {
                element
                    .value()
                    .attr(attr)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(String::from)
            })
        })
    })
}

/// Advisory currency resolution: price text symbol/code, then the URL
/// host, then the platform default. The mapper re-runs this
/// authoritatively.
pub(crate) fn advisory_currency(platform: Platform, price_text: &str, url: &str) -> String {
    if let Some(iso) = taxonomy::currency_from_text(price_text) {
        return iso.to_string();
    }
    if let Some(host) = url::Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
        if let Some(iso) = taxonomy::currency_for_host(platform, &host) {
            return iso.to_string();
        }
    }
    platform.default_currency().to_string()
}
