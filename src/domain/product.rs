//! Product data model for the extraction pipeline
//!
//! `RawProduct` is the ephemeral output of an extractor, consumed
//! immediately by the mapper and never persisted. `NormalizedProduct` is
//! the canonical record handed to the repository; ownership passes on save
//! and this engine never mutates it afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;

/// A monetary amount with its ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Non-negative amount; platform-specific bounds apply during mapping.
    pub amount: f64,
    /// 3-letter ISO 4217 code, e.g. "USD", "NGN".
    pub currency: String,
}

impl Price {
    #[must_use]
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self { amount, currency: currency.into() }
    }

    /// General sanity bound applied before platform-specific validation.
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        self.amount >= 0.0 && self.amount < 1e9
    }
}

/// Raw field values pulled out of a page, prior to normalization.
///
/// Title and price are the only required fields; everything else degrades
/// to `None` (or 0 for the review count) without failing extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub title: String,
    pub price: Price,
    /// Advisory only; the mapper re-resolves the authoritative currency.
    pub rating: Option<f32>,
    pub rating_count: u32,
    pub image_url: Option<String>,
    /// Raw breadcrumb text as the page presented it.
    pub platform_category: Option<String>,
    /// ASIN / SKU. Never fabricated: absent stays `None`.
    pub platform_id: Option<String>,
}

/// Canonical, validated product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    /// Deterministic id: `<PLATFORM>-<truncated blake3(url + title)>`.
    pub id: String,
    pub title: String,
    pub price: f64,
    pub currency: String,
    /// Classified category bucket, or the raw text, or "General".
    pub category: String,
    pub platform: Platform,
    #[serde(rename = "platformId")]
    pub platform_id: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub rating: Option<f32>,
    #[serde(rename = "ratingCount")]
    pub rating_count: u32,
    /// 0–1 data-quality signal, two decimals. Not a pass/fail gate.
    #[serde(rename = "completenessScore")]
    pub completeness_score: f64,
    #[serde(rename = "scrapedAt")]
    pub scraped_at: DateTime<Utc>,
}
