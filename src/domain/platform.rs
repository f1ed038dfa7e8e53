//! Supported e-commerce platforms and URL-based platform detection
//!
//! Each platform is a variant of a closed enum so that dispatch over
//! platforms is checked exhaustively at compile time. A variant owns the
//! site characteristics the pipeline needs: domain suffixes, the price
//! range considered plausible for listings on that site, the default
//! currency and the canonical host used to resolve relative asset URLs.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::domain::errors::ScrapeError;

/// E-commerce platforms this engine knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Jumia,
}

/// Inclusive price validity range for a platform, in its default currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl Platform {
    /// All platforms, in detection precedence order.
    pub const ALL: [Platform; 2] = [Platform::Amazon, Platform::Jumia];

    /// Domain suffixes owned by this platform.
    ///
    /// A URL host matches when it equals a suffix or ends with `.<suffix>`,
    /// so `www.amazon.de` matches `amazon.de`.
    #[must_use]
    pub const fn domain_suffixes(&self) -> &'static [&'static str] {
        match self {
            Self::Amazon => &[
                "amazon.com",
                "amazon.co.uk",
                "amazon.de",
                "amazon.fr",
                "amazon.it",
                "amazon.es",
                "amazon.nl",
                "amazon.se",
                "amazon.ca",
                "amazon.com.mx",
                "amazon.com.br",
                "amazon.co.jp",
                "amazon.in",
                "amazon.com.au",
                "amazon.ae",
                "amazon.sa",
                "amazon.eg",
            ],
            Self::Jumia => &[
                "jumia.com.ng",
                "jumia.co.ke",
                "jumia.com.eg",
                "jumia.com.gh",
                "jumia.com.tn",
                "jumia.ma",
                "jumia.ci",
                "jumia.sn",
                "jumia.ug",
                "jumia.dz",
                "jumia.com",
            ],
        }
    }

    /// Price range accepted during mapping.
    ///
    /// Jumia listings are priced in naira and friends, so the ceiling is
    /// far looser than Amazon's; Amazon in turn accepts cent-level minimums.
    #[must_use]
    pub const fn price_bounds(&self) -> PriceBounds {
        match self {
            Self::Amazon => PriceBounds { min: 0.01, max: 1_000_000.0 },
            Self::Jumia => PriceBounds { min: 1.0, max: 100_000_000.0 },
        }
    }

    /// Currency assumed when neither the price text nor the URL host
    /// resolves one.
    #[must_use]
    pub const fn default_currency(&self) -> &'static str {
        match self {
            Self::Amazon => "USD",
            Self::Jumia => "NGN",
        }
    }

    /// Canonical host used to absolutize protocol-relative and relative
    /// image URLs.
    #[must_use]
    pub const fn canonical_host(&self) -> &'static str {
        match self {
            Self::Amazon => "www.amazon.com",
            Self::Jumia => "www.jumia.com.ng",
        }
    }

    /// Uppercase name used as the NormalizedProduct id prefix.
    #[must_use]
    pub const fn id_prefix(&self) -> &'static str {
        match self {
            Self::Amazon => "AMAZON",
            Self::Jumia => "JUMIA",
        }
    }

    /// Detect the platform owning `url` by host suffix match.
    ///
    /// First match in [`Platform::ALL`] order wins. No match is a terminal,
    /// non-retryable error: retrying will not teach the engine a new site.
    pub fn detect(url: &str) -> Result<Platform, ScrapeError> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let host = parsed.host_str().ok_or_else(|| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: "url has no host".to_string(),
        })?;

        Platform::ALL
            .into_iter()
            .find(|platform| platform.matches_host(host))
            .ok_or_else(|| ScrapeError::UnsupportedPlatform { url: url.to_string() })
    }

    /// Whether `host` belongs to this platform's domain set.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.domain_suffixes()
            .iter()
            .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amazon => write!(f, "amazon"),
            Self::Jumia => write!(f, "jumia"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_amazon_from_regional_hosts() {
        for url in [
            "https://www.amazon.com/dp/B08N5WRWNW",
            "https://amazon.co.uk/gp/product/B000000000",
            "http://www.amazon.com.br/dp/B0TESTTEST",
        ] {
            assert_eq!(Platform::detect(url).unwrap(), Platform::Amazon);
        }
    }

    #[test]
    fn detects_jumia_from_regional_hosts() {
        for url in [
            "https://www.jumia.com.ng/samsung-galaxy-a15-ABC123XYZ.html",
            "https://www.jumia.co.ke/some-product-XY12.html",
        ] {
            assert_eq!(Platform::detect(url).unwrap(), Platform::Jumia);
        }
    }

    #[test]
    fn unknown_host_is_unsupported() {
        let err = Platform::detect("https://www.example.com/item/1").unwrap_err();
        assert!(matches!(err, ScrapeError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn malformed_url_is_invalid() {
        let err = Platform::detect("not a url").unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }

    #[test]
    fn suffix_match_does_not_cross_domain_boundaries() {
        // notamazon.com must not match amazon.com
        assert!(!Platform::Amazon.matches_host("notamazon.com"));
        assert!(Platform::Amazon.matches_host("smile.amazon.com"));
    }

    #[test]
    fn bounds_are_sane() {
        for platform in Platform::ALL {
            let bounds = platform.price_bounds();
            assert!(bounds.min > 0.0);
            assert!(bounds.max > bounds.min);
        }
    }
}
