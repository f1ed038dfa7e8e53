//! Validated product URL value object
//!
//! A `ProductUrl` is only constructible through [`ProductUrl::parse`], so
//! every instance in the pipeline already satisfies the invariants: http or
//! https scheme, at most 500 characters, and a host belonging to the
//! claimed platform's domain set.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::domain::errors::ScrapeError;
use crate::domain::platform::Platform;

/// Maximum accepted URL length, matching the catalog column width.
pub const MAX_URL_LEN: usize = 500;

/// A product page URL known to belong to `platform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUrl {
    url: String,
    platform: Platform,
}

impl ProductUrl {
    /// Validate `raw` against the invariants and the claimed platform.
    pub fn parse(raw: &str, platform: Platform) -> Result<Self, ScrapeError> {
        if raw.len() > MAX_URL_LEN {
            return Err(ScrapeError::InvalidUrl {
                url: truncate_for_error(raw),
                reason: format!("url exceeds {MAX_URL_LEN} characters"),
            });
        }

        let parsed = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let host = parsed.host_str().ok_or_else(|| ScrapeError::InvalidUrl {
            url: raw.to_string(),
            reason: "url has no host".to_string(),
        })?;

        if !platform.matches_host(host) {
            return Err(ScrapeError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("host '{host}' does not belong to platform '{platform}'"),
            });
        }

        Ok(Self { url: raw.to_string(), platform })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }
}

impl AsRef<str> for ProductUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl From<ProductUrl> for String {
    fn from(product_url: ProductUrl) -> Self {
        product_url.url
    }
}

impl fmt::Display for ProductUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn truncate_for_error(raw: &str) -> String {
    raw.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_platform_url() {
        let url = ProductUrl::parse("https://www.amazon.com/dp/B08N5WRWNW", Platform::Amazon)
            .unwrap();
        assert_eq!(url.platform(), Platform::Amazon);
        assert_eq!(url.as_str(), "https://www.amazon.com/dp/B08N5WRWNW");
    }

    #[test]
    fn rejects_host_platform_mismatch() {
        let err =
            ProductUrl::parse("https://www.jumia.com.ng/item-AB12.html", Platform::Amazon)
                .unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = ProductUrl::parse("ftp://www.amazon.com/dp/B08N5WRWNW", Platform::Amazon)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_overlong_urls() {
        let raw = format!("https://www.amazon.com/dp/{}", "a".repeat(600));
        let err = ProductUrl::parse(&raw, Platform::Amazon).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }
}
