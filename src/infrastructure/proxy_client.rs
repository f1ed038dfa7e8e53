//! Client for the external rotating proxy pool service
//!
//! Talks to the pool service's three endpoints (`/proxy/next`, `/proxies`,
//! `/health`) with a bounded retry policy, caches the proxy list behind a
//! short TTL, and degrades to a statically configured fallback list when
//! the service is unreachable. `next_proxy` never errors: callers get
//! `None` and must decide explicitly how to proceed without a proxy.
//!
//! Concurrency contract: the cache is a copy-on-write snapshot behind a
//! `tokio::sync::RwLock` — one refresher writes a new `Arc`'d list, any
//! number of concurrent readers clone the `Arc`. Rotation uses a relaxed
//! atomic cursor. The client is injected into the Fetcher, never reached
//! through globals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::ScrapeError;
use crate::infrastructure::config::ProxyConfig;

/// One egress proxy as reported by the pool service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyInfo {
    pub host: String,
    pub port: u16,
    #[serde(rename = "is_healthy")]
    pub is_healthy: bool,
    #[serde(rename = "last_checked")]
    pub last_checked: Option<String>,
}

impl ProxyInfo {
    /// Proxy URL usable by an HTTP client.
    #[must_use]
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Parse a "host:port" pair, as used by the fallback list and the
    /// `/proxy/next` payload.
    #[must_use]
    pub fn from_addr(addr: &str) -> Option<Self> {
        let (host, port) = addr.rsplit_once(':')?;
        let port = port.parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            port,
            is_healthy: true,
            last_checked: None,
        })
    }
}

/// Pool health summary from `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPoolStatus {
    pub total: u32,
    pub healthy: u32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct NextProxyResponse {
    proxy: String,
    #[serde(default)]
    is_healthy: bool,
    #[serde(default)]
    last_checked: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyListResponse {
    proxies: Vec<ProxyInfo>,
    #[allow(dead_code)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    stats: HealthStats,
}

#[derive(Debug, Deserialize)]
struct HealthStats {
    total_proxies: u32,
    healthy_proxies: u32,
}

/// Immutable cache snapshot; swapped whole on refresh.
struct ProxySnapshot {
    proxies: Arc<Vec<ProxyInfo>>,
    fetched_at: Instant,
}

/// Client for the rotating proxy pool service.
pub struct ProxyClient {
    http: reqwest::Client,
    config: ProxyConfig,
    cache: RwLock<Option<ProxySnapshot>>,
    cursor: AtomicUsize,
}

impl ProxyClient {
    pub fn new(config: ProxyConfig) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScrapeError::ProxyPool(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            config,
            cache: RwLock::new(None),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Next proxy to use for an outbound request, or `None` when neither
    /// the service, the cache nor the fallback list can supply one.
    pub async fn next_proxy(&self) -> Option<ProxyInfo> {
        if !self.config.enabled {
            return None;
        }

        match self.get_json::<NextProxyResponse>("/proxy/next").await {
            Ok(wire) => match ProxyInfo::from_addr(&wire.proxy) {
                Some(mut proxy) => {
                    proxy.is_healthy = wire.is_healthy;
                    proxy.last_checked = wire.last_checked;
                    Some(proxy)
                }
                None => {
                    warn!(payload = %wire.proxy, "pool service returned unparsable proxy address");
                    self.rotate_cached().await
                }
            },
            Err(e) => {
                debug!(error = %e, "proxy pool /proxy/next unavailable, rotating cached list");
                self.rotate_cached().await
            }
        }
    }

    /// The full proxy list, served from the TTL cache when fresh.
    ///
    /// On total remote failure this degrades to the configured fallback
    /// list (when enabled) or an empty set; it never errors.
    pub async fn all_proxies(&self) -> Vec<ProxyInfo> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot.to_vec();
        }

        match self.get_json::<ProxyListResponse>("/proxies").await {
            Ok(wire) => {
                let proxies = Arc::new(wire.proxies);
                let mut cache = self.cache.write().await;
                *cache = Some(ProxySnapshot {
                    proxies: Arc::clone(&proxies),
                    fetched_at: Instant::now(),
                });
                proxies.to_vec()
            }
            Err(e) => {
                warn!(error = %e, "proxy pool /proxies unavailable, using fallback list");
                self.fallback_list()
            }
        }
    }

    /// Whether the pool service reports itself healthy with at least one
    /// healthy proxy.
    pub async fn is_healthy(&self) -> bool {
        match self.get_json::<HealthResponse>("/health").await {
            Ok(health) => health.stats.healthy_proxies > 0,
            Err(_) => false,
        }
    }

    /// Pool status for operational logging.
    pub async fn status(&self) -> ProxyPoolStatus {
        match self.get_json::<HealthResponse>("/health").await {
            Ok(health) => ProxyPoolStatus {
                total: health.stats.total_proxies,
                healthy: health.stats.healthy_proxies,
                message: health.status,
            },
            Err(e) => ProxyPoolStatus {
                total: 0,
                healthy: 0,
                message: format!("pool service unreachable: {e}"),
            },
        }
    }

    /// GET a JSON payload with the pool retry policy: up to
    /// `max_attempts` tries, retrying only network errors and 5xx with
    /// 1s/2s/4s backoff; 4xx surfaces immediately.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ScrapeError> {
        let url = format!("{}{}", self.config.pool_url.trim_end_matches('/'), path);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_err = ScrapeError::ProxyPool("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            match self.http.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|e| {
                            ScrapeError::ProxyPool(format!("bad payload from {path}: {e}"))
                        });
                    }
                    if status.is_server_error() {
                        last_err = ScrapeError::ProxyPool(format!("{path} returned {status}"));
                    } else {
                        // 4xx is a contract problem, not an outage
                        return Err(ScrapeError::ProxyPool(format!("{path} returned {status}")));
                    }
                }
                Err(e) => {
                    last_err = ScrapeError::ProxyPool(format!("request to {path} failed: {e}"));
                }
            }

            if attempt < max_attempts {
                let delay = Duration::from_secs(1u64 << (attempt - 1));
                sleep(delay).await;
            }
        }

        Err(last_err)
    }

    /// Rotate over the cached (or fallback) list, healthy entries first.
    async fn rotate_cached(&self) -> Option<ProxyInfo> {
        let proxies = self.all_proxies().await;
        let healthy: Vec<&ProxyInfo> = proxies.iter().filter(|p| p.is_healthy).collect();
        let pool: Vec<&ProxyInfo> =
            if healthy.is_empty() { proxies.iter().collect() } else { healthy };
        if pool.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
        Some(pool[index].clone())
    }

    async fn fresh_snapshot(&self) -> Option<Arc<Vec<ProxyInfo>>> {
        let cache = self.cache.read().await;
        cache.as_ref().and_then(|snapshot| {
            let ttl = Duration::from_secs(self.config.cache_ttl_secs);
            (snapshot.fetched_at.elapsed() < ttl).then(|| Arc::clone(&snapshot.proxies))
        })
    }

    fn fallback_list(&self) -> Vec<ProxyInfo> {
        if !self.config.fallback_enabled {
            return Vec::new();
        }
        self.config
            .fallback_proxies
            .iter()
            .filter_map(|addr| ProxyInfo::from_addr(addr))
            .collect()
    }
}

/// Timestamp helper for logging cache ages alongside pool payloads.
#[must_use]
pub fn parse_last_checked(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
