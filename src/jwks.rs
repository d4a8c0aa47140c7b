//! # JWKS (JSON Web Key Set) Cache Management Module
//!
//! Per-issuer key set cache for Cognito user pools.
//!
//! ## Features
//! - **Lazy Fetching**: A key set is fetched the first time an issuer is asked for
//! - **Single Flight**: Concurrent first requests for one issuer share one fetch
//! - **Issuer Isolation**: Fetching one issuer never blocks readers of another
//! - **Optional TTL**: Entries are append-only unless a TTL is configured
//!
//! ## Caching Strategy
//! 1. Uses the cached entry for the issuer when present (and fresh)
//! 2. Otherwise fetches `{issuer}/.well-known/jwks.json` once and stores it
//! 3. A failed fetch is surfaced immediately and leaves nothing cached

use crate::config::CacheConfig;
use crate::error::{CognitokenError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;

/// Default timeout for key set requests.
pub(crate) const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Global HTTP client instance with a connection pool.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
});

/// Represents a JSON Web Key (JWK) as published by a user pool.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Jwk {
    /// Key ID.
    pub kid: String,
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Algorithm (e.g., "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key usage (e.g., "sig").
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// Represents the document served at a JWKS endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct JwkSet {
    /// A list of JSON Web Keys, in publication order.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Finds a key by its Key ID.
    ///
    /// Key IDs are expected to be unique; if they are not, the first match wins.
    ///
    /// # Arguments
    ///
    /// * `kid` - The Key ID
    pub fn find_key(&self, kid: &str) -> Result<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid).ok_or_else(|| {
            tracing::warn!("Key with kid '{}' not found in JWKS", kid);
            CognitokenError::key_not_found(format!("kid '{kid}' is not found on set"))
        })
    }
}

/// Builds the well-known JWKS URL for an issuer.
pub fn jwks_url(issuer: &str) -> String {
    format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/'))
}

/// Retrieves a key set document from a JWKS endpoint.
#[async_trait]
pub trait KeySetFetcher: Send + Sync + fmt::Debug {
    /// Fetches and parses the key set served at `jwks_url`.
    async fn fetch(&self, jwks_url: &str) -> Result<JwkSet>;
}

/// [`KeySetFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
}

impl Default for HttpKeySetFetcher {
    fn default() -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
        }
    }
}

impl HttpKeySetFetcher {
    /// Creates a fetcher with its own client and request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        if timeout == DEFAULT_HTTP_TIMEOUT {
            return Ok(Self::default());
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CognitokenError::fetch(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self, jwks_url: &str) -> Result<JwkSet> {
        tracing::info!("Fetching JWKS from: {}", jwks_url);

        let response = self.client.get(jwks_url).send().await.map_err(|e| {
            let error_msg = format!("Cannot retrieve jwk set from server: {e}");
            tracing::error!("{}", error_msg);
            CognitokenError::fetch(error_msg)
        })?;

        if response.status() != reqwest::StatusCode::OK {
            let error_msg = format!("JWKS endpoint returned status: {}", response.status());
            tracing::error!("{}", error_msg);
            return Err(CognitokenError::fetch(error_msg));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            let error_msg = format!("Failed to parse JWKS response: {e}");
            tracing::error!("{}", error_msg);
            CognitokenError::fetch(error_msg)
        })
    }
}

/// A key set held by the cache for one issuer.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    issuer: String,
    key_set: Arc<JwkSet>,
    fetched_at: Instant,
    /// When the entry stops being served; `None` means never.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires| now < expires)
    }
}

type Slot = Arc<OnceCell<CacheEntry>>;

/// Caches key sets per issuer.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone)]
pub struct JwksCache {
    /// One slot per issuer; a slot is filled at most once.
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    fetcher: Arc<dyn KeySetFetcher>,
    ttl: Option<Duration>,
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksCache {
    /// Creates an append-only cache that fetches over HTTPS.
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpKeySetFetcher::default()))
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let fetcher = HttpKeySetFetcher::with_timeout(config.http_timeout)?;
        Ok(Self::with_fetcher(Arc::new(fetcher)).with_ttl(config.ttl))
    }

    /// Creates a cache that retrieves key sets through `fetcher`.
    pub fn with_fetcher(fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            fetcher,
            ttl: None,
        }
    }

    /// Sets how long fetched entries are served. `None` keeps them forever.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the key set for `issuer`, fetching it on first use.
    ///
    /// # Arguments
    ///
    /// * `issuer` - The token issuer, e.g. `https://cognito-idp.<region>.amazonaws.com/<pool>`
    pub async fn get(&self, issuer: &str) -> Result<Arc<JwkSet>> {
        let mut slot = self.slot(issuer).await;

        if let Some(entry) = slot.get() {
            if entry.is_fresh(Instant::now()) {
                tracing::debug!("Using cached JWKS for issuer: {}", entry.issuer);
                return Ok(Arc::clone(&entry.key_set));
            }
            tracing::debug!(
                "Cached JWKS for issuer {} has expired (age: {}s)",
                entry.issuer,
                entry.fetched_at.elapsed().as_secs()
            );
        }

        if slot.initialized() {
            self.evict(issuer, &slot).await;
            slot = self.slot(issuer).await;
        }

        let entry = slot.get_or_try_init(|| self.fetch_entry(issuer)).await?;
        Ok(Arc::clone(&entry.key_set))
    }

    /// Stores a key set for `issuer`, replacing any cached one.
    ///
    /// Inserted entries never expire.
    pub async fn insert(&self, issuer: &str, key_set: JwkSet) {
        let entry = CacheEntry {
            issuer: issuer.to_string(),
            key_set: Arc::new(key_set),
            fetched_at: Instant::now(),
            expires_at: None,
        };
        self.slots
            .write()
            .await
            .insert(issuer.to_string(), Arc::new(OnceCell::from(entry)));
    }

    /// Drops the entry for `issuer`. Returns `true` if there was one.
    pub async fn invalidate(&self, issuer: &str) -> bool {
        let removed = self.slots.write().await.remove(issuer);
        removed.is_some_and(|slot| slot.initialized())
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    /// Returns `true` if a key set is currently cached for `issuer`.
    pub async fn contains(&self, issuer: &str) -> bool {
        self.slots
            .read()
            .await
            .get(issuer)
            .and_then(|slot| slot.get())
            .is_some_and(|entry| entry.is_fresh(Instant::now()))
    }

    async fn slot(&self, issuer: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(issuer) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(issuer.to_string()).or_default())
    }

    /// Removes `stale` if it is still the slot registered for `issuer`.
    async fn evict(&self, issuer: &str, stale: &Slot) {
        let mut slots = self.slots.write().await;
        if slots
            .get(issuer)
            .is_some_and(|current| Arc::ptr_eq(current, stale))
        {
            slots.remove(issuer);
        }
    }

    async fn fetch_entry(&self, issuer: &str) -> Result<CacheEntry> {
        let key_set = self.fetcher.fetch(&jwks_url(issuer)).await?;

        if key_set.keys.is_empty() {
            let error_msg = "JWKS response contains no keys";
            tracing::error!("{} (issuer: {})", error_msg, issuer);
            return Err(CognitokenError::fetch(error_msg));
        }

        let fetched_at = Instant::now();
        tracing::info!(
            "JWKS cache updated for issuer {} ({} keys)",
            issuer,
            key_set.keys.len()
        );
        Ok(CacheEntry {
            issuer: issuer.to_string(),
            key_set: Arc::new(key_set),
            fetched_at,
            expires_at: self.ttl.map(|ttl| fetched_at + ttl),
        })
    }
}
