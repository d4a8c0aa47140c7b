//! Verifier and cache configuration.

use crate::jwks::DEFAULT_HTTP_TIMEOUT;
use std::collections::BTreeSet;
use std::time::Duration;

/// Domain of the Cognito identity provider endpoints.
pub const DEFAULT_DOMAIN: &str = "amazonaws.com";

/// Builds the issuer URL of a Cognito user pool.
///
/// The region is the part of the pool id before the first underscore, so
/// `us-east-1_AbCdEf` yields `https://cognito-idp.us-east-1.amazonaws.com/us-east-1_AbCdEf`.
pub fn build_issuer(user_pool_id: &str) -> String {
    build_issuer_with_domain(user_pool_id, DEFAULT_DOMAIN)
}

/// Like [`build_issuer`], for a partition with a different domain
/// (e.g. `amazonaws.com.cn`).
pub fn build_issuer_with_domain(user_pool_id: &str, domain: &str) -> String {
    let region = user_pool_id.split('_').next().unwrap_or(user_pool_id);
    format!("https://cognito-idp.{region}.{domain}/{user_pool_id}")
}

/// What a token must carry to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    expected_audiences: BTreeSet<String>,
    expected_issuer: String,
}

impl VerifierConfig {
    /// Creates a configuration accepting id tokens for any of `app_ids`.
    ///
    /// # Arguments
    ///
    /// * `app_ids` - App client ids of the user pool
    /// * `issuer` - Expected `iss` claim
    pub fn new<I, S>(app_ids: I, issuer: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected_audiences: app_ids.into_iter().map(Into::into).collect(),
            expected_issuer: issuer.into(),
        }
    }

    /// Creates a configuration for a user pool, deriving the issuer from its id.
    pub fn for_user_pool<I, S>(user_pool_id: &str, app_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(app_ids, build_issuer(user_pool_id))
    }

    /// Audiences accepted for id tokens.
    pub fn expected_audiences(&self) -> &BTreeSet<String> {
        &self.expected_audiences
    }

    /// The expected issuer.
    pub fn expected_issuer(&self) -> &str {
        &self.expected_issuer
    }
}

/// Key set cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a fetched key set is served. `None` keeps it for the life of the cache.
    pub ttl: Option<Duration>,
    /// Timeout for a single key set request.
    pub http_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}
