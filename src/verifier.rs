//! # Token Verifier
//!
//! Runs the full verification pipeline for one user pool:
//!
//! 1. Structural check and decoding ([`JwtParser`])
//! 2. Key lookup by `kid` in the issuer's key set ([`JwksCache`], [`JwkSet::find_key`])
//! 3. Signature verification with an RS256 allow-list ([`SignatureVerifier`])
//! 4. Claim verification ([`ClaimValidator`])
//!
//! The first failing stage ends verification. The key set is resolved inside
//! each call, so a verification never runs before its key set is available.

use crate::claims::{unix_now, ClaimValidator, Payload, TokenUse};
use crate::config::{CacheConfig, VerifierConfig};
use crate::error::{CognitokenError, Result};
use crate::jwks::{JwkSet, JwksCache, KeySetFetcher};
use crate::parser::JwtParser;
use crate::signature::{SignatureVerifier, ALLOWED_ALGORITHMS};
use std::sync::Arc;

/// Verifies Cognito tokens for one issuer and a set of app clients.
///
/// Cloning is cheap; clones share the key set cache.
#[derive(Debug, Clone)]
pub struct Verifier {
    validator: ClaimValidator,
    cache: JwksCache,
}

impl Verifier {
    /// Creates a verifier that fetches the issuer's key set on first use.
    pub fn new(config: VerifierConfig) -> Self {
        Self::with_cache(config, JwksCache::new())
    }

    /// Creates a verifier that resolves key sets through `cache`.
    pub fn with_cache(config: VerifierConfig, cache: JwksCache) -> Self {
        Self {
            validator: ClaimValidator::new(config),
            cache,
        }
    }

    /// Creates a verifier whose cache already holds `key_set` for the issuer.
    ///
    /// The inserted entry never expires, so nothing is fetched.
    pub async fn with_key_set(config: VerifierConfig, key_set: JwkSet) -> Self {
        let cache = JwksCache::new();
        cache.insert(config.expected_issuer(), key_set).await;
        Self::with_cache(config, cache)
    }

    /// Starts building a verifier for `issuer`.
    pub fn builder(issuer: impl Into<String>) -> VerifierBuilder {
        VerifierBuilder::new(issuer)
    }

    /// The expectations enforced by this verifier.
    pub fn config(&self) -> &VerifierConfig {
        self.validator.config()
    }

    /// Verifies a token of either kind and returns its payload.
    ///
    /// The token use is taken from the payload's `token_use` claim.
    pub async fn verify(&self, token: &str) -> Result<Payload> {
        self.verify_at(token, None, unix_now()?).await
    }

    /// Verifies a token that must be of the given kind.
    pub async fn verify_as(&self, token: &str, expected_use: TokenUse) -> Result<Payload> {
        self.verify_at(token, Some(expected_use), unix_now()?).await
    }

    /// Verifies the token carried by an `Authorization: Bearer <token>` header value.
    pub async fn verify_bearer(&self, authorization: &str) -> Result<Payload> {
        let token = match authorization.trim().split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
            _ => {
                return Err(CognitokenError::structural(
                    "Authorization header is not a Bearer token",
                ));
            }
        };
        self.verify(token).await
    }

    /// Verifies a token as of `now` (seconds since the epoch).
    ///
    /// # Arguments
    ///
    /// * `token` - JWT token string
    /// * `expected_use` - Required token use; `None` infers it from the payload
    /// * `now` - Time the expiry is checked against
    pub async fn verify_at(
        &self,
        token: &str,
        expected_use: Option<TokenUse>,
        now: u64,
    ) -> Result<Payload> {
        let decoded = JwtParser::decode(token)?;

        let key_set = self.cache.get(self.config().expected_issuer()).await?;
        let jwk = key_set.find_key(&decoded.header.kid)?;

        let payload = SignatureVerifier::verify(token, jwk, ALLOWED_ALGORITHMS)?;

        if let Err(e) = self.validator.validate(&payload, now, expected_use) {
            tracing::warn!("JWT claims rejected: {}", e);
            return Err(e);
        }

        tracing::debug!(
            "JWT validation successful for user: {} ({} token)",
            payload.subject(),
            payload.token_use()
        );
        Ok(payload)
    }
}

/// Builder for [`Verifier`].
#[derive(Debug)]
pub struct VerifierBuilder {
    issuer: String,
    app_ids: Vec<String>,
    key_set: Option<JwkSet>,
    cache: Option<JwksCache>,
    cache_config: Option<CacheConfig>,
    fetcher: Option<Arc<dyn KeySetFetcher>>,
}

impl VerifierBuilder {
    fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            app_ids: Vec::new(),
            key_set: None,
            cache: None,
            cache_config: None,
            fetcher: None,
        }
    }

    /// Accepts id tokens issued to `app_id`.
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_ids.push(app_id.into());
        self
    }

    /// Accepts id tokens issued to any of `app_ids`.
    pub fn app_ids<I, S>(mut self, app_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_ids.extend(app_ids.into_iter().map(Into::into));
        self
    }

    /// Inserts a pre-supplied key set into the verifier's cache under its issuer.
    pub fn key_set(mut self, key_set: JwkSet) -> Self {
        self.key_set = Some(key_set);
        self
    }

    /// Shares an existing cache.
    pub fn cache(mut self, cache: JwksCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Configures the cache created by [`build`](Self::build).
    pub fn cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = Some(cache_config);
        self
    }

    /// Retrieves key sets through `fetcher`.
    pub fn fetcher(mut self, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Builds the verifier.
    ///
    /// A shared cache takes precedence over `cache_config` and `fetcher`. A
    /// pre-supplied key set is inserted into whichever cache is used, replacing
    /// any entry it already holds for the issuer.
    pub async fn build(self) -> Result<Verifier> {
        let config = VerifierConfig::new(self.app_ids, self.issuer);

        let cache = match (self.cache, self.fetcher) {
            (Some(cache), _) => cache,
            (None, Some(fetcher)) => JwksCache::with_fetcher(fetcher)
                .with_ttl(self.cache_config.and_then(|c| c.ttl)),
            (None, None) => JwksCache::from_config(&self.cache_config.unwrap_or_default())?,
        };

        if let Some(key_set) = self.key_set {
            cache.insert(config.expected_issuer(), key_set).await;
        }

        Ok(Verifier::with_cache(config, cache))
    }
}
