//! # Signature Verification Module
//!
//! Proves that a token was signed by the selected key.
//!
//! ## Requirements
//! - Only RSA keys published by the user pool
//! - The accepted algorithms always come from the caller's allow-list, never
//!   from the algorithm the token header claims
//! - Time, audience and issuer checks are left to the claim stage

use crate::claims::Payload;
use crate::error::{CognitokenError, Result};
use crate::jwks::Jwk;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

/// Algorithms accepted for Cognito tokens.
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256];

/// Signature verifier.
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Creates a decoding key from an RSA JWK.
    ///
    /// # Arguments
    ///
    /// * `jwk` - JSON Web Key
    /// * `allowed_algorithms` - Algorithms the key may be used with
    pub fn decoding_key(jwk: &Jwk, allowed_algorithms: &[Algorithm]) -> Result<DecodingKey> {
        if jwk.kty != "RSA" {
            return Err(CognitokenError::signature(format!(
                "UnsupportedKeyType: key {} has type '{}', expected RSA",
                jwk.kid, jwk.kty
            )));
        }

        if let Some(alg) = &jwk.alg {
            let allowed = alg
                .parse::<Algorithm>()
                .is_ok_and(|alg| allowed_algorithms.contains(&alg));
            if !allowed {
                return Err(CognitokenError::signature(format!(
                    "InvalidAlgorithm: key {} is declared for {alg}",
                    jwk.kid
                )));
            }
        }

        let n = jwk.n.as_deref().ok_or_else(|| {
            CognitokenError::signature(format!("InvalidRsaKey: key {} has no modulus", jwk.kid))
        })?;
        let e = jwk.e.as_deref().ok_or_else(|| {
            CognitokenError::signature(format!("InvalidRsaKey: key {} has no exponent", jwk.kid))
        })?;

        DecodingKey::from_rsa_components(n, e).map_err(library_error)
    }

    /// Verifies the token's signature and returns its typed payload.
    ///
    /// # Arguments
    ///
    /// * `token` - JWT token string
    /// * `jwk` - The key selected by the token's key ID
    /// * `allowed_algorithms` - Algorithms accepted regardless of the header
    pub fn verify(token: &str, jwk: &Jwk, allowed_algorithms: &[Algorithm]) -> Result<Payload> {
        if allowed_algorithms.is_empty() {
            return Err(CognitokenError::signature(
                "MissingAlgorithm: no algorithm is allowed",
            ));
        }

        let decoding_key = Self::decoding_key(jwk, allowed_algorithms)?;

        let mut validation = Validation::new(allowed_algorithms[0]);
        validation.algorithms = allowed_algorithms.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)
            .map_err(|e| {
                tracing::warn!("JWT signature validation failed: {:?}", e);
                library_error(e)
            })?;

        tracing::debug!("JWT signature verified with key: {}", jwk.kid);

        Payload::from_claims(token_data.claims)
    }
}

/// Wraps a `jsonwebtoken` failure, keeping its kind name and message.
fn library_error(e: jsonwebtoken::errors::Error) -> CognitokenError {
    let kind = format!("{:?}", e.kind());
    let name = kind.split('(').next().unwrap_or(kind.as_str());
    CognitokenError::signature(format!("{name}: {e}"))
}
