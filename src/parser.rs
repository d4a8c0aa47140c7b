//! # JWT Parsing Module
//!
//! Structural checks and unverified decoding of compact Cognito JWTs.
//!
//! ## Features
//! - **Structural Check**: Exactly three non-empty, base64url segments
//! - **Pure Decoding**: Header, claims and signature bytes, no trust implied
//! - **Fast Failure**: Malformed input is rejected before any key lookup
//!
//! Nothing returned from this module has been verified. The claims map only
//! becomes a typed [`Payload`](crate::Payload) once the signature stage has
//! accepted it.

use crate::error::{CognitokenError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JWT Header structure.
///
/// Only headers that carry both an algorithm and a key identifier are
/// representable; anything less is rejected while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Algorithm, as stated by the token. Never trusted on its own.
    pub alg: String,
    /// Key ID
    pub kid: String,
    /// Token type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Header as it appears on the wire, before required fields are checked.
#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: Option<String>,
    kid: Option<String>,
    typ: Option<String>,
}

/// A token split into its decoded parts.
///
/// Verification decodes every part so that a malformed payload or signature is
/// a `DecodeError` before any key lookup, but only `header.kid` drives the rest
/// of the pipeline. `claims` and `signature` are exposed for inspecting a token
/// without trusting it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    /// Decoded header.
    pub header: JwtHeader,
    /// Decoded, unverified claims.
    pub claims: Map<String, Value>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// JWT Parser.
///
/// Provides structural checks and decoding without verification.
pub struct JwtParser;

impl JwtParser {
    /// Returns `true` if the token has exactly three dot-separated sections.
    pub fn has_three_sections(token: &str) -> bool {
        token.split('.').count() == 3
    }

    /// Splits a token into its header, payload and signature segments.
    ///
    /// # Arguments
    ///
    /// * `token` - JWT token string
    pub fn split(token: &str) -> Result<[&str; 3]> {
        let parts: Vec<&str> = token.split('.').collect();
        let &[header, payload, signature] = parts.as_slice() else {
            return Err(CognitokenError::structural(format!(
                "Token does not have 3 sections (found {})",
                parts.len()
            )));
        };

        if header.is_empty() || payload.is_empty() || signature.is_empty() {
            return Err(CognitokenError::structural("Token has an empty section"));
        }

        tracing::debug!(
            "JWT parts lengths - header: {}, payload: {}, signature: {}",
            header.len(),
            payload.len(),
            signature.len()
        );

        Ok([header, payload, signature])
    }

    /// Decodes a token into header, claims and signature without verifying it.
    ///
    /// # Arguments
    ///
    /// * `token` - JWT token string
    pub fn decode(token: &str) -> Result<DecodedToken> {
        let [header_part, payload_part, signature_part] = Self::split(token)?;

        let header = Self::decode_header_segment(header_part)?;

        let payload_bytes = Self::decode_segment(payload_part, "payload")?;
        let claims = match serde_json::from_slice::<Value>(&payload_bytes) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(CognitokenError::decode("JWT payload is not a JSON object"));
            }
            Err(e) => {
                return Err(CognitokenError::decode(format!(
                    "JWT payload is not valid JSON: {e}"
                )));
            }
        };

        let signature = Self::decode_segment(signature_part, "signature")?;

        Ok(DecodedToken {
            header,
            claims,
            signature,
        })
    }

    /// Decodes and checks only the header of a token.
    ///
    /// # Arguments
    ///
    /// * `token` - JWT token string
    pub fn decode_header(token: &str) -> Result<JwtHeader> {
        let [header_part, _, _] = Self::split(token)?;
        Self::decode_header_segment(header_part)
    }

    fn decode_header_segment(segment: &str) -> Result<JwtHeader> {
        let header_bytes = Self::decode_segment(segment, "header")?;

        let value: Value = serde_json::from_slice(&header_bytes)
            .map_err(|e| CognitokenError::decode(format!("JWT header is not valid JSON: {e}")))?;
        if !value.is_object() {
            return Err(CognitokenError::missing_header(
                "Token header is not found",
            ));
        }

        let raw: RawHeader = serde_json::from_value(value)
            .map_err(|e| CognitokenError::decode(format!("JWT header is malformed: {e}")))?;

        let alg = match raw.alg {
            Some(alg) if !alg.is_empty() => alg,
            _ => {
                return Err(CognitokenError::missing_header(
                    "Token header does not contain alg",
                ));
            }
        };
        let kid = match raw.kid {
            Some(kid) if !kid.is_empty() => kid,
            _ => {
                return Err(CognitokenError::missing_key_id(
                    "Token header does not contain kid",
                ));
            }
        };

        Ok(JwtHeader {
            alg,
            kid,
            typ: raw.typ,
        })
    }

    /// Base64url-decodes one segment. Padding is rejected, as compact JWTs never carry it.
    fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>> {
        general_purpose::URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| {
                tracing::warn!("JWT {} is not valid base64url: {}", name, e);
                CognitokenError::decode(format!("JWT {name} is not valid base64url: {e}"))
            })
    }
}
