//! # cognitoken
//!
//! A lightweight, framework-agnostic Rust library for verifying AWS Cognito JWTs, with JWKS caching support.
//!
//! ## Features
//! - **Framework Agnostic**: Not dependent on any web framework, can be used in any Rust project.
//! - **JWKS-based**: Fetches the user pool's signing keys lazily and caches them per issuer.
//! - **RS256 Only**: The accepted algorithm comes from an allow-list, never from the token header.
//! - **Typed Payloads**: Id and access tokens decode into distinct claim types.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cognitoken::{build_issuer, Payload, Verifier, VerifierConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Describe the user pool and the app clients you accept
//!     let config = VerifierConfig::new(["<app-client-id>"], build_issuer("us-east-1_AbCdEfGhI"));
//!
//!     // 2. The key set is fetched on the first verification and cached
//!     let verifier = Verifier::new(config);
//!
//!     // 3. Verify a token taken from the Authorization header
//!     match verifier.verify_bearer("Bearer eyJraWQiOiJ...").await {
//!         Ok(Payload::Id(claims)) => println!("Hello, {}", claims.common.sub),
//!         Ok(Payload::Access(claims)) => println!("Access for client {}", claims.client_id),
//!         Err(e) => eprintln!("Authentication failed: {}", e),
//!     }
//!
//!     Ok(())
//! }
//! ```
// Module declarations for the library's internal components.
/// Typed payloads and claim checks.
mod claims;
/// Verifier and cache configuration.
mod config;
/// Defines the error type for the library.
mod error;
/// Manages JWKS fetching and caching.
mod jwks;
/// Provides JWT structural checks and decoding.
mod parser;
/// Signature verification.
mod signature;
/// The verification pipeline.
mod verifier;


// Re-exporting key types and functions for a clean public API.
pub use claims::{AccessTokenClaims, ClaimValidator, CommonClaims, IdTokenClaims, Payload, TokenUse};
pub use config::{build_issuer, build_issuer_with_domain, CacheConfig, VerifierConfig, DEFAULT_DOMAIN};
pub use error::{CognitokenError, ErrorKind, Result};
pub use jsonwebtoken::Algorithm;
pub use jwks::{jwks_url, HttpKeySetFetcher, Jwk, JwkSet, JwksCache, KeySetFetcher};
pub use parser::{DecodedToken, JwtHeader, JwtParser};
pub use signature::{SignatureVerifier, ALLOWED_ALGORITHMS};
pub use verifier::{Verifier, VerifierBuilder};
