//! Defines the error type that can occur during token verification.
//!
//! Every failure in the pipeline is reported as a single [`CognitokenError`]
//! value carrying an [`ErrorKind`] tag and a human readable message, so callers
//! can branch on the kind without matching on a type hierarchy.

use std::fmt;
use thiserror::Error;

/// The category of a verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The token is not made of exactly three non-empty segments.
    StructuralError,
    /// A segment is not valid base64url, or not valid JSON.
    DecodeError,
    /// The token header lacks the fields required for verification.
    MissingHeaderError,
    /// The token header does not name a key identifier.
    MissingKeyIdError,
    /// No key in the key set matches the token's key identifier.
    KeyNotFoundError,
    /// Cryptographic verification failed.
    SignatureError,
    /// Audience, issuer, expiry or token-use did not match.
    ClaimRejectedError,
    /// The `token_use` claim is neither `id` nor `access`.
    InvalidTokenUseError,
    /// The key set could not be retrieved.
    FetchError,
}

impl ErrorKind {
    /// Returns the kind's name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StructuralError => "StructuralError",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::MissingHeaderError => "MissingHeaderError",
            ErrorKind::MissingKeyIdError => "MissingKeyIdError",
            ErrorKind::KeyNotFoundError => "KeyNotFoundError",
            ErrorKind::SignatureError => "SignatureError",
            ErrorKind::ClaimRejectedError => "ClaimRejectedError",
            ErrorKind::InvalidTokenUseError => "InvalidTokenUseError",
            ErrorKind::FetchError => "FetchError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents an error that occurred while verifying a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CognitokenError {
    kind: ErrorKind,
    message: String,
}

impl CognitokenError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error's message, without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` when the failure came from retrieving the key set rather
    /// than from the token itself.
    pub fn is_fetch_error(&self) -> bool {
        self.kind == ErrorKind::FetchError
    }

    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StructuralError, message)
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeError, message)
    }

    pub(crate) fn missing_header(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingHeaderError, message)
    }

    pub(crate) fn missing_key_id(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingKeyIdError, message)
    }

    pub(crate) fn key_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyNotFoundError, message)
    }

    pub(crate) fn signature(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureError, message)
    }

    pub(crate) fn claim_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClaimRejectedError, message)
    }

    pub(crate) fn invalid_token_use(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTokenUseError, message)
    }

    pub(crate) fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FetchError, message)
    }
}

/// A specialized `Result` for token verification.
pub type Result<T> = std::result::Result<T, CognitokenError>;
