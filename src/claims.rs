//! # Cognito Claims Module
//!
//! Typed payloads for the two kinds of Cognito tokens and the claim checks
//! that decide whether a verified token is accepted.
//!
//! ## Token kinds
//! - **Id tokens** (`token_use: "id"`): carry the user's identity and an `aud`
//!   claim naming the app client.
//! - **Access tokens** (`token_use: "access"`): carry scopes and a `client_id`,
//!   but no `aud` claim, so only issuer, expiry and token use are checked.

use crate::config::VerifierConfig;
use crate::error::{CognitokenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Discriminant of a Cognito token, the `token_use` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// An id token.
    Id,
    /// An access token.
    Access,
}

impl TokenUse {
    /// Returns the wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenUse::Id => "id",
            TokenUse::Access => "access",
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenUse {
    type Err = CognitokenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(TokenUse::Id),
            "access" => Ok(TokenUse::Access),
            other => Err(CognitokenError::invalid_token_use(format!(
                "Invalid token use: {other}"
            ))),
        }
    }
}

/// Claims shared by id and access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Identifier of the authentication event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Time the user authenticated.
    pub auth_time: u64,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: u64,
    /// Issued-at time.
    pub iat: u64,
    /// Identifier of the refresh token family this token was issued from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_jti: Option<String>,
    /// Groups the user belongs to.
    #[serde(
        rename = "cognito:groups",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub groups: Option<Vec<String>>,
}

/// Claims of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Claims shared with id tokens.
    #[serde(flatten)]
    pub common: CommonClaims,
    /// Space separated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Token ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// App client the token was issued to.
    pub client_id: String,
    /// User name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl AccessTokenClaims {
    /// Iterates the individual scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split_whitespace()
    }

    /// Returns `true` if the token grants `scope`.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }
}

/// Claims of an id token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Claims shared with access tokens.
    #[serde(flatten)]
    pub common: CommonClaims,
    /// Audience, the app client id.
    pub aud: String,
    /// Whether the email address has been verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Whether the phone number has been verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_verified: Option<bool>,
    /// Full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User name in the pool.
    #[serde(
        rename = "cognito:username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cognito_username: Option<String>,
    /// Access token hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,
}

/// A verified token payload, shaped by its `token_use`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "token_use")]
pub enum Payload {
    /// An id token.
    #[serde(rename = "id")]
    Id(IdTokenClaims),
    /// An access token.
    #[serde(rename = "access")]
    Access(AccessTokenClaims),
}

impl Payload {
    /// Builds a typed payload from a claims object, dispatching on `token_use`.
    ///
    /// An unknown `token_use` is an `InvalidTokenUseError`; claims that do not
    /// fit the selected shape are a `DecodeError`.
    pub fn from_claims(claims: Map<String, Value>) -> Result<Self> {
        let token_use = match claims.get("token_use") {
            Some(Value::String(token_use)) => token_use.parse::<TokenUse>()?,
            Some(other) => {
                return Err(CognitokenError::invalid_token_use(format!(
                    "Invalid token use: {other}"
                )));
            }
            None => {
                return Err(CognitokenError::invalid_token_use(
                    "Token does not contain token_use",
                ));
            }
        };

        let value = Value::Object(claims);
        let payload = match token_use {
            TokenUse::Id => serde_json::from_value(value).map(Payload::Id),
            TokenUse::Access => serde_json::from_value(value).map(Payload::Access),
        };
        payload.map_err(|e| {
            CognitokenError::decode(format!("Invalid {token_use} token claims: {e}"))
        })
    }

    /// The token's kind.
    pub fn token_use(&self) -> TokenUse {
        match self {
            Payload::Id(_) => TokenUse::Id,
            Payload::Access(_) => TokenUse::Access,
        }
    }

    /// Claims shared by both kinds.
    pub fn common(&self) -> &CommonClaims {
        match self {
            Payload::Id(claims) => &claims.common,
            Payload::Access(claims) => &claims.common,
        }
    }

    /// Subject (user ID).
    pub fn subject(&self) -> &str {
        &self.common().sub
    }

    /// Issuer.
    pub fn issuer(&self) -> &str {
        &self.common().iss
    }

    /// Expiration time, in seconds since the epoch.
    pub fn expires_at(&self) -> u64 {
        self.common().exp
    }

    /// Issued-at time, in seconds since the epoch.
    pub fn issued_at(&self) -> u64 {
        self.common().iat
    }

    /// Audience; only id tokens carry one.
    pub fn audience(&self) -> Option<&str> {
        match self {
            Payload::Id(claims) => Some(&claims.aud),
            Payload::Access(_) => None,
        }
    }

    /// The id token claims, if this is an id token.
    pub fn as_id(&self) -> Option<&IdTokenClaims> {
        match self {
            Payload::Id(claims) => Some(claims),
            Payload::Access(_) => None,
        }
    }

    /// The access token claims, if this is an access token.
    pub fn as_access(&self) -> Option<&AccessTokenClaims> {
        match self {
            Payload::Access(claims) => Some(claims),
            Payload::Id(_) => None,
        }
    }
}

/// Current time in seconds since the epoch.
pub(crate) fn unix_now() -> Result<u64> {
    seconds_since_epoch(SystemTime::now())
}

/// Seconds since the epoch for `time`. A time before the epoch is a `ClaimRejectedError`.
pub(crate) fn seconds_since_epoch(time: SystemTime) -> Result<u64> {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| {
            tracing::error!("System clock is before the Unix epoch: {}", e);
            CognitokenError::claim_rejected(format!("System clock is before the Unix epoch: {e}"))
        })
}

/// Decides whether a verified payload is acceptable.
#[derive(Debug, Clone)]
pub struct ClaimValidator {
    config: VerifierConfig,
}

impl ClaimValidator {
    /// Creates a validator for the given expectations.
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// The expectations this validator enforces.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Checks token use, issuer, expiry and (for id tokens) audience.
    ///
    /// # Arguments
    ///
    /// * `payload` - Verified payload
    /// * `now` - Current time, in seconds since the epoch
    /// * `expected_use` - Required token use; `None` accepts either kind
    pub fn validate(
        &self,
        payload: &Payload,
        now: u64,
        expected_use: Option<TokenUse>,
    ) -> Result<()> {
        if let Some(expected) = expected_use {
            if payload.token_use() != expected {
                return Err(CognitokenError::claim_rejected(format!(
                    "Verification failed: expected {expected} token, got {}",
                    payload.token_use()
                )));
            }
        }

        if payload.issuer() != self.config.expected_issuer() {
            return Err(CognitokenError::claim_rejected(format!(
                "Verification failed: wrong iss {}",
                payload.issuer()
            )));
        }

        // Equal to now counts as expired.
        if payload.expires_at() <= now {
            return Err(CognitokenError::claim_rejected(format!(
                "Verification failed: token expired at {}",
                payload.expires_at()
            )));
        }

        if let Payload::Id(claims) = payload {
            if !self.config.expected_audiences().contains(&claims.aud) {
                return Err(CognitokenError::claim_rejected(format!(
                    "Verification failed: wrong aud {}",
                    claims.aud
                )));
            }
        }

        Ok(())
    }
}
