//! GitHub App credential cache
//!
//! The App private key is decoded and validated once at startup; App JWTs
//! are minted from the cached key on demand and handed to the job processor
//! with each invocation.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::InitError;

/// Clock drift allowance applied to `iat`
const JWT_BACKDATE_SECONDS: i64 = 60;

/// GitHub rejects App JWTs living longer than ten minutes
const JWT_LIFETIME_SECONDS: i64 = 9 * 60;

/// Claims of a GitHub App JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Validated App id and signing key
#[derive(Clone)]
pub struct GitHubAppCredentials {
    app_id: u64,
    key: EncodingKey,
}

impl std::fmt::Debug for GitHubAppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAppCredentials")
            .field("app_id", &self.app_id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl GitHubAppCredentials {
    /// Build from an RSA PEM private key
    pub fn from_pem(app_id: u64, pem: &[u8]) -> Result<Self, InitError> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| InitError::Credentials(format!("invalid App private key: {}", e)))?;
        Ok(Self { app_id, key })
    }

    /// Build from a base64-encoded RSA PEM private key
    pub fn from_base64_pem(app_id: u64, encoded: &str) -> Result<Self, InitError> {
        let pem = STANDARD.decode(encoded.trim()).map_err(|e| {
            InitError::Credentials(format!("App private key is not valid base64: {}", e))
        })?;
        Self::from_pem(app_id, &pem)
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// Claims for a JWT issued at `now`
    pub fn claims_at(&self, now: DateTime<Utc>) -> AppClaims {
        AppClaims {
            iat: (now - Duration::seconds(JWT_BACKDATE_SECONDS)).timestamp(),
            exp: (now + Duration::seconds(JWT_LIFETIME_SECONDS)).timestamp(),
            iss: self.app_id.to_string(),
        }
    }

    /// Mint an RS256 App JWT
    pub fn app_jwt(&self, now: DateTime<Utc>) -> Result<String, InitError> {
        encode(
            &Header::new(Algorithm::RS256),
            &self.claims_at(now),
            &self.key,
        )
        .map_err(|e| InitError::Credentials(format!("failed to sign App JWT: {}", e)))
    }
}
