// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound service-user tokens.
//!
//! A service user holds a registered RSA key pair. Tokens it signs carry its
//! key id both in the header and as a `kid` claim, which is what the
//! verifier uses to look the public key up.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Issuer of service-user tokens minted here.
pub const SERVICE_USER_ISSUER: &str = "//authgate";

/// Default token lifetime (12 hours).
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(12 * 60 * 60);

/// Cached tokens are replaced this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// A service user's signing credential.
#[derive(Clone, Deserialize)]
pub struct ServiceUserCredential {
    pub principal_id: String,
    #[serde(rename = "kid")]
    pub key_id: String,
    /// RSA private key, PEM encoded
    pub private_key: String,
}

impl fmt::Debug for ServiceUserCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceUserCredential")
            .field("principal_id", &self.principal_id)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ServiceUserClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    kid: &'a str,
    jti: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Mints and caches bearer tokens for a service user.
pub struct ServiceUserTokenSource {
    principal_id: String,
    key_id: String,
    key: EncodingKey,
    validity: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceUserTokenSource {
    /// Parse the credential's private key.
    pub fn new(credential: &ServiceUserCredential) -> Result<Self, ConfigError> {
        if credential.principal_id.is_empty() || credential.key_id.is_empty() {
            return Err(ConfigError::InvalidCredential(
                "principal id and key id are required".to_string(),
            ));
        }
        let key = EncodingKey::from_rsa_pem(credential.private_key.as_bytes())
            .map_err(|e| ConfigError::InvalidCredential(e.to_string()))?;

        Ok(Self {
            principal_id: credential.principal_id.clone(),
            key_id: credential.key_id.clone(),
            key,
            validity: DEFAULT_TOKEN_VALIDITY,
            cached: Mutex::new(None),
        })
    }

    /// Set the token lifetime.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// A signed token, reused until shortly before it expires.
    pub fn token(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let margin = REFRESH_MARGIN.as_secs() as i64;
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = cached.as_ref() {
            if now + margin < entry.expires_at {
                return Ok(entry.token.clone());
            }
        }

        let expires_at = now + (self.validity.as_secs() as i64);
        let token = self.mint(now, expires_at)?;
        tracing::debug!(
            principal_id = %self.principal_id,
            kid = %self.key_id,
            expires_at,
            "Minted service-user token"
        );
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    /// `Authorization` header value for outbound calls.
    pub fn authorization(&self) -> Result<String, jsonwebtoken::errors::Error> {
        Ok(format!("Bearer {}", self.token()?))
    }

    fn mint(&self, now: i64, expires_at: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());

        let claims = ServiceUserClaims {
            iss: SERVICE_USER_ISSUER,
            sub: &self.principal_id,
            kid: &self.key_id,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            nbf: now,
            exp: expires_at,
        };
        encode(&header, &claims, &self.key)
    }
}

impl fmt::Debug for ServiceUserTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceUserTokenSource")
            .field("principal_id", &self.principal_id)
            .field("key_id", &self.key_id)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}
