// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! ## Key selection
//!
//! 1. The token is decoded *without* verification, only to read the routing
//!    claims: the generator marker `gen`, the subject and the key id.
//! 2. `gen == "system"`: the token was minted by the authorization service
//!    and is verified against the platform key set.
//! 3. Anything else is a principal-issued token. The key registered for
//!    (subject, key id) is fetched from the authorization service and the
//!    token is verified against that key only.
//!
//! Nothing read in step 1 is returned to callers. Claims always come from
//! the verified decode in step 2 or 3.

use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::claims::{Claims, SYSTEM_GENERATOR};
use super::error::AuthError;
use super::jwks::KeySetCache;
use crate::client::{describe, forwarded_headers, ServiceEndpoint};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims read from the unverified payload to pick a key.
#[derive(Debug, Clone, Default, Deserialize)]
struct RoutingClaims {
    #[serde(default)]
    gen: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    kid: Option<Value>,
}

/// Which key a token must be verified against.
#[derive(Debug, PartialEq, Eq)]
enum KeySource {
    Platform { kid: Option<String> },
    Principal { subject: String, kid: String },
}

/// Verifies raw tokens and returns their claims.
#[derive(Clone)]
pub struct TokenVerifier {
    endpoint: ServiceEndpoint,
    client: reqwest::Client,
    key_set: Arc<dyn KeySetCache>,
}

impl TokenVerifier {
    pub fn new(
        endpoint: ServiceEndpoint,
        client: reqwest::Client,
        key_set: Arc<dyn KeySetCache>,
    ) -> Self {
        Self {
            endpoint,
            client,
            key_set,
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// `headers` are the inbound request headers, forwarded on the principal
    /// key lookup.
    pub async fn verify(&self, token: &str, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let verified = match route(token)? {
            KeySource::Platform { kid } => self.verify_platform(token, kid.as_deref()).await?,
            KeySource::Principal { subject, kid } => {
                let jwk = self.fetch_principal_key(&subject, &kid, headers).await?;
                verify_with_jwk(token, &jwk)?
            }
        };

        let claims = Claims::from_verified(verified);
        if claims.expires_at().is_none() {
            return Err(AuthError::InvalidToken("missing exp claim".to_string()));
        }
        Ok(claims)
    }

    async fn verify_platform(
        &self,
        token: &str,
        kid: Option<&str>,
    ) -> Result<Map<String, Value>, AuthError> {
        let jwks = self.key_set.get().await?;

        let Some(kid) = kid else {
            return verify_with_any(token, &jwks);
        };

        let jwks = if jwks.find(kid).is_some() {
            jwks
        } else {
            // Possibly a rotated key; refresh is bounded by the cache's floor.
            tracing::debug!(kid, "Token key id not in platform key set, refreshing");
            self.key_set.refresh().await?
        };

        let jwk = jwks
            .find(kid)
            .ok_or_else(|| AuthError::InvalidToken("no platform key matches token kid".to_string()))?;
        verify_with_jwk(token, jwk)
    }

    /// Fetch the public key registered for (subject, key id).
    async fn fetch_principal_key(
        &self,
        subject: &str,
        kid: &str,
        headers: &HeaderMap,
    ) -> Result<Jwk, AuthError> {
        let url = self
            .endpoint
            .principal_key_url(subject, kid)
            .ok_or_else(|| AuthError::InvalidToken("unusable subject or key id".to_string()))?;

        let response = self
            .client
            .get(url)
            .headers(forwarded_headers(headers))
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(describe(e)))?;

        if !response.status().is_success() {
            tracing::warn!(
                principal_id = subject,
                kid,
                status = %response.status(),
                "Principal key lookup rejected"
            );
            return Err(AuthError::InvalidToken(format!(
                "principal key lookup returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::KeyFetch(describe(e)))?;

        select_principal_key(&body, kid)
    }
}

/// Decide which key verifies `token`, from its unverified contents.
fn route(token: &str) -> Result<KeySource, AuthError> {
    let peek = jsonwebtoken::dangerous::insecure_decode::<RoutingClaims>(token)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    let header_kid = peek.header.kid.filter(|k| !k.is_empty());
    let RoutingClaims { gen, sub, kid } = peek.claims;

    if gen.as_ref().and_then(Value::as_str) == Some(SYSTEM_GENERATOR) {
        return Ok(KeySource::Platform { kid: header_kid });
    }

    let subject = sub
        .as_ref()
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("missing subject".to_string()))?
        .to_string();
    let kid = kid
        .as_ref()
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or(header_kid)
        .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;

    Ok(KeySource::Principal { subject, kid })
}

/// Pick the key with id `kid` out of a principal key response.
///
/// Accepts either a key set or a single key. A lone key without an id is
/// taken as the key registered under the requested id.
fn select_principal_key(body: &[u8], kid: &str) -> Result<Jwk, AuthError> {
    let keys = match serde_json::from_slice::<JwkSet>(body) {
        Ok(set) => set.keys,
        Err(_) => vec![serde_json::from_slice::<Jwk>(body)
            .map_err(|e| AuthError::InvalidToken(format!("unreadable principal key: {e}")))?],
    };

    if let Some(jwk) = keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
    {
        return Ok(jwk.clone());
    }
    match keys.as_slice() {
        [only] if only.common.key_id.is_none() => Ok(only.clone()),
        _ => Err(AuthError::InvalidToken("principal key not found".to_string())),
    }
}

/// Try every key in the set; used for tokens without a `kid` header.
fn verify_with_any(token: &str, jwks: &JwkSet) -> Result<Map<String, Value>, AuthError> {
    for jwk in &jwks.keys {
        match verify_with_jwk(token, jwk) {
            Ok(claims) => return Ok(claims),
            // The signature matched; the claims did not.
            Err(AuthError::TokenExpired) => return Err(AuthError::TokenExpired),
            Err(_) => continue,
        }
    }
    Err(AuthError::InvalidToken("no platform key verifies token".to_string()))
}

/// Verify the signature and standard claims of `token` against one key.
fn verify_with_jwk(token: &str, jwk: &Jwk) -> Result<Map<String, Value>, AuthError> {
    let (decoding_key, algorithms) = jwk_to_decoding_key(jwk)?;

    let mut validation = Validation::new(algorithms[0]);
    validation.algorithms = algorithms;
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Map<String, Value>>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => {
                AuthError::InvalidToken("signature mismatch".to_string())
            }
            ErrorKind::ImmatureSignature => {
                AuthError::InvalidToken("token not yet valid".to_string())
            }
            ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidToken("algorithm does not match key".to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::InvalidToken(format!("missing {claim} claim"))
            }
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

/// Convert a JWK to a DecodingKey and the algorithms it may verify.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Vec<Algorithm>), AuthError> {
    let unsupported = || AuthError::InvalidToken("unsupported key algorithm".to_string());
    let declared = jwk.common.key_algorithm;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InvalidToken(format!("invalid RSA key: {e}")))?;

            let algorithms = match declared {
                Some(KeyAlgorithm::RS256) => vec![Algorithm::RS256],
                Some(KeyAlgorithm::RS384) => vec![Algorithm::RS384],
                Some(KeyAlgorithm::RS512) => vec![Algorithm::RS512],
                Some(KeyAlgorithm::PS256) => vec![Algorithm::PS256],
                Some(KeyAlgorithm::PS384) => vec![Algorithm::PS384],
                Some(KeyAlgorithm::PS512) => vec![Algorithm::PS512],
                None => vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
                Some(_) => return Err(unsupported()),
            };
            Ok((key, algorithms))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InvalidToken(format!("invalid EC key: {e}")))?;

            let algorithm = match (&ec.curve, declared) {
                (EllipticCurve::P256, None | Some(KeyAlgorithm::ES256)) => Algorithm::ES256,
                (EllipticCurve::P384, None | Some(KeyAlgorithm::ES384)) => Algorithm::ES384,
                _ => return Err(unsupported()),
            };
            Ok((key, vec![algorithm]))
        }
        AlgorithmParameters::OctetKeyPair(okp) => {
            if okp.curve != EllipticCurve::Ed25519
                || !matches!(declared, None | Some(KeyAlgorithm::EdDSA))
            {
                return Err(unsupported());
            }
            let key = DecodingKey::from_ed_components(&okp.x)
                .map_err(|e| AuthError::InvalidToken(format!("invalid Ed25519 key: {e}")))?;
            Ok((key, vec![Algorithm::EdDSA]))
        }
        _ => Err(unsupported()),
    }
}
