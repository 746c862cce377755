// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-to-token exchange.
//!
//! A session cookie is opaque to the gate. The authorization service's
//! current-profile endpoint is called with the inbound headers (which carry
//! the cookie); it answers with the principal's profile and a freshly minted
//! bearer token in the [`USER_TOKEN_HEADER`] response header. That token is
//! then verified like any other, so session callers end up with the same
//! claim shape as bearer callers.

use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::claims::{AuthenticationResult, Principal};
use super::error::AuthError;
use super::verifier::TokenVerifier;
use crate::client::{describe, forwarded_headers, ServiceEndpoint};

/// Header carrying a pre-verified user token, inbound and on the profile
/// response.
pub const USER_TOKEN_HEADER: &str = "x-user-token";

/// Session cookie name.
pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Deserialize)]
struct CurrentProfileResponse {
    #[serde(default)]
    user: Option<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<Profile> for Principal {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.filter(|e| !e.is_empty()),
            name: profile.name.filter(|n| !n.is_empty()),
        }
    }
}

/// Converts a session into a verified principal and bearer token.
#[derive(Clone)]
pub struct SessionExchanger {
    endpoint: ServiceEndpoint,
    client: reqwest::Client,
    verifier: TokenVerifier,
}

impl SessionExchanger {
    pub fn new(endpoint: ServiceEndpoint, client: reqwest::Client, verifier: TokenVerifier) -> Self {
        Self {
            endpoint,
            client,
            verifier,
        }
    }

    /// Exchange the session carried by `headers`.
    ///
    /// Every failure is reported as [`AuthError::SessionInvalid`] wrapping
    /// the cause.
    pub async fn exchange(&self, headers: &HeaderMap) -> Result<AuthenticationResult, AuthError> {
        let (profile, token) = self.fetch_profile(headers).await?;

        let claims = self
            .verifier
            .verify(&token, headers)
            .await
            .map_err(|e| AuthError::SessionInvalid(e.to_string()))?;

        if claims.subject() != Some(profile.id.as_str()) {
            return Err(AuthError::SessionInvalid(
                "exchanged token subject does not match profile".to_string(),
            ));
        }

        Ok(AuthenticationResult::new(profile.into(), claims, token))
    }

    async fn fetch_profile(&self, headers: &HeaderMap) -> Result<(Profile, String), AuthError> {
        let response = self
            .client
            .get(self.endpoint.profile_url())
            .headers(forwarded_headers(headers))
            .send()
            .await
            .map_err(|e| AuthError::SessionInvalid(describe(e)))?;

        if response.status() != StatusCode::OK {
            return Err(AuthError::SessionInvalid(format!(
                "HTTP {} from profile endpoint",
                response.status()
            )));
        }

        let token = response
            .headers()
            .get(USER_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::SessionInvalid("profile response carried no token".to_string())
            })?;

        let body: CurrentProfileResponse = response
            .json()
            .await
            .map_err(|e| AuthError::SessionInvalid(describe(e)))?;

        let profile = body
            .user
            .filter(|u| !u.id.is_empty())
            .ok_or_else(|| AuthError::SessionInvalid("profile response had no user".to_string()))?;

        Ok((profile, token))
    }
}
