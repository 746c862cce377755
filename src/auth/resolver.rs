// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential source selection.
//!
//! | Source | Handling |
//! |--------|----------|
//! | `Authorization: Bearer <token>` | verified, principal from claims |
//! | [`USER_TOKEN_HEADER`] | verified, principal from claims |
//! | [`SESSION_COOKIE`] cookie | exchanged for a token, principal from profile |
//!
//! A non-empty bearer token takes precedence over the internal header. The
//! session cookie is consulted only when neither carries a token.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::CookieJar;

use super::claims::{AuthenticationResult, Principal};
use super::error::AuthError;
use super::session::{SessionExchanger, SESSION_COOKIE, USER_TOKEN_HEADER};
use super::verifier::TokenVerifier;

/// Where a request's credentials were found.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Credentials {
    Token(String),
    Session,
}

/// Establishes the caller's identity for a request.
#[derive(Clone)]
pub struct Authenticator {
    verifier: TokenVerifier,
    sessions: SessionExchanger,
}

impl Authenticator {
    pub fn new(verifier: TokenVerifier, sessions: SessionExchanger) -> Self {
        Self { verifier, sessions }
    }

    /// Authenticate a request from its headers.
    ///
    /// Fails with [`AuthError::MissingCredentials`] without any network call
    /// when the request carries neither a token nor a session cookie.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticationResult, AuthError> {
        match credentials(headers).ok_or(AuthError::MissingCredentials)? {
            Credentials::Token(token) => {
                let claims = self.verifier.verify(&token, headers).await?;
                let principal = Principal::from_claims(&claims)
                    .ok_or_else(|| AuthError::InvalidToken("missing subject".to_string()))?;
                Ok(AuthenticationResult::new(principal, claims, token))
            }
            Credentials::Session => self.sessions.exchange(headers).await,
        }
    }
}

fn credentials(headers: &HeaderMap) -> Option<Credentials> {
    if let Some(token) = bearer_token(headers).or_else(|| header_token(headers)) {
        return Some(Credentials::Token(token));
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .filter(|cookie| !cookie.value().is_empty())
        .map(|_| Credentials::Session)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_TOKEN_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
