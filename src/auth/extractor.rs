// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated requests.
//!
//! Use the `Authenticated` extractor in handlers behind the gate:
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated(auth): Authenticated) -> impl IntoResponse {
//!     // auth.principal().id is the caller
//! }
//! ```

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticationResult};

/// Extractor for the authentication result attached by the middleware.
///
/// Rejects with [`AuthError::MissingCredentials`] on routes where
/// authentication did not run.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Arc<AuthenticationResult>);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<AuthenticationResult>>()
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::MissingCredentials)
    }
}
