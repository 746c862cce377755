// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization middleware for Axum.
//!
//! Must run inside [`authenticate`](crate::auth::middleware::authenticate):
//! it only reads the `Arc<AuthenticationResult>` that authentication left on
//! the request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{AuthError, AuthenticationResult};
use crate::gate::{DefaultPolicy, Gate};

/// Authorization middleware function.
pub async fn authorize(State(gate): State<Gate>, request: Request, next: Next) -> Response {
    let Some(auth) = request.extensions().get::<Arc<AuthenticationResult>>().cloned() else {
        return AuthError::MissingCredentials.into_response();
    };
    let principal_id = auth.principal().id.as_str();

    let (parts, body) = request.into_parts();
    let control = gate.resources().resolve(&parts);
    let request = Request::from_parts(parts, body);

    let Some(control) = control else {
        return match gate.policy() {
            DefaultPolicy::Allow => next.run(request).await,
            DefaultPolicy::Deny => {
                tracing::warn!(
                    principal_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                    "No resource mapping for route, denying"
                );
                AuthError::Denied.into_response()
            }
        };
    };

    match gate.checker().check(&control, request.headers()).await {
        Ok(true) => {
            tracing::debug!(
                principal_id,
                resource = %control.resource,
                permission = %control.permission,
                "Request authorized"
            );
            next.run(request).await
        }
        Ok(false) => {
            tracing::warn!(
                principal_id,
                resource = %control.resource,
                permission = %control.permission,
                "Permission denied"
            );
            AuthError::Denied.into_response()
        }
        Err(e) => {
            tracing::error!(
                principal_id,
                resource = %control.resource,
                permission = %control.permission,
                error = %e,
                "Permission check failed"
            );
            e.into_response()
        }
    }
}
