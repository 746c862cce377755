// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! On success the request carries an `Arc<AuthenticationResult>` extension
//! for the rest of the pipeline; read it with the
//! [`Authenticated`](super::Authenticated) extractor. On failure the request
//! is answered with 401 and goes no further.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(gate, authenticate));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::gate::Gate;

/// Authentication middleware function.
pub async fn authenticate(State(gate): State<Gate>, mut request: Request, next: Next) -> Response {
    match gate.authenticator().authenticate(request.headers()).await {
        Ok(result) => {
            tracing::debug!(
                principal_id = %result.principal().id,
                method = %request.method(),
                path = %request.uri().path(),
                "Request authenticated"
            );
            request.extensions_mut().insert(Arc::new(result));
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                error_code = e.error_code(),
                error = %e,
                "Authentication rejected"
            );
            e.into_response()
        }
    }
}
