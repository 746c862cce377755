// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server binary routes.
//!
//! | Route | Protection |
//! |-------|------------|
//! | `GET /health` | none |
//! | `GET /ping?org_id=<org>` | `get` on `organization:<org>` |

use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::Authenticated;
use crate::authz::{ResourceMap, Resolver};
use crate::error::ConfigError;

pub mod health;

/// Upper bound on a whole request, outbound calls included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource mapping of the server's protected routes.
pub fn resources() -> Result<ResourceMap, ConfigError> {
    ResourceMap::new().route(
        "/ping",
        "GET",
        Resolver::from_query("organization", "org_id", "get"),
    )
}

/// Build the server router around `gate`.
pub fn router(gate: crate::gate::Gate) -> Router {
    let protected = gate.protect(Router::new().route("/ping", get(ping)));

    Router::new()
        .route("/health", get(health::health))
        .with_state(gate)
        .merge(protected)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn ping(Authenticated(auth): Authenticated) -> &'static str {
    tracing::debug!(principal_id = %auth.principal().id, "ping");
    "pong"
}
