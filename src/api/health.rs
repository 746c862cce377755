// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health endpoint. Not protected by the gate.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::gate::Gate;

/// Health check response with individual component status.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub service: String,
    /// Platform key set ("ok" or "unavailable").
    pub jwks: String,
}

/// Returns 200 when the platform key set can be obtained, 503 otherwise.
pub async fn health(State(gate): State<Gate>) -> (StatusCode, Json<HealthResponse>) {
    let (status, overall, jwks) = match gate.key_set_status().await {
        Ok(()) => (StatusCode::OK, "ok", "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Platform key set unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };

    let response = HealthResponse {
        status: overall.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            jwks: jwks.to_string(),
        },
    };
    (status, Json(response))
}
