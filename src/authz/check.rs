// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote permission check.

use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use super::resource::ResourceControl;
use crate::auth::AuthError;
use crate::client::{describe, forwarded_headers, ServiceEndpoint};

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    resource: &'a str,
    permission: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    status: bool,
}

/// Asks the authorization service whether the caller holds a permission.
#[derive(Clone)]
pub struct PermissionChecker {
    endpoint: ServiceEndpoint,
    client: reqwest::Client,
}

impl PermissionChecker {
    pub fn new(endpoint: ServiceEndpoint, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }

    /// `Ok(true)` only for HTTP 200 with `{"status": true}`.
    ///
    /// Any other status, or `status: false`, is `Ok(false)`. Transport and
    /// decoding failures are [`AuthError::Check`], distinct from a denial.
    pub async fn check(&self, control: &ResourceControl, headers: &HeaderMap) -> Result<bool, AuthError> {
        let response = self
            .client
            .post(self.endpoint.check_url())
            .headers(forwarded_headers(headers))
            .json(&CheckRequest {
                resource: &control.resource,
                permission: &control.permission,
            })
            .send()
            .await
            .map_err(|e| AuthError::Check(describe(e)))?;

        if response.status() != StatusCode::OK {
            tracing::debug!(
                resource = %control.resource,
                permission = %control.permission,
                status = %response.status(),
                "Permission check answered with non-200"
            );
            return Ok(false);
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Check(describe(e)))?;
        Ok(body.status)
    }
}
