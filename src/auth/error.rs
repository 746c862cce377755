// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request gate errors.
//!
//! Every variant is terminal for the request that produced it. Causes are
//! carried as short strings built from the upstream error's display, never
//! from token or cookie contents.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication and authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Neither a token nor a usable session cookie was presented
    #[error("missing credentials: no bearer token or session cookie")]
    MissingCredentials,

    /// Token is malformed or its signature does not verify
    #[error("failed to verify a valid token: {0}")]
    InvalidToken(String),

    /// Token verified but is past its `exp`
    #[error("token has expired")]
    TokenExpired,

    /// Platform key set could not be obtained
    #[error("failed to fetch platform key set: {0}")]
    KeySetFetch(String),

    /// Principal key could not be retrieved from the authorization service
    #[error("failed to fetch principal public key: {0}")]
    KeyFetch(String),

    /// Session exchange was rejected or returned something unusable
    #[error("invalid session, failed to fetch principal: {0}")]
    SessionInvalid(String),

    /// The authorization service explicitly denied the request, or the
    /// route is unmapped under a deny-by-default policy
    #[error("not allowed")]
    Denied,

    /// The permission check itself failed (network or decoding)
    #[error("permission check failed: {0}")]
    Check(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::KeySetFetch(_) => "key_set_fetch_error",
            AuthError::KeyFetch(_) => "key_fetch_error",
            AuthError::SessionInvalid(_) => "session_invalid",
            AuthError::Denied => "not_allowed",
            AuthError::Check(_) => "check_error",
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Only a failed permission check is an internal error; everything else,
    /// including upstream key retrieval failures, rejects the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Check(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_credentials_returns_401() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_credentials");
    }

    #[tokio::test]
    async fn denial_body_says_not_allowed() {
        let response = AuthError::Denied.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "not allowed");
        assert_eq!(body["error_code"], "not_allowed");
    }

    #[test]
    fn check_failure_is_internal() {
        let err = AuthError::Check("connection refused".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_key_failures_reject_the_caller() {
        for err in [
            AuthError::KeySetFetch("timeout".into()),
            AuthError::KeyFetch("timeout".into()),
            AuthError::SessionInvalid("HTTP 403".into()),
            AuthError::InvalidToken("bad signature".into()),
            AuthError::TokenExpired,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{err}");
        }
    }

    #[test]
    fn messages_wrap_the_cause() {
        let err = AuthError::SessionInvalid("HTTP 500 from profile endpoint".to_string());
        assert_eq!(
            err.to_string(),
            "invalid session, failed to fetch principal: HTTP 500 from profile endpoint"
        );
    }
}
