// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified claims, principals and the per-request authentication result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value of the `gen` claim on tokens minted by the authorization service.
pub const SYSTEM_GENERATOR: &str = "system";

/// Claim map of a verified token.
///
/// Only ever constructed from a token whose signature has been checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub(crate) fn from_verified(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Get a claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get a string-valued claim.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Subject (`sub`).
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Expiry (`exp`) as a Unix timestamp.
    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    /// Whether the token was minted by the authorization service itself.
    pub fn is_system_generated(&self) -> bool {
        self.get_str("gen") == Some(SYSTEM_GENERATOR)
    }

    /// Borrow the full claim map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// The caller a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Canonical principal ID (`sub` claim or profile ID)
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Principal {
    /// Derive a principal from verified claims.
    ///
    /// Returns `None` when `sub` is missing or not a string. Non-string
    /// `email`/`name` claims are ignored.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let id = claims.subject().filter(|s| !s.is_empty())?.to_string();
        Some(Self {
            id,
            email: claims.get_str("email").map(str::to_string),
            name: claims.get_str("name").map(str::to_string),
        })
    }
}

/// Outcome of authentication, attached to the request for the rest of the
/// pipeline. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationResult {
    principal: Principal,
    claims: Claims,
    raw_token: String,
}

impl AuthenticationResult {
    pub(crate) fn new(principal: Principal, claims: Claims, raw_token: String) -> Self {
        Self {
            principal,
            claims,
            raw_token,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The verified bearer token. Never log this.
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }
}
