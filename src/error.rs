// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Construction-time errors.
//!
//! These abort gate construction entirely and are never retried.

/// Errors raised while building a [`crate::Gate`] or one of its parts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The authorization service endpoint is empty, unparsable or has no host.
    #[error("missing authorization service host")]
    MissingHost,

    /// The key set source URL could not be parsed.
    #[error("invalid key set URL {url:?}: {reason}")]
    InvalidKeySetUrl { url: String, reason: String },

    /// `register` was called on a key set cache that already has a source.
    #[error("key set source already registered")]
    AlreadyRegistered,

    /// Two resolvers were configured for the same path and method.
    #[error("duplicate resource mapping for {method} {path}")]
    DuplicateResourcePath { path: String, method: String },

    /// The outbound HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The service-user private key could not be parsed.
    #[error("invalid service-user credential: {0}")]
    InvalidCredential(String),

    /// A server environment variable is set to an unusable value.
    #[error("invalid {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}
