// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gate construction and router wiring.
//!
//! ```rust,ignore
//! let resources = ResourceMap::new().route(
//!     "/ping",
//!     "GET",
//!     Resolver::from_query("organization", "org_id", "get"),
//! )?;
//!
//! let gate = Gate::new(GateConfig {
//!     resources,
//!     ..GateConfig::new("http://localhost:7400")
//! })?;
//!
//! let app = gate.protect(Router::new().route("/ping", get(ping)));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use serde::Deserialize;

use crate::auth::jwks::{JwksCache, KeySetCache};
use crate::auth::middleware::authenticate;
use crate::auth::resolver::Authenticator;
use crate::auth::session::SessionExchanger;
use crate::auth::verifier::TokenVerifier;
use crate::auth::AuthError;
use crate::authz::check::PermissionChecker;
use crate::authz::middleware::authorize;
use crate::authz::resource::ResourceMap;
use crate::client::{default_http_client, ServiceEndpoint, DEFAULT_API_PREFIX};
use crate::error::ConfigError;

/// What happens to authenticated requests on routes with no resource mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPolicy {
    /// Reject with 401.
    #[default]
    Deny,
    /// Forward untouched.
    Allow,
}

impl FromStr for DefaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "allow" => Ok(Self::Allow),
            other => Err(format!("unknown default policy {other:?}, expected deny or allow")),
        }
    }
}

impl fmt::Display for DefaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deny => "deny",
            Self::Allow => "allow",
        })
    }
}

/// Gate configuration.
pub struct GateConfig {
    /// Authorization service base URL, e.g. `http://localhost:7400`
    pub endpoint: String,
    /// Outbound client; defaults to one with bounded request and connect timeouts
    pub http_client: Option<reqwest::Client>,
    pub resources: ResourceMap,
    pub policy: DefaultPolicy,
    /// Platform key set cache; defaults to a [`JwksCache`] on the service's key set URL
    pub key_set_cache: Option<Arc<dyn KeySetCache>>,
    /// Versioned API prefix of the REST surface
    pub api_prefix: String,
}

impl GateConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            http_client: None,
            resources: ResourceMap::default(),
            policy: DefaultPolicy::default(),
            key_set_cache: None,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}

/// A configured authentication and authorization gate.
///
/// Cheap to clone; clones share the key set cache.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

struct GateInner {
    authenticator: Authenticator,
    checker: PermissionChecker,
    resources: ResourceMap,
    policy: DefaultPolicy,
    key_set: Arc<dyn KeySetCache>,
}

impl Gate {
    /// Validate `config` and build the gate.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        let GateConfig {
            endpoint,
            http_client,
            resources,
            policy,
            key_set_cache,
            api_prefix,
        } = config;

        let endpoint = ServiceEndpoint::parse(&endpoint, &api_prefix)?;
        let client = match http_client {
            Some(client) => client,
            None => default_http_client()?,
        };
        let key_set: Arc<dyn KeySetCache> = match key_set_cache {
            Some(cache) => cache,
            None => {
                let cache = JwksCache::new(client.clone());
                cache.register(endpoint.jwks_url().as_str())?;
                Arc::new(cache)
            }
        };

        let verifier = TokenVerifier::new(endpoint.clone(), client.clone(), key_set.clone());
        let sessions = SessionExchanger::new(endpoint.clone(), client.clone(), verifier.clone());

        tracing::info!(
            endpoint = %endpoint.base(),
            routes = resources.len(),
            policy = %policy,
            "Authorization gate configured"
        );

        Ok(Self {
            inner: Arc::new(GateInner {
                authenticator: Authenticator::new(verifier, sessions),
                checker: PermissionChecker::new(endpoint, client),
                resources,
                policy,
                key_set,
            }),
        })
    }

    /// Wrap every route of `router` in authentication, then authorization.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .layer(from_fn_with_state(self.clone(), authorize))
            .layer(from_fn_with_state(self.clone(), authenticate))
    }

    /// Whether the platform key set can currently be obtained.
    pub async fn key_set_status(&self) -> Result<(), AuthError> {
        self.inner.key_set.get().await.map(|_| ())
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.inner.authenticator
    }

    pub fn checker(&self) -> &PermissionChecker {
        &self.inner.checker
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.inner.resources
    }

    pub fn policy(&self) -> DefaultPolicy {
        self.inner.policy
    }
}
