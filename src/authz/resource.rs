// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route to resource mapping.
//!
//! Routes are matched on the exact request path and method. There is no
//! prefix or wildcard matching.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Exact-match key for a protected route. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    pub path: String,
    pub method: String,
}

impl ResourcePath {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }

    fn of(parts: &Parts) -> Self {
        Self::new(parts.uri.path(), parts.method.as_str())
    }
}

/// The permission a request needs on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceControl {
    /// `"<namespace>:<id>"`
    pub resource: String,
    pub permission: String,
}

impl ResourceControl {
    pub fn new(resource: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            permission: permission.into(),
        }
    }

    /// Split the resource into `(namespace, id)`.
    ///
    /// `None` unless the resource holds exactly one `:`.
    pub fn split(&self) -> Option<(&str, &str)> {
        match self.resource.split_once(':') {
            Some((namespace, id)) if !id.contains(':') => Some((namespace, id)),
            _ => None,
        }
    }
}

/// Derives the [`ResourceControl`] for a request.
///
/// Resolvers are pure functions of the request head.
#[derive(Clone)]
pub struct Resolver(Arc<dyn Fn(&Parts) -> ResourceControl + Send + Sync>);

impl Resolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Parts) -> ResourceControl + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Always the same resource and permission.
    pub fn fixed(resource: impl Into<String>, permission: impl Into<String>) -> Self {
        let control = ResourceControl::new(resource, permission);
        Self::new(move |_| control.clone())
    }

    /// `"<namespace>:<value of query parameter param>"`.
    ///
    /// The id is empty when the parameter is absent, which the
    /// authorization service then denies.
    pub fn from_query(
        namespace: impl Into<String>,
        param: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let param = param.into();
        let permission = permission.into();
        Self::new(move |parts| {
            let id = parts
                .uri
                .query()
                .and_then(|q| {
                    url::form_urlencoded::parse(q.as_bytes())
                        .find(|(k, _)| *k == param)
                        .map(|(_, v)| v.into_owned())
                })
                .unwrap_or_default();
            ResourceControl::new(format!("{namespace}:{id}"), permission.clone())
        })
    }

    pub fn resolve(&self, parts: &Parts) -> ResourceControl {
        (self.0)(parts)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver")
    }
}

/// Table of protected routes.
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    routes: HashMap<ResourcePath, Resolver>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `method path` to `resolver`.
    ///
    /// A route maps to at most one resolver; a second mapping fails with
    /// [`ConfigError::DuplicateResourcePath`].
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        method: impl Into<String>,
        resolver: Resolver,
    ) -> Result<(), ConfigError> {
        let key = ResourcePath::new(path, method);
        if self.routes.contains_key(&key) {
            return Err(ConfigError::DuplicateResourcePath {
                path: key.path,
                method: key.method,
            });
        }
        self.routes.insert(key, resolver);
        Ok(())
    }

    /// Builder form of [`ResourceMap::insert`].
    pub fn route(
        mut self,
        path: impl Into<String>,
        method: impl Into<String>,
        resolver: Resolver,
    ) -> Result<Self, ConfigError> {
        self.insert(path, method, resolver)?;
        Ok(self)
    }

    /// Resource control for a request, or `None` when the route is unmapped.
    pub fn resolve(&self, parts: &Parts) -> Option<ResourceControl> {
        self.routes
            .get(&ResourcePath::of(parts))
            .map(|resolver| resolver.resolve(parts))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
