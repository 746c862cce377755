// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authgate - authentication and authorization gate for Axum services
//!
//! Puts a protected backend behind a remote authorization service: callers
//! are authenticated from a bearer token or session cookie, then each route
//! is checked against the permission it maps to.
//!
//! ## Modules
//!
//! - `api` - Routes of the server binary
//! - `auth` - Credential resolution, token verification, session exchange
//! - `authz` - Resource mapping and remote permission checks
//! - `gate` - Configuration and router wiring
//! - `client` - Authorization service REST surface
//! - `config` - Server binary environment

pub mod api;
pub mod auth;
pub mod authz;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;

#[cfg(test)]
mod testutil;

pub use auth::{AuthError, Authenticated, AuthenticationResult, Claims, Principal};
pub use authz::{ResourceControl, ResourceMap, Resolver};
pub use error::ConfigError;
pub use gate::{DefaultPolicy, Gate, GateConfig};
