// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Every decision is delegated to the authorization service. A route's
//! `(path, method)` selects a resolver, the resolver yields the resource and
//! permission, and the service answers allow or deny. Unmapped routes follow
//! the gate's [`DefaultPolicy`](crate::gate::DefaultPolicy) without a remote
//! call.

pub mod check;
pub mod middleware;
pub mod resource;

pub use check::PermissionChecker;
pub use resource::{ResourceControl, ResourceMap, ResourcePath, Resolver};
