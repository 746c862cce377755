// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Establishes who a request is made on behalf of.
//!
//! ## Auth Flow
//!
//! 1. The caller presents a bearer token (or the internal token header), or
//!    a session cookie
//! 2. Tokens are verified:
//!    - `gen == "system"` against the platform key set (`/.well-known/jwks.json`)
//!    - otherwise against the key the principal registered for the token's `kid`
//! 3. Session cookies are exchanged for a token at the current-profile
//!    endpoint, and that token is verified the same way
//! 4. The result (`principal`, `claims`, raw token) is attached to the request
//!
//! ## Security
//!
//! - The unverified decode used to pick a key never yields claims
//! - `exp` is always required; clock skew tolerance is 60 seconds
//! - Platform keys are cached; concurrent misses share one fetch

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod resolver;
pub mod service_user;
pub mod session;
pub mod verifier;

pub use claims::{AuthenticationResult, Claims, Principal};
pub use error::AuthError;
pub use extractor::Authenticated;
pub use jwks::{JwksCache, KeySetCache};
pub use resolver::Authenticator;
pub use service_user::{ServiceUserCredential, ServiceUserTokenSource};
pub use session::{SessionExchanger, SESSION_COOKIE, USER_TOKEN_HEADER};
pub use verifier::TokenVerifier;
