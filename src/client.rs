// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization service REST surface.
//!
//! | Call | Path |
//! |------|------|
//! | Current profile (session exchange) | `GET {prefix}/users/self` |
//! | Permission check | `POST {prefix}/check` |
//! | Principal public key | `GET {prefix}/serviceusers/{id}/keys/{kid}` |
//! | Platform key set | `GET /.well-known/jwks.json` |

use std::time::Duration;

use axum::http::{header, HeaderMap};
use url::Url;

use crate::error::ConfigError;

/// Platform key set location, always relative to the service root.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Default versioned API prefix.
pub const DEFAULT_API_PREFIX: &str = "/v1beta1";

const CURRENT_PROFILE_PATH: &str = "users/self";
const CHECK_PATH: &str = "check";

/// Default outbound request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection establishment never blocks longer than this.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Headers describing the inbound connection or body; the outbound client
/// sets its own.
const INBOUND_ONLY_HEADERS: [header::HeaderName; 6] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::CONTENT_TYPE,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::ACCEPT_ENCODING,
];

/// Base URL and API prefix of the authorization service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    base: Url,
    api_prefix: Vec<String>,
}

impl ServiceEndpoint {
    /// Parse the service base URL.
    ///
    /// Fails with [`ConfigError::MissingHost`] for empty, unparsable or
    /// host-less endpoints.
    pub fn parse(endpoint: &str, api_prefix: &str) -> Result<Self, ConfigError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        let base = Url::parse(endpoint).map_err(|_| ConfigError::MissingHost)?;
        match base.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(ConfigError::MissingHost),
        }
        if base.cannot_be_a_base() {
            return Err(ConfigError::MissingHost);
        }

        let api_prefix = api_prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self { base, api_prefix })
    }

    /// The configured base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Platform key set URL.
    pub fn jwks_url(&self) -> Url {
        self.at_root(JWKS_PATH.trim_start_matches('/').split('/'))
    }

    /// Session exchange URL.
    pub fn profile_url(&self) -> Url {
        self.api(CURRENT_PROFILE_PATH.split('/'))
    }

    /// Permission check URL.
    pub fn check_url(&self) -> Url {
        self.api([CHECK_PATH])
    }

    /// Principal key URL.
    ///
    /// Both identifiers come from an unverified token, so each is pushed as a
    /// single percent-encoded segment; dot segments are refused.
    pub fn principal_key_url(&self, principal_id: &str, key_id: &str) -> Option<Url> {
        for id in [principal_id, key_id] {
            if id.is_empty() || id == "." || id == ".." {
                return None;
            }
        }
        Some(self.api(["serviceusers", principal_id, "keys", key_id]))
    }

    fn api<S: AsRef<str>>(&self, segments: impl IntoIterator<Item = S>) -> Url {
        let mut url = self.at_root(&self.api_prefix);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn at_root<S: AsRef<str>>(&self, segments: impl IntoIterator<Item = S>) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Copy the inbound headers for an outbound call, minus connection and body
/// headers.
pub fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in INBOUND_ONLY_HEADERS {
        forwarded.remove(name);
    }
    forwarded
}

/// Short description of an outbound failure, without the request URL.
pub fn describe(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

/// Build the default outbound client.
pub fn default_http_client() -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}
