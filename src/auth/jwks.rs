// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Platform key set (JWKS) fetching and caching.
//!
//! ## Behaviour
//!
//! - The source URL is registered exactly once, before first use
//! - `get` serves the cached set while it is younger than the TTL and
//!   fetches otherwise
//! - `refresh` forces a fetch, unless the last fetch happened inside the
//!   minimum refresh interval, in which case the cached set is returned
//! - At most one fetch is in flight; callers that queued behind it reuse
//!   its outcome, success or failure
//! - The cached set is swapped as a whole behind an `Arc`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use tokio::sync::{Mutex, RwLock};
use url::Url;

use super::error::AuthError;
use crate::client::describe;
use crate::error::ConfigError;

/// Default refresh interval and floor between forced refreshes (15 minutes).
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Key set documents larger than this are refused.
const MAX_JWKS_BODY_SIZE: usize = 256 * 1024;

/// Source of the platform verification keys.
///
/// Implementations must be safe for many concurrent readers.
#[async_trait]
pub trait KeySetCache: Send + Sync {
    /// Register the URL the key set is fetched from.
    ///
    /// Must be called exactly once, before `get` or `refresh`.
    fn register(&self, source: &str) -> Result<(), ConfigError>;

    /// Current key set, fetching it if nothing usable is cached.
    async fn get(&self) -> Result<Arc<JwkSet>, AuthError>;

    /// Re-fetch the key set, bounded by the minimum refresh interval.
    async fn refresh(&self) -> Result<Arc<JwkSet>, AuthError>;

    /// Whether a key set is currently cached and within its TTL.
    async fn is_cached(&self) -> bool;
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Outcome of the most recent fetch attempt.
#[derive(Default)]
struct FetchState {
    last_failure: Option<AuthError>,
}

/// HTTP-backed [`KeySetCache`].
pub struct JwksCache {
    source: OnceLock<Url>,
    /// Cache TTL
    ttl: Duration,
    /// Floor between forced refreshes
    min_refresh_interval: Duration,
    /// Cached JWKS
    cache: RwLock<Option<Arc<CacheEntry>>>,
    /// Held for the duration of a fetch
    fetch: Mutex<FetchState>,
    /// Completed fetch attempts, successful or not
    attempts: AtomicU64,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksCache {
    /// Create an unregistered cache using the given HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            source: OnceLock::new(),
            ttl: DEFAULT_MIN_REFRESH_INTERVAL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cache: RwLock::new(None),
            fetch: Mutex::new(FetchState::default()),
            attempts: AtomicU64::new(0),
            client,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create with a custom floor between forced refreshes.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the registered source URL.
    pub fn source(&self) -> Option<&Url> {
        self.source.get()
    }

    async fn cached(&self) -> Option<Arc<CacheEntry>> {
        self.cache.read().await.clone()
    }

    /// Run `fetch_jwks` unless `usable` accepts what is already cached.
    ///
    /// `usable` is checked again once the fetch lock is held, so callers that
    /// queued behind a successful fetch return its result. Callers that queued
    /// behind a failed one return its error.
    async fn load(
        &self,
        usable: impl Fn(&CacheEntry) -> bool,
    ) -> Result<Arc<JwkSet>, AuthError> {
        if let Some(entry) = self.cached().await {
            if usable(&entry) {
                tracing::debug!("Using cached key set");
                return Ok(Arc::clone(&entry.jwks));
            }
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.fetch.lock().await;

        if let Some(entry) = self.cached().await {
            if usable(&entry) {
                return Ok(Arc::clone(&entry.jwks));
            }
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(err) = &state.last_failure {
                return Err(err.clone());
            }
        }

        let result = self.fetch_jwks().await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(jwks) => {
                let jwks = Arc::new(jwks);
                let entry = Arc::new(CacheEntry {
                    jwks: Arc::clone(&jwks),
                    fetched_at: Instant::now(),
                });
                *self.cache.write().await = Some(entry);
                state.last_failure = None;
                Ok(jwks)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Key set fetch failed");
                state.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Fetch JWKS from the registered source.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self
            .source
            .get()
            .ok_or_else(|| AuthError::KeySetFetch("key set source not registered".to_string()))?;

        tracing::info!(jwks_url = %url, "Fetching platform key set");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuthError::KeySetFetch(describe(e)))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetFetch(format!(
                "HTTP {} from key set endpoint",
                response.status()
            )));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_JWKS_BODY_SIZE as u64)
        {
            return Err(too_large());
        }

        // Content-Length is optional; the cap also applies to the stream.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AuthError::KeySetFetch(describe(e)))?
        {
            if body.len() + chunk.len() > MAX_JWKS_BODY_SIZE {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        let jwks: JwkSet =
            serde_json::from_slice(&body).map_err(|e| AuthError::KeySetFetch(e.to_string()))?;

        tracing::debug!(keys = jwks.keys.len(), "Fetched platform key set");
        Ok(jwks)
    }
}

fn too_large() -> AuthError {
    AuthError::KeySetFetch("key set document too large".to_string())
}

#[async_trait]
impl KeySetCache for JwksCache {
    fn register(&self, source: &str) -> Result<(), ConfigError> {
        let url = Url::parse(source).map_err(|e| ConfigError::InvalidKeySetUrl {
            url: source.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidKeySetUrl {
                url: source.to_string(),
                reason: "expected an http(s) URL with a host".to_string(),
            });
        }
        self.source
            .set(url)
            .map_err(|_| ConfigError::AlreadyRegistered)
    }

    async fn get(&self) -> Result<Arc<JwkSet>, AuthError> {
        let ttl = self.ttl;
        self.load(|entry| entry.fetched_at.elapsed() < ttl).await
    }

    async fn refresh(&self) -> Result<Arc<JwkSet>, AuthError> {
        let floor = self.min_refresh_interval;
        self.load(|entry| {
            let recent = entry.fetched_at.elapsed() < floor;
            if recent {
                tracing::debug!("Key set refresh inside minimum interval, using cache");
            }
            recent
        })
        .await
    }

    async fn is_cached(&self) -> bool {
        self.cached()
            .await
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.ttl)
    }
}
