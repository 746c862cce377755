// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variables read by the `authgate` server binary at startup.
//! The library itself never reads the environment; everything it needs is
//! passed in [`GateConfig`](crate::gate::GateConfig).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTHGATE_ENDPOINT` | Authorization service base URL | Required |
//! | `AUTHGATE_DEFAULT_POLICY` | Unmapped routes: `deny` or `allow` | `deny` |
//! | `AUTHGATE_API_PREFIX` | Versioned API prefix of the service | `/v1beta1` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;

use crate::client::DEFAULT_API_PREFIX;
use crate::error::ConfigError;
use crate::gate::DefaultPolicy;

pub const ENDPOINT_ENV: &str = "AUTHGATE_ENDPOINT";
pub const DEFAULT_POLICY_ENV: &str = "AUTHGATE_DEFAULT_POLICY";
pub const API_PREFIX_ENV: &str = "AUTHGATE_API_PREFIX";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Server binary settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub endpoint: String,
    pub policy: DefaultPolicy,
    pub api_prefix: String,
    pub addr: SocketAddr,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = var(ENDPOINT_ENV).ok_or(ConfigError::MissingHost)?;

        let policy = match var(DEFAULT_POLICY_ENV) {
            Some(value) => value.parse::<DefaultPolicy>().map_err(|reason| ConfigError::InvalidEnv {
                name: DEFAULT_POLICY_ENV,
                reason,
            })?,
            None => DefaultPolicy::Deny,
        };

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(value) => value.parse::<u16>().map_err(|e| ConfigError::InvalidEnv {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let addr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidEnv {
                name: HOST_ENV,
                reason: e.to_string(),
            })?;

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            endpoint,
            policy,
            api_prefix: var(API_PREFIX_ENV).unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            addr,
            log_format,
        })
    }
}
