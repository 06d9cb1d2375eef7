// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Client configuration

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

/// Server address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "http://localhost:8000";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for a [`Client`](crate::Client).
///
/// Configuration can be loaded from:
/// 1. Environment variables (see `from_env()`)
/// 2. A JSON file (see `from_file()`); missing fields take their defaults
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address of the Red Sky API, e.g. `https://api.example.com/v1/`
    pub address: String,

    /// Per-request timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,

    pub user_agent: String,

    /// Bearer token sent with every request, if set.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("redsky-client/", env!("CARGO_PKG_VERSION")).to_string(),
            token: None,
        }
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// - `REDSKY_ADDRESS`: server address
    /// - `REDSKY_TIMEOUT_SECS`: request timeout in seconds
    /// - `REDSKY_TOKEN`: bearer token
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(address) = var("REDSKY_ADDRESS").filter(|v| !v.trim().is_empty()) {
            config.address = address.trim().to_string();
        }

        if let Some(timeout) = var("REDSKY_TIMEOUT_SECS") {
            config.timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid REDSKY_TIMEOUT_SECS: {timeout:?}")))?;
        }

        config.token = var("REDSKY_TOKEN").filter(|v| !v.is_empty());

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// The request timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.timeout(), Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)));
        assert!(config.user_agent.starts_with("redsky-client/"));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_from_vars() {
        let config = ClientConfig::from_vars(vars(&[
            ("REDSKY_ADDRESS", " https://redsky.example.com/api/ "),
            ("REDSKY_TIMEOUT_SECS", "0"),
            ("REDSKY_TOKEN", "s3cr3t"),
        ]))
        .unwrap();
        assert_eq!(config.address, "https://redsky.example.com/api/");
        assert_eq!(config.timeout(), None);
        assert_eq!(config.token.as_deref(), Some("s3cr3t"));
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = ClientConfig::from_vars(vars(&[("REDSKY_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_from_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redsky.json");
        std::fs::write(&path, r#"{ "address": "http://10.0.0.1:8000" }"#).unwrap();

        let config = ClientConfig::from_file(&path).await.unwrap();
        assert_eq!(config.address, "http://10.0.0.1:8000");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let missing = ClientConfig::from_file(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
