// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Standalone stub Red Sky server for testing and development
//!
//! Run with:
//! ```bash
//! cargo run -p redsky-stub-server
//! ```
//!
//! Environment:
//! - `REDSKY_STUB_BIND`: listen address (default `127.0.0.1:8000`)
//! - `REDSKY_STUB_TOKEN`: require this bearer token on every request
//! - `REDSKY_STUB_RETRY_AFTER`: seconds sent in `Retry-After` (default 5)
//!
//! Then point a worker at it:
//! ```bash
//! REDSKY_ADDRESS=http://localhost:8000 my-trial-worker
//! ```

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::net::TcpListener;

use redsky_stub_server::{DEFAULT_RETRY_AFTER_SECS, StubConfig, StubContext, router};

const DEFAULT_BIND: &str = "127.0.0.1:8000";

fn config_from_env() -> Result<(String, StubConfig)> {
    let bind = std::env::var("REDSKY_STUB_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let retry_after = match std::env::var("REDSKY_STUB_RETRY_AFTER") {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid REDSKY_STUB_RETRY_AFTER: {value:?}"))?,
        Err(_) => DEFAULT_RETRY_AFTER_SECS,
    };

    let config = StubConfig {
        token: std::env::var("REDSKY_STUB_TOKEN").ok().filter(|t| !t.is_empty()),
        retry_after,
        ..StubConfig::default()
    };
    Ok((bind, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "redsky_stub_server=info".to_string()),
        ))
        .init();

    let (bind, config) = config_from_env()?;
    let authenticated = config.token.is_some();
    let app = router(Arc::new(StubContext::new(config)));

    let listener = TcpListener::bind(&bind).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            anyhow!("Address {bind} is already in use. Set REDSKY_STUB_BIND to another address")
        } else {
            anyhow!("Failed to bind to {bind}: {e}")
        }
    })?;

    tracing::info!(authenticated, "Stub Red Sky server listening on http://{}", bind);
    tracing::info!("Available endpoints:");
    tracing::info!("  GET    /experiments?offset=&limit=");
    tracing::info!("  GET    /experiments/{{name}}");
    tracing::info!("  PUT    /experiments/{{name}}");
    tracing::info!("  DELETE /experiments/{{name}}");
    tracing::info!("  GET    /experiments/{{name}}/trials");
    tracing::info!("  POST   /experiments/{{name}}/trials");
    tracing::info!("  POST   /experiments/{{name}}/nextTrial");
    tracing::info!("  POST   /experiments/{{name}}/trials/{{id}}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Shutting down");
}
