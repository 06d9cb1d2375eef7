// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Red Sky API Client
//!
//! An async client for the Red Sky trial protocol. Experiments are addressed
//! by name; everything else (trial collections, the next-trial dispenser,
//! report links, list pages) is reached through links the server hands back
//! in response headers, which this client copies into each resource's
//! metadata.
//!
//! The client never retries on its own. A `503` from the dispenser comes back
//! as [`Error::TrialUnavailable`] carrying the server's requested back off,
//! and a `410` as [`Error::ExperimentStopped`]:
//!
//! ```ignore
//! let client = redsky_client::Client::from_config(&ClientConfig::from_env()?)?;
//! let experiment = client.get_experiment_by_name(&name).await?;
//! let next = experiment.meta.next_trial.as_deref().unwrap_or_default();
//! loop {
//!     match client.next_trial(next).await {
//!         Ok(trial) => {
//!             let values = run(&trial).await;
//!             client.report_trial(trial.meta.report_trial.as_deref().unwrap_or_default(), values).await?;
//!         }
//!         Err(e) if e.is_retryable() => {
//!             tokio::time::sleep(e.retry_after().unwrap_or(DEFAULT_RETRY_AFTER)).await;
//!         }
//!         Err(e) if e.is_terminal() => break,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! ```
//!
//! Every operation is a single request. Dropping the returned future cancels
//! it. A [`Client`] is cheap to clone and may be shared between tasks.

mod config;
mod error;
mod experiments;
mod trials;

use std::sync::Once;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub use config::{ClientConfig, DEFAULT_ADDRESS, DEFAULT_TIMEOUT_SECS};
pub use error::{DEFAULT_RETRY_AFTER, Error, ErrorKind};

// Re-export the resource model so callers need only this crate
pub use redsky_api::{
    Assignment, Bounds, Decimal, Experiment, ExperimentItem, ExperimentList, ExperimentListMeta,
    ExperimentListQuery, ExperimentMeta, ExperimentName, Metric, Optimization, Parameter,
    ParameterType, TrialAssignments, TrialItem, TrialList, TrialMeta, TrialStatus, TrialValues,
    Value,
};

static CRYPTO_PROVIDER: Once = Once::new();

// reqwest is built without a default TLS provider; install ring once per
// process before the first client is built.
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // Err means another provider is already installed, which is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Client for the Red Sky API.
#[derive(Clone, Debug)]
pub struct Client {
    baseurl: Url,
    client: reqwest::Client,
}

impl Client {
    /// Create a client for the server at `baseurl` with default settings.
    pub fn new(baseurl: &str) -> Result<Self, Error> {
        Self::from_config(&ClientConfig {
            address: baseurl.to_string(),
            ..ClientConfig::default()
        })
    }

    /// Create a client from a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        install_crypto_provider();

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::Config("token contains characters not allowed in a header".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Self::new_with_client(&config.address, client)
    }

    /// Create a client around a caller-supplied [`reqwest::Client`].
    pub fn new_with_client(baseurl: &str, client: reqwest::Client) -> Result<Self, Error> {
        let baseurl = Url::parse(baseurl).map_err(|source| Error::InvalidUrl {
            url: baseurl.to_string(),
            source,
        })?;
        if baseurl.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "server address cannot be used as a base URL: {baseurl}"
            )));
        }

        tracing::debug!(baseurl = %baseurl, "Created Red Sky client");
        Ok(Self { baseurl, client })
    }

    /// The server address requests are made against.
    pub fn baseurl(&self) -> &Url {
        &self.baseurl
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Append path segments to the server address, escaping each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.baseurl.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Resolve a link taken from a response header against the server
    /// address.
    pub(crate) fn resolve(&self, link: &str) -> Result<Url, Error> {
        self.baseurl.join(link).map_err(|source| Error::InvalidUrl {
            url: link.to_string(),
            source,
        })
    }

    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<Response, Error> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::debug!(method = %method, url = %url, error = %e, "Red Sky request failed");
            Error::Transport(e)
        })?;

        tracing::debug!(
            method = %method,
            url = %url,
            status = %response.status(),
            "Red Sky request"
        );
        Ok(response)
    }
}

/// Attach `body` as a JSON document.
pub(crate) fn with_json<T: Serialize + ?Sized>(
    request: RequestBuilder,
    body: &T,
) -> Result<RequestBuilder, Error> {
    let body = serde_json::to_vec(body).map_err(Error::Encode)?;
    Ok(request
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body))
}

/// Decode a JSON response body.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(Error::Decode)
}

/// Decode a JSON response body, or `None` when the server sent none.
pub(crate) async fn decode_optional<T: DeserializeOwned>(
    response: Response,
) -> Result<Option<T>, Error> {
    let body = response.bytes().await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&body).map(Some).map_err(Error::Decode)
}
