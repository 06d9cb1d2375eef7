// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Stub Red Sky server for testing
//!
//! An axum server that keeps experiments and trials in memory and speaks the
//! server side of the trial protocol. It can be used for:
//!
//! - Integration testing of redsky-client without a real optimizer
//! - Local development of trial workers
//!
//! There is no optimizer behind it. Every dispensed trial assigns each
//! parameter its lower bound, and dispensing is limited only by the
//! experiment's `experimentBudget` (`410` once reached) and
//! `parallelTrials` (`503` while that many trials await a report).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, LAST_MODIFIED, LINK, LOCATION, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SubsecRound, Utc};
use redsky_api::meta::{Link, format_http_date};
use redsky_api::{
    Assignment, ENDPOINT_EXPERIMENTS, Experiment, ExperimentItem, ExperimentList,
    ExperimentListQuery, ExperimentName, REL_NEXT, REL_NEXT_TRIAL, REL_PREV, REL_SELF, REL_TRIALS,
    TrialAssignments, TrialItem, TrialList, TrialStatus, TrialValues, Value,
};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// `Retry-After` sent with `503` responses unless configured otherwise.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Experiments per page when a listing does not ask for a limit.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct StubConfig {
    /// When set, every request must carry `Authorization: Bearer <token>`.
    pub token: Option<String>,
    /// Seconds advertised in `Retry-After` when no trial is available.
    pub retry_after: u64,
    pub page_size: u32,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            token: None,
            retry_after: DEFAULT_RETRY_AFTER_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A failure response: a status, a short JSON message and, for `503`, a
/// `Retry-After` header.
#[derive(Debug)]
pub struct StubError {
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
}

impl StubError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    fn experiment_not_found(name: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("experiment not found: {name}"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

// ============================================================================
// Server Context
// ============================================================================

#[derive(Debug)]
struct StoredTrial {
    assignments: Vec<Assignment>,
    values: Vec<Value>,
    status: TrialStatus,
}

#[derive(Debug)]
struct StoredExperiment {
    experiment: Experiment,
    last_modified: DateTime<Utc>,
    trials: Vec<StoredTrial>,
}

impl StoredExperiment {
    fn active_trials(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Active)
            .count()
    }
}

/// The outcome of storing an experiment.
#[derive(Debug)]
pub struct Stored {
    pub created: bool,
    pub experiment: Experiment,
    pub last_modified: DateTime<Utc>,
}

/// One page of the experiment listing.
#[derive(Debug)]
pub struct Page {
    pub experiments: Vec<ExperimentItem>,
    pub next: Option<ExperimentListQuery>,
    pub prev: Option<ExperimentListQuery>,
}

/// In-memory state of the stub server, keyed by experiment name.
#[derive(Debug)]
pub struct StubContext {
    config: StubConfig,
    experiments: Mutex<BTreeMap<String, StoredExperiment>>,
}

impl StubContext {
    pub fn new(config: StubConfig) -> Self {
        Self {
            config,
            experiments: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &StubConfig {
        &self.config
    }

    fn experiments(&self) -> MutexGuard<'_, BTreeMap<String, StoredExperiment>> {
        self.experiments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Names of all stored experiments, sorted.
    pub fn experiment_names(&self) -> Vec<String> {
        self.experiments().keys().cloned().collect()
    }

    /// Create or update an experiment.
    ///
    /// An update may change anything but the parameter space.
    pub fn put_experiment(&self, name: &ExperimentName, experiment: Experiment) -> Result<Stored, StubError> {
        experiment
            .validate()
            .map_err(|e| StubError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

        let experiment = Experiment {
            meta: Default::default(),
            ..experiment
        };
        let last_modified = Utc::now().trunc_subsecs(0);

        let mut experiments = self.experiments();
        let created = match experiments.get_mut(name.as_str()) {
            Some(stored) => {
                if stored.experiment.parameters != experiment.parameters {
                    return Err(StubError::new(
                        StatusCode::CONFLICT,
                        format!("experiment {name} exists with different parameters"),
                    ));
                }
                stored.experiment = experiment.clone();
                stored.last_modified = last_modified;
                false
            }
            None => {
                experiments.insert(
                    name.to_string(),
                    StoredExperiment {
                        experiment: experiment.clone(),
                        last_modified,
                        trials: Vec::new(),
                    },
                );
                true
            }
        };

        Ok(Stored {
            created,
            experiment,
            last_modified,
        })
    }

    pub fn get_experiment(&self, name: &str) -> Result<(Experiment, DateTime<Utc>), StubError> {
        self.experiments()
            .get(name)
            .map(|stored| (stored.experiment.clone(), stored.last_modified))
            .ok_or_else(|| StubError::experiment_not_found(name))
    }

    pub fn delete_experiment(&self, name: &str) -> Result<(), StubError> {
        self.experiments()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StubError::experiment_not_found(name))
    }

    pub fn list_experiments(&self, query: ExperimentListQuery) -> Page {
        let limit = match query.limit {
            0 => self.config.page_size.max(1),
            limit => limit,
        };
        let offset = query.offset;

        let experiments = self.experiments();
        let total = experiments.len();
        let items = experiments
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(name, stored)| ExperimentItem {
                experiment: stored.experiment.clone(),
                item_ref: Some(experiment_path(name)),
            })
            .collect();

        let end = offset.saturating_add(limit);
        Page {
            experiments: items,
            next: ((end as usize) < total).then_some(ExperimentListQuery { offset: end, limit }),
            prev: (offset > 0).then_some(ExperimentListQuery {
                offset: offset.saturating_sub(limit),
                limit,
            }),
        }
    }

    /// Dispense the next trial. Returns its id and assignments.
    pub fn next_trial(&self, name: &str) -> Result<(usize, Vec<Assignment>), StubError> {
        let mut experiments = self.experiments();
        let stored = experiments
            .get_mut(name)
            .ok_or_else(|| StubError::experiment_not_found(name))?;

        let optimization = stored.experiment.optimization;
        let budget = optimization.experiment_budget as usize;
        if budget > 0 && stored.trials.len() >= budget {
            return Err(StubError::new(
                StatusCode::GONE,
                format!("experiment {name} has no more trials"),
            ));
        }

        let parallel = optimization.parallel_trials as usize;
        if parallel > 0 && stored.active_trials() >= parallel {
            return Err(StubError {
                retry_after: Some(self.config.retry_after),
                ..StubError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("{parallel} trials of {name} are still running"),
                )
            });
        }

        let assignments: Vec<Assignment> = stored
            .experiment
            .parameters
            .iter()
            .map(|p| Assignment {
                parameter_name: p.name.clone(),
                value: p.bounds.min.clone(),
            })
            .collect();

        stored.trials.push(StoredTrial {
            assignments: assignments.clone(),
            values: Vec::new(),
            status: TrialStatus::Active,
        });
        Ok((stored.trials.len(), assignments))
    }

    /// Store a trial with caller-chosen assignments. Returns its id.
    pub fn create_trial(&self, name: &str, assignments: Vec<Assignment>) -> Result<usize, StubError> {
        let mut experiments = self.experiments();
        let stored = experiments
            .get_mut(name)
            .ok_or_else(|| StubError::experiment_not_found(name))?;

        if let Some(unknown) = assignments
            .iter()
            .find(|a| stored.experiment.parameter(&a.parameter_name).is_none())
        {
            return Err(StubError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unknown parameter: {}", unknown.parameter_name),
            ));
        }

        stored.trials.push(StoredTrial {
            assignments,
            values: Vec::new(),
            status: TrialStatus::Active,
        });
        Ok(stored.trials.len())
    }

    pub fn list_trials(&self, name: &str) -> Result<Vec<TrialItem>, StubError> {
        let experiments = self.experiments();
        let stored = experiments
            .get(name)
            .ok_or_else(|| StubError::experiment_not_found(name))?;

        Ok(stored
            .trials
            .iter()
            .map(|t| TrialItem {
                assignments: t.assignments.clone(),
                values: t.values.clone(),
                failed: t.status == TrialStatus::Failed,
                status: t.status,
                ..TrialItem::default()
            })
            .collect())
    }

    /// Record the outcome of trial `id`. Each trial accepts one report.
    pub fn report_trial(&self, name: &str, id: &str, values: TrialValues) -> Result<(), StubError> {
        let trial_not_found = || {
            StubError::new(
                StatusCode::NOT_FOUND,
                format!("trial not found: {name}/{id}"),
            )
        };

        let mut experiments = self.experiments();
        let stored = experiments.get_mut(name).ok_or_else(trial_not_found)?;
        let index = id
            .parse::<usize>()
            .ok()
            .and_then(|id| id.checked_sub(1))
            .ok_or_else(trial_not_found)?;

        let experiment = &stored.experiment;
        let trial = stored
            .trials
            .get_mut(index)
            .filter(|t| t.status == TrialStatus::Active)
            .ok_or_else(trial_not_found)?;

        if values.failed {
            trial.status = TrialStatus::Failed;
            trial.values.clear();
            return Ok(());
        }

        if let Some(unknown) = values
            .values
            .iter()
            .find(|v| experiment.metric(&v.metric_name).is_none())
        {
            return Err(StubError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("unknown metric: {}", unknown.metric_name),
            ));
        }

        trial.status = TrialStatus::Completed;
        trial.values = values.values;
        Ok(())
    }
}

// ============================================================================
// Links
// ============================================================================

fn experiment_path(name: &str) -> String {
    format!("{ENDPOINT_EXPERIMENTS}/{name}")
}

fn trials_path(name: &str) -> String {
    format!("{ENDPOINT_EXPERIMENTS}/{name}/trials")
}

fn next_trial_path(name: &str) -> String {
    format!("{ENDPOINT_EXPERIMENTS}/{name}/nextTrial")
}

fn trial_path(name: &str, id: usize) -> String {
    format!("{ENDPOINT_EXPERIMENTS}/{name}/trials/{id}")
}

fn page_path(query: &ExperimentListQuery) -> String {
    match query.encode() {
        q if q.is_empty() => ENDPOINT_EXPERIMENTS.to_string(),
        q => format!("{ENDPOINT_EXPERIMENTS}?{q}"),
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StubError> {
    HeaderValue::from_str(value).map_err(|e| {
        StubError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("invalid header value {value:?}: {e}"),
        )
    })
}

fn link_header(links: &[Link]) -> Result<Option<HeaderValue>, StubError> {
    if links.is_empty() {
        return Ok(None);
    }
    let joined = links
        .iter()
        .map(Link::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    header_value(&joined).map(Some)
}

fn experiment_headers(name: &str, last_modified: &DateTime<Utc>) -> Result<HeaderMap, StubError> {
    let mut headers = HeaderMap::new();
    let links = [
        Link::new(experiment_path(name), REL_SELF),
        Link::new(trials_path(name), REL_TRIALS),
        Link::new(next_trial_path(name), REL_NEXT_TRIAL),
    ];
    if let Some(value) = link_header(&links)? {
        headers.insert(LINK, value);
    }
    headers.insert(LAST_MODIFIED, header_value(&format_http_date(last_modified))?);
    Ok(headers)
}

// ============================================================================
// Handlers
// ============================================================================

// Bodies are parsed by hand so malformed documents are a 422 like any other
// rejected definition.
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, StubError> {
    serde_json::from_slice(body)
        .map_err(|e| StubError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
}

type Ctx = State<Arc<StubContext>>;

async fn list_experiments(
    State(ctx): Ctx,
    Query(query): Query<ExperimentListQuery>,
) -> Result<Response, StubError> {
    let page = ctx.list_experiments(query);

    let mut links = Vec::new();
    if let Some(next) = &page.next {
        links.push(Link::new(page_path(next), REL_NEXT));
    }
    if let Some(prev) = &page.prev {
        links.push(Link::new(page_path(prev), REL_PREV));
    }

    let mut headers = HeaderMap::new();
    if let Some(value) = link_header(&links)? {
        headers.insert(LINK, value);
    }

    let list = ExperimentList {
        experiments: page.experiments,
        ..ExperimentList::default()
    };
    Ok((headers, Json(list)).into_response())
}

async fn get_experiment(State(ctx): Ctx, Path(name): Path<String>) -> Result<Response, StubError> {
    let (experiment, last_modified) = ctx.get_experiment(&name)?;
    let headers = experiment_headers(&name, &last_modified)?;
    Ok((headers, Json(experiment)).into_response())
}

async fn put_experiment(
    State(ctx): Ctx,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, StubError> {
    let name = ExperimentName::new(name)
        .map_err(|e| StubError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    let experiment: Experiment = parse_json(&body)?;

    let stored = ctx.put_experiment(&name, experiment)?;
    let mut headers = experiment_headers(name.as_str(), &stored.last_modified)?;

    let status = if stored.created {
        headers.insert(LOCATION, header_value(&experiment_path(name.as_str()))?);
        tracing::info!(experiment = %name, "Created experiment");
        StatusCode::CREATED
    } else {
        tracing::info!(experiment = %name, "Updated experiment");
        StatusCode::OK
    };

    Ok((status, headers, Json(stored.experiment)).into_response())
}

async fn delete_experiment(
    State(ctx): Ctx,
    Path(name): Path<String>,
) -> Result<StatusCode, StubError> {
    ctx.delete_experiment(&name)?;
    tracing::info!(experiment = %name, "Deleted experiment");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_trials(State(ctx): Ctx, Path(name): Path<String>) -> Result<Response, StubError> {
    let trials = ctx.list_trials(&name)?;
    Ok(Json(TrialList { trials }).into_response())
}

async fn create_trial(
    State(ctx): Ctx,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, StubError> {
    let trial: TrialAssignments = parse_json(&body)?;
    let id = ctx.create_trial(&name, trial.assignments)?;

    let location = header_value(&trial_path(&name, id))?;
    tracing::info!(experiment = %name, trial = id, "Created trial");
    Ok((StatusCode::CREATED, [(LOCATION, location)]).into_response())
}

async fn next_trial(State(ctx): Ctx, Path(name): Path<String>) -> Result<Response, StubError> {
    let (id, assignments) = ctx.next_trial(&name).inspect_err(|e| {
        tracing::debug!(experiment = %name, status = %e.status, "No trial dispensed");
    })?;

    let location = header_value(&trial_path(&name, id))?;
    tracing::info!(experiment = %name, trial = id, "Dispensed trial");

    let trial = TrialAssignments {
        assignments,
        ..TrialAssignments::default()
    };
    Ok((StatusCode::OK, [(LOCATION, location)], Json(trial)).into_response())
}

async fn report_trial(
    State(ctx): Ctx,
    Path((name, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, StubError> {
    let values: TrialValues = parse_json(&body)?;
    let failed = values.failed;
    ctx.report_trial(&name, &id, values)?;
    tracing::info!(experiment = %name, trial = %id, failed, "Trial reported");
    Ok(StatusCode::CREATED)
}

async fn require_token(State(ctx): Ctx, request: Request, next: Next) -> Response {
    if let Some(expected) = &ctx.config.token {
        let presented = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            tracing::debug!(uri = %request.uri(), "Rejected unauthenticated request");
            return StubError::new(StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    next.run(request).await
}

/// Build the stub server's routes around `context`.
pub fn router(context: Arc<StubContext>) -> Router {
    Router::new()
        .route("/experiments", get(list_experiments))
        .route(
            "/experiments/{name}",
            get(get_experiment)
                .put(put_experiment)
                .delete(delete_experiment),
        )
        .route(
            "/experiments/{name}/trials",
            get(list_trials).post(create_trial),
        )
        .route("/experiments/{name}/trials/{id}", post(report_trial))
        .route("/experiments/{name}/nextTrial", post(next_trial))
        .layer(middleware::from_fn_with_state(context.clone(), require_token))
        .with_state(context)
}

// ============================================================================
// Test Server
// ============================================================================

/// A stub server running on a background task. Stops when dropped.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    context: Arc<StubContext>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Start a server on an ephemeral localhost port.
    pub async fn start(config: StubConfig) -> Result<Self> {
        Self::bind("127.0.0.1:0", config).await
    }

    pub async fn bind(addr: &str, config: StubConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;
        let addr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        let context = Arc::new(StubContext::new(config));
        let app = router(context.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Stub server stopped");
            }
        });

        tracing::debug!(addr = %addr, "Stub Red Sky server started");
        Ok(Self {
            addr,
            context,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL to hand to a client.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn context(&self) -> &Arc<StubContext> {
        &self.context
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use redsky_api::{Bounds, Decimal, Metric, Optimization, Parameter, ParameterType};

    fn name(s: &str) -> ExperimentName {
        ExperimentName::new(s).unwrap()
    }

    fn experiment(budget: u32, parallel: u32) -> Experiment {
        Experiment {
            optimization: Optimization {
                experiment_budget: budget,
                parallel_trials: parallel,
                ..Optimization::default()
            },
            metrics: vec![Metric {
                name: "cost".to_string(),
                minimize: true,
            }],
            parameters: vec![
                Parameter {
                    name: "cpu".to_string(),
                    parameter_type: ParameterType::Integer,
                    bounds: Bounds {
                        min: Decimal::from(100i64),
                        max: Decimal::from(4000i64),
                    },
                },
                Parameter {
                    name: "ratio".to_string(),
                    parameter_type: ParameterType::Double,
                    bounds: Bounds {
                        min: "0.25".parse().unwrap(),
                        max: "0.75".parse().unwrap(),
                    },
                },
            ],
            ..Experiment::default()
        }
    }

    #[test]
    fn test_put_creates_then_updates() {
        let ctx = StubContext::new(StubConfig::default());
        assert!(ctx.put_experiment(&name("foo"), experiment(0, 0)).unwrap().created);

        let mut renamed = experiment(0, 0);
        renamed.display_name = "Foo".to_string();
        let stored = ctx.put_experiment(&name("foo"), renamed).unwrap();
        assert!(!stored.created);
        assert_eq!(stored.experiment.display_name, "Foo");
    }

    #[test]
    fn test_put_rejects_parameter_changes() {
        let ctx = StubContext::new(StubConfig::default());
        ctx.put_experiment(&name("foo"), experiment(0, 0)).unwrap();

        let mut changed = experiment(0, 0);
        changed.parameters.pop();
        let err = ctx.put_experiment(&name("foo"), changed).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_put_rejects_invalid_definitions() {
        let ctx = StubContext::new(StubConfig::default());
        let mut invalid = experiment(0, 0);
        invalid.parameters[0].bounds.min = Decimal::from(5000i64);
        let err = ctx.put_experiment(&name("foo"), invalid).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(ctx.experiment_names().is_empty());
    }

    #[test]
    fn test_dispense_lower_bounds() {
        let ctx = StubContext::new(StubConfig::default());
        ctx.put_experiment(&name("foo"), experiment(0, 0)).unwrap();

        let (id, assignments) = ctx.next_trial("foo").unwrap();
        assert_eq!(id, 1);
        assert_eq!(
            assignments,
            vec![
                Assignment::new("cpu", 100i64),
                Assignment {
                    parameter_name: "ratio".to_string(),
                    value: "0.25".parse().unwrap(),
                },
            ]
        );
        assert_eq!(ctx.next_trial("foo").unwrap().0, 2);
    }

    #[test]
    fn test_dispense_limits() {
        let ctx = StubContext::new(StubConfig {
            retry_after: 30,
            ..StubConfig::default()
        });
        ctx.put_experiment(&name("foo"), experiment(2, 1)).unwrap();

        ctx.next_trial("foo").unwrap();
        let err = ctx.next_trial("foo").unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.retry_after, Some(30));

        ctx.report_trial("foo", "1", TrialValues::failed()).unwrap();
        ctx.next_trial("foo").unwrap();
        ctx.report_trial("foo", "2", TrialValues::failed()).unwrap();

        // Budget spent, and it stays spent
        for _ in 0..2 {
            let err = ctx.next_trial("foo").unwrap_err();
            assert_eq!(err.status(), StatusCode::GONE);
        }

        let err = ctx.next_trial("missing").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_report_once() {
        let ctx = StubContext::new(StubConfig::default());
        ctx.put_experiment(&name("foo"), experiment(0, 0)).unwrap();
        ctx.next_trial("foo").unwrap();

        let err = ctx
            .report_trial("foo", "1", TrialValues::observed(vec![Value::new("speed", 1.0)]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        ctx.report_trial("foo", "1", TrialValues::observed(vec![Value::new("cost", 3.5)]))
            .unwrap();
        let err = ctx
            .report_trial("foo", "1", TrialValues::observed(vec![Value::new("cost", 3.5)]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        for id in ["0", "2", "abc"] {
            let err = ctx.report_trial("foo", id, TrialValues::failed()).unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
        }

        let trials = ctx.list_trials("foo").unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].status, TrialStatus::Completed);
        assert_eq!(trials[0].value("cost"), Some(3.5));
    }

    #[test]
    fn test_failed_report_stores_no_values() {
        let ctx = StubContext::new(StubConfig::default());
        ctx.put_experiment(&name("foo"), experiment(0, 0)).unwrap();
        ctx.next_trial("foo").unwrap();

        let values = TrialValues {
            values: vec![Value::new("cost", 3.5)],
            failed: true,
        };
        ctx.report_trial("foo", "1", values).unwrap();

        let trials = ctx.list_trials("foo").unwrap();
        assert!(trials[0].failed);
        assert!(trials[0].values.is_empty());
    }

    #[test]
    fn test_create_trial_validates_names() {
        let ctx = StubContext::new(StubConfig::default());
        ctx.put_experiment(&name("foo"), experiment(0, 0)).unwrap();

        let id = ctx
            .create_trial("foo", vec![Assignment::new("cpu", 200i64)])
            .unwrap();
        assert_eq!(id, 1);

        let err = ctx
            .create_trial("foo", vec![Assignment::new("memory", 1i64)])
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message(), "unknown parameter: memory");
    }

    #[test]
    fn test_list_pages() {
        let ctx = StubContext::new(StubConfig::default());
        for n in ["a", "b", "c", "d", "e"] {
            ctx.put_experiment(&name(n), experiment(0, 0)).unwrap();
        }

        let page = ctx.list_experiments(ExperimentListQuery { offset: 0, limit: 2 });
        let refs: Vec<_> = page
            .experiments
            .iter()
            .map(|i| i.item_ref.clone().unwrap())
            .collect();
        assert_eq!(refs, vec!["/experiments/a", "/experiments/b"]);
        assert_eq!(page.next, Some(ExperimentListQuery { offset: 2, limit: 2 }));
        assert_eq!(page.prev, None);

        let page = ctx.list_experiments(ExperimentListQuery { offset: 4, limit: 2 });
        assert_eq!(page.experiments.len(), 1);
        assert_eq!(page.next, None);
        assert_eq!(page.prev, Some(ExperimentListQuery { offset: 2, limit: 2 }));

        let page = ctx.list_experiments(ExperimentListQuery::default());
        assert_eq!(page.experiments.len(), 5);
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_links() {
        assert_eq!(page_path(&ExperimentListQuery { offset: 0, limit: 2 }), "/experiments?limit=2");
        assert_eq!(page_path(&ExperimentListQuery::default()), "/experiments");

        let headers = experiment_headers("foo", &Utc::now()).unwrap();
        let links = redsky_api::meta::parse_link_header(headers[LINK].to_str().unwrap());
        let uris: Vec<_> = links.iter().map(|l| l.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec![
                "/experiments/foo",
                "/experiments/foo/trials",
                "/experiments/foo/nextTrial"
            ]
        );
        assert!(headers.contains_key(LAST_MODIFIED));
    }
}
