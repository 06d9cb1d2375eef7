// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Experiment resources.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::decimal::Decimal;
use crate::meta::{Meta, lookup_relation};
use crate::{REL_NEXT, REL_NEXT_TRIAL, REL_PREV, REL_PREVIOUS, REL_SELF, REL_TRIALS};

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Experiment
// ============================================================================

/// Controls how the optimizer generates trials. Zero means "server default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    /// The estimated number of trial runs to perform for an experiment.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub experiment_budget: u32,
    /// The total number of concurrent trial runs supported for an experiment.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub parallel_trials: u32,
    /// The total number of random trials used to start an experiment.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub burn_in: u32,
}

/// An outcome being optimized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// Whether lower observed values are better.
    #[serde(default, skip_serializing_if = "is_false")]
    pub minimize: bool,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ParameterType {
    #[default]
    #[serde(rename = "int")]
    #[strum(serialize = "int")]
    Integer,
    #[serde(rename = "double")]
    #[strum(serialize = "double")]
    Double,
}

/// The domain of a numeric parameter, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Decimal,
    pub max: Decimal,
}

/// A variable tuned by the experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    pub bounds: Bounds,
}

/// Links and timestamps describing where an experiment lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentMeta {
    pub self_link: Option<String>,
    /// The trial collection: list trials or submit one directly.
    pub trials: Option<String>,
    /// The dispenser handing out the next suggested trial.
    pub next_trial: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
enum ExperimentLink {
    SelfLink,
    Trials,
    NextTrial,
}

const EXPERIMENT_RELATIONS: &[(&str, ExperimentLink)] = &[
    (REL_SELF, ExperimentLink::SelfLink),
    (REL_TRIALS, ExperimentLink::Trials),
    (REL_NEXT_TRIAL, ExperimentLink::NextTrial),
];

impl Meta for ExperimentMeta {
    // A created experiment is announced through `Location`; a `self` link,
    // when present, is processed afterwards and wins.
    fn set_location(&mut self, location: &str) {
        self.self_link = Some(location.to_string());
    }

    fn set_last_modified(&mut self, last_modified: DateTime<Utc>) {
        self.last_modified = Some(last_modified);
    }

    fn set_link(&mut self, rel: &str, link: &str) {
        let slot = match lookup_relation(EXPERIMENT_RELATIONS, rel) {
            Some(ExperimentLink::SelfLink) => &mut self.self_link,
            Some(ExperimentLink::Trials) => &mut self.trials,
            Some(ExperimentLink::NextTrial) => &mut self.next_trial,
            None => return,
        };
        *slot = Some(link.to_string());
    }
}

/// The search space, outcomes and optimization configuration of an
/// experiment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    #[serde(skip)]
    pub meta: ExperimentMeta,

    /// Human readable name. Do not use for generating URLs!
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default)]
    pub optimization: Optimization,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Reasons an experiment definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidExperiment {
    #[error("metric name must not be empty")]
    EmptyMetricName,

    #[error("parameter name must not be empty")]
    EmptyParameterName,

    #[error("duplicate metric name: {0}")]
    DuplicateMetric(String),

    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("parameter {0} has a minimum greater than its maximum")]
    InvertedBounds(String),

    #[error("integer parameter {0} has fractional bounds")]
    FractionalBounds(String),
}

impl Experiment {
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check the invariants the server enforces on experiment definitions.
    pub fn validate(&self) -> Result<(), InvalidExperiment> {
        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.name.is_empty() {
                return Err(InvalidExperiment::EmptyMetricName);
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(InvalidExperiment::DuplicateMetric(metric.name.clone()));
            }
        }

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if parameter.name.is_empty() {
                return Err(InvalidExperiment::EmptyParameterName);
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(InvalidExperiment::DuplicateParameter(parameter.name.clone()));
            }

            let Bounds { min, max } = &parameter.bounds;
            if parameter.parameter_type == ParameterType::Integer
                && !(min.is_integer() && max.is_integer())
            {
                return Err(InvalidExperiment::FractionalBounds(parameter.name.clone()));
            }
            if min.cmp_value(max) == Ordering::Greater {
                return Err(InvalidExperiment::InvertedBounds(parameter.name.clone()));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Experiment Lists
// ============================================================================

/// One entry of an experiment listing.
///
/// On the wire the entry is the experiment body with an extra `itemRef`
/// field. The conversion goes through an explicit representation rather than
/// `#[serde(flatten)]`, which does not cope with arbitrary precision numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ExperimentItemRepr", into = "ExperimentItemRepr")]
pub struct ExperimentItem {
    pub experiment: Experiment,
    /// The absolute URL used to reference the individual experiment.
    pub item_ref: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperimentItemRepr {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    display_name: String,
    #[serde(default)]
    optimization: Optimization,
    #[serde(default)]
    metrics: Vec<Metric>,
    #[serde(default)]
    parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_ref: Option<String>,
}

impl From<ExperimentItemRepr> for ExperimentItem {
    fn from(repr: ExperimentItemRepr) -> Self {
        ExperimentItem {
            experiment: Experiment {
                meta: ExperimentMeta::default(),
                display_name: repr.display_name,
                optimization: repr.optimization,
                metrics: repr.metrics,
                parameters: repr.parameters,
            },
            item_ref: repr.item_ref.filter(|r| !r.is_empty()),
        }
    }
}

impl From<ExperimentItem> for ExperimentItemRepr {
    fn from(item: ExperimentItem) -> Self {
        let ExperimentItem {
            experiment,
            item_ref,
        } = item;
        ExperimentItemRepr {
            display_name: experiment.display_name,
            optimization: experiment.optimization,
            metrics: experiment.metrics,
            parameters: experiment.parameters,
            item_ref,
        }
    }
}

/// Pagination links of an experiment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentListMeta {
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum PageLink {
    Next,
    Prev,
}

const PAGE_RELATIONS: &[(&str, PageLink)] = &[
    (REL_NEXT, PageLink::Next),
    (REL_PREV, PageLink::Prev),
    (REL_PREVIOUS, PageLink::Prev),
];

impl Meta for ExperimentListMeta {
    fn set_link(&mut self, rel: &str, link: &str) {
        let slot = match lookup_relation(PAGE_RELATIONS, rel) {
            Some(PageLink::Next) => &mut self.next,
            Some(PageLink::Prev) => &mut self.prev,
            None => return,
        };
        *slot = Some(link.to_string());
    }
}

/// A page of experiments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentList {
    #[serde(skip)]
    pub meta: ExperimentListMeta,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<ExperimentItem>,
}

/// Offset/limit paging for the experiment listing. Zero means "unset", and
/// unset fields are left out of the query string entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentListQuery {
    pub offset: u32,
    pub limit: u32,
}

impl ExperimentListQuery {
    /// Encode as a query string, keys in sorted order (`limit` before
    /// `offset`). Returns an empty string when nothing is set.
    pub fn encode(&self) -> String {
        let mut pairs = Vec::with_capacity(2);
        if self.limit != 0 {
            pairs.push(format!("limit={}", self.limit));
        }
        if self.offset != 0 {
            pairs.push(format!("offset={}", self.offset));
        }
        pairs.join("&")
    }
}
