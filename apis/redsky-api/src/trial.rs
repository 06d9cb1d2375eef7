// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Trial resources.
//!
//! A trial starts life as a set of [`TrialAssignments`], either dispensed by
//! the server or submitted directly by a client. Both paths hand back a
//! one-time report link (the `Location` header) which is later used to
//! submit the observed [`TrialValues`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::decimal::Decimal;
use crate::meta::Meta;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Where to report a trial's outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialMeta {
    pub report_trial: Option<String>,
}

// Trials only learn their report link from `Location`; link relations are
// ignored.
impl Meta for TrialMeta {
    fn set_location(&mut self, location: &str) {
        self.report_trial = Some(location.to_string());
    }
}

/// A value assigned to one experiment parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub parameter_name: String,
    pub value: Decimal,
}

impl Assignment {
    pub fn new(parameter_name: impl Into<String>, value: impl Into<Decimal>) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            value: value.into(),
        }
    }
}

/// The parameter assignments of one trial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialAssignments {
    #[serde(skip)]
    pub meta: TrialMeta,

    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// An observed metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    pub metric_name: String,
    pub value: f64,
    /// The observed error of the metric, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
}

impl Value {
    pub fn new(metric_name: impl Into<String>, value: f64) -> Self {
        Self {
            metric_name: metric_name.into(),
            value,
            error: None,
        }
    }
}

/// The outcome of a trial.
///
/// When `failed` is set the values carry no meaning; the report operation
/// drops them before anything is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialValues {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub failed: bool,
}

impl TrialValues {
    /// A successful outcome with the given observations.
    pub fn observed(values: Vec<Value>) -> Self {
        Self {
            values,
            failed: false,
        }
    }

    /// A failed outcome.
    pub fn failed() -> Self {
        Self {
            values: Vec::new(),
            failed: true,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrialStatus {
    #[default]
    Staged,
    Active,
    Completed,
    Failed,
}

/// A trial as it appears in a trial listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialItem {
    #[serde(skip)]
    pub meta: TrialMeta,

    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub failed: bool,
    #[serde(default)]
    pub status: TrialStatus,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl TrialItem {
    /// The value assigned to `parameter`.
    pub fn assignment(&self, parameter: &str) -> Option<&Decimal> {
        self.assignments
            .iter()
            .find(|a| a.parameter_name == parameter)
            .map(|a| &a.value)
    }

    /// The observed value of `metric`.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.metric_name == metric)
            .map(|v| v.value)
    }

    /// A short name for the trial: the last path segment of its report link.
    pub fn name(&self) -> Option<&str> {
        self.meta
            .report_trial
            .as_deref()
            .and_then(|link| link.trim_end_matches('/').rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialList {
    #[serde(default)]
    pub trials: Vec<TrialItem>,
}
