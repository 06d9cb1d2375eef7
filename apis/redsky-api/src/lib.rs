// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Resource model for the Red Sky trial protocol.
//!
//! The Red Sky service proposes parameter assignments ("trials") for
//! black-box optimization experiments. Workers dispense a trial, run it and
//! report the observed metric values back. This crate holds the types that
//! travel over that protocol and the hypermedia plumbing used to navigate
//! between them:
//!
//! - [`Experiment`], [`ExperimentList`] and [`ExperimentListQuery`]
//! - [`TrialAssignments`], [`TrialValues`], [`TrialItem`] and [`TrialList`]
//! - [`Decimal`], the exact-precision number used for bounds and assignments
//! - [`ExperimentName`], the validated name used to address experiments
//! - [`meta`], which copies `Location`, `Last-Modified` and `Link` response
//!   headers into the metadata embedded in each resource
//!
//! Links are never part of a JSON body. They are populated from response
//! headers only, which is why every resource carries a `#[serde(skip)]`
//! metadata value next to its serialized fields.
//!
//! This crate performs no I/O; see `redsky-client` for the operations.

pub mod decimal;
pub mod experiment;
pub mod meta;
pub mod name;
pub mod trial;

pub use decimal::{Decimal, InvalidDecimal};
pub use experiment::{
    Bounds, Experiment, ExperimentItem, ExperimentList, ExperimentListMeta, ExperimentListQuery,
    ExperimentMeta, InvalidExperiment, Metric, Optimization, Parameter, ParameterType,
};
pub use meta::{Link, Meta};
pub use name::{ExperimentName, InvalidExperimentName};
pub use trial::{
    Assignment, TrialAssignments, TrialItem, TrialList, TrialMeta, TrialStatus, TrialValues, Value,
};

/// Path of the experiment collection, relative to the server address.
pub const ENDPOINT_EXPERIMENTS: &str = "/experiments";

// ============================================================================
// Link Relations
// ============================================================================

/// Relation naming the canonical URL of a resource.
pub const REL_SELF: &str = "self";

/// Relation naming the next page of a list.
pub const REL_NEXT: &str = "next";

/// Relation naming the previous page of a list.
pub const REL_PREV: &str = "prev";

/// Alternate spelling of [`REL_PREV`] accepted from servers.
pub const REL_PREVIOUS: &str = "previous";

/// Relation naming an experiment's trial collection.
pub const REL_TRIALS: &str = "https://carbonrelay.com/rel/trials";

/// Relation naming an experiment's next-trial dispenser.
pub const REL_NEXT_TRIAL: &str = "https://carbonrelay.com/rel/nextTrial";
