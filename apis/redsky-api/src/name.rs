// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Experiment names.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest name accepted, matching a Kubernetes object name.
const MAX_NAME_LEN: usize = 253;

/// The name used to address an experiment on the server.
///
/// Experiments mirror cluster resources, so names follow the same shape as a
/// Kubernetes object name: lowercase alphanumerics, `-` and `.`, beginning and
/// ending with an alphanumeric. Two names are equal when their text is equal.
///
/// Not to be confused with [`Experiment::display_name`](crate::Experiment),
/// which is free text and must never be used to build URLs.
///
/// Serialized as a plain string. Deserializing validates like
/// [`ExperimentName::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentName(String);

/// Returned by [`ExperimentName::new`] for names of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid experiment name: {0:?}")]
pub struct InvalidExperimentName(pub String);

impl ExperimentName {
    /// Create a new name, validating its shape.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidExperimentName> {
        let name = name.into();
        if is_valid_name(&name) {
            Ok(Self(name))
        } else {
            Err(InvalidExperimentName(name))
        }
    }

    /// Create without validation (for trusted sources like server responses)
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_name(name: &str) -> bool {
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && edge_ok(name.chars().next())
        && edge_ok(name.chars().last())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExperimentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExperimentName {
    type Error = InvalidExperimentName;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<ExperimentName> for String {
    fn from(name: ExperimentName) -> Self {
        name.0
    }
}

impl std::str::FromStr for ExperimentName {
    type Err = InvalidExperimentName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["foo", "postgres-example", "a.b-c", "x1", "0"] {
            assert!(ExperimentName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "a".repeat(MAX_NAME_LEN + 1);
        for name in ["", "Foo", "-foo", "foo-", "foo_bar", "foo/bar", "foo bar", &too_long] {
            assert!(ExperimentName::new(name).is_err(), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_equality_is_by_name() {
        let a = ExperimentName::new("foo").unwrap();
        let b = ExperimentName::new_unchecked("foo");
        assert_eq!(a, b);
        assert_ne!(a, ExperimentName::new_unchecked("bar"));
    }

    #[test]
    fn test_unchecked_skips_validation() {
        let name = ExperimentName::new_unchecked("Not Valid");
        assert_eq!(name.as_str(), "Not Valid");
    }

    #[test]
    fn test_serde_validates() {
        let name: ExperimentName = serde_json::from_str(r#""postgres-example""#).unwrap();
        assert_eq!(name.as_str(), "postgres-example");
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""postgres-example""#);

        let err = serde_json::from_str::<ExperimentName>(r#""Bad_Name""#).unwrap_err();
        assert!(err.to_string().contains("Bad_Name"), "{err}");
        assert!(serde_json::from_str::<ExperimentName>(r#""""#).is_err());
    }
}
