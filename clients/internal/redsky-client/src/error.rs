// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for redsky-client
//!
//! Every operation declares which non-success statuses it expects, as a
//! table of [`StatusCode`] to [`ErrorKind`]. Anything an operation does not
//! list goes through [`classify`], the one place that decides what an
//! unhandled status means: `401` is [`Error::Unauthorized`] everywhere and
//! any other status is [`Error::UnexpectedResponse`].
//!
//! Transport failures (connection refused, timeouts, TLS) stay
//! [`Error::Transport`] and are never folded into a protocol error.

use std::time::Duration;

use http::HeaderMap;
use http::header::RETRY_AFTER;
use reqwest::StatusCode;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// How long to wait before polling again when a `503` carries no usable
/// `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// The protocol error kinds, named as the server documents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    ExperimentNameInvalid,
    ExperimentNameConflict,
    ExperimentInvalid,
    ExperimentNotFound,
    ExperimentStopped,
    TrialInvalid,
    TrialUnavailable,
    TrialNotFound,
    Unauthorized,
    UnexpectedResponse,
}

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected the experiment name (`400`).
    #[error("experiment-name-invalid")]
    ExperimentNameInvalid,

    /// An experiment with this name exists and cannot be replaced (`409`).
    #[error("experiment-name-conflict")]
    ExperimentNameConflict,

    /// The experiment definition was rejected (`422`).
    #[error("experiment-invalid")]
    ExperimentInvalid,

    #[error("experiment-not-found")]
    ExperimentNotFound,

    /// The experiment will not produce any more trials (`410`). Polling the
    /// dispenser again will not change that.
    #[error("experiment-stopped")]
    ExperimentStopped,

    /// The trial assignments or values were rejected (`422`).
    #[error("trial-invalid")]
    TrialInvalid,

    /// No trial is available right now (`503`); poll again after
    /// `retry_after`.
    #[error("trial-unavailable (retry after {}s)", .retry_after.as_secs())]
    TrialUnavailable { retry_after: Duration },

    /// The report link is unknown, expired or already used (`404`).
    #[error("trial-not-found")]
    TrialNotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("unexpected server response: {}", .0.as_u16())]
    UnexpectedResponse(StatusCode),

    /// A success response lacked a header the protocol requires.
    #[error("response is missing the {0} header")]
    MissingHeader(&'static str),

    /// The request could not be completed (connection, timeout, TLS...).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The protocol error kind, or `None` for transport, codec, URL and
    /// configuration failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        let kind = match self {
            Error::ExperimentNameInvalid => ErrorKind::ExperimentNameInvalid,
            Error::ExperimentNameConflict => ErrorKind::ExperimentNameConflict,
            Error::ExperimentInvalid => ErrorKind::ExperimentInvalid,
            Error::ExperimentNotFound => ErrorKind::ExperimentNotFound,
            Error::ExperimentStopped => ErrorKind::ExperimentStopped,
            Error::TrialInvalid => ErrorKind::TrialInvalid,
            Error::TrialUnavailable { .. } => ErrorKind::TrialUnavailable,
            Error::TrialNotFound => ErrorKind::TrialNotFound,
            Error::Unauthorized => ErrorKind::Unauthorized,
            Error::UnexpectedResponse(_) => ErrorKind::UnexpectedResponse,
            Error::MissingHeader(_)
            | Error::Transport(_)
            | Error::Decode(_)
            | Error::Encode(_)
            | Error::InvalidUrl { .. }
            | Error::Config(_) => return None,
        };
        Some(kind)
    }

    /// How long to wait before asking for a trial again, if the server asked
    /// for a back off.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::TrialUnavailable { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Whether repeating the request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TrialUnavailable { .. })
    }

    /// Whether the resource is gone for good and polling should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::ExperimentStopped | Error::ExperimentNotFound | Error::TrialNotFound
        )
    }

    /// The raw status of an unclassified response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedResponse(status) => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Status Classification
// ============================================================================

/// Expected failure statuses of one operation.
pub(crate) type StatusTable = &'static [(StatusCode, ErrorKind)];

pub(crate) const LIST_EXPERIMENTS_ERRORS: StatusTable = &[];

pub(crate) const GET_EXPERIMENT_ERRORS: StatusTable =
    &[(StatusCode::NOT_FOUND, ErrorKind::ExperimentNotFound)];

pub(crate) const CREATE_EXPERIMENT_ERRORS: StatusTable = &[
    (StatusCode::BAD_REQUEST, ErrorKind::ExperimentNameInvalid),
    (StatusCode::CONFLICT, ErrorKind::ExperimentNameConflict),
    (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::ExperimentInvalid),
];

pub(crate) const DELETE_EXPERIMENT_ERRORS: StatusTable =
    &[(StatusCode::NOT_FOUND, ErrorKind::ExperimentNotFound)];

pub(crate) const LIST_TRIALS_ERRORS: StatusTable = &[];

pub(crate) const CREATE_TRIAL_ERRORS: StatusTable =
    &[(StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::TrialInvalid)];

pub(crate) const NEXT_TRIAL_ERRORS: StatusTable = &[
    (StatusCode::GONE, ErrorKind::ExperimentStopped),
    (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::TrialUnavailable),
];

pub(crate) const REPORT_TRIAL_ERRORS: StatusTable = &[
    (StatusCode::NOT_FOUND, ErrorKind::TrialNotFound),
    (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::TrialInvalid),
];

/// Statuses every operation reports the same way.
const COMMON_ERRORS: StatusTable = &[(StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized)];

/// Turn a status an operation did not treat as success into an [`Error`].
pub(crate) fn classify(status: StatusCode, headers: &HeaderMap, expected: StatusTable) -> Error {
    let kind = lookup(expected, status)
        .or_else(|| lookup(COMMON_ERRORS, status))
        .unwrap_or(ErrorKind::UnexpectedResponse);

    let error = match kind {
        ErrorKind::ExperimentNameInvalid => Error::ExperimentNameInvalid,
        ErrorKind::ExperimentNameConflict => Error::ExperimentNameConflict,
        ErrorKind::ExperimentInvalid => Error::ExperimentInvalid,
        ErrorKind::ExperimentNotFound => Error::ExperimentNotFound,
        ErrorKind::ExperimentStopped => Error::ExperimentStopped,
        ErrorKind::TrialInvalid => Error::TrialInvalid,
        ErrorKind::TrialUnavailable => Error::TrialUnavailable {
            retry_after: retry_after(headers),
        },
        ErrorKind::TrialNotFound => Error::TrialNotFound,
        ErrorKind::Unauthorized => Error::Unauthorized,
        ErrorKind::UnexpectedResponse => {
            tracing::warn!(status = %status, "Unexpected server response");
            Error::UnexpectedResponse(status)
        }
    };

    tracing::debug!(status = %status, kind = %kind, "Classified error response");
    error
}

fn lookup(table: StatusTable, status: StatusCode) -> Option<ErrorKind> {
    table
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, kind)| *kind)
}

/// Read `Retry-After` as a number of seconds, falling back to
/// [`DEFAULT_RETRY_AFTER`] when it is missing or not an integer.
pub(crate) fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn with_retry_after(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(retry_after(&with_retry_after("30")), Duration::from_secs(30));
        assert_eq!(retry_after(&with_retry_after(" 7 ")), Duration::from_secs(7));
    }

    #[test]
    fn test_retry_after_default() {
        assert_eq!(retry_after(&HeaderMap::new()), DEFAULT_RETRY_AFTER);
        assert_eq!(retry_after(&with_retry_after("soon")), DEFAULT_RETRY_AFTER);
        assert_eq!(retry_after(&with_retry_after("-1")), DEFAULT_RETRY_AFTER);
        assert_eq!(
            retry_after(&with_retry_after("Wed, 21 Oct 2015 07:28:00 GMT")),
            DEFAULT_RETRY_AFTER
        );
        assert_eq!(DEFAULT_RETRY_AFTER, Duration::from_secs(5));
    }

    #[test]
    fn test_classify_expected_statuses() {
        let headers = HeaderMap::new();
        assert!(matches!(
            classify(StatusCode::GONE, &headers, NEXT_TRIAL_ERRORS),
            Error::ExperimentStopped
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, &headers, CREATE_EXPERIMENT_ERRORS),
            Error::ExperimentNameConflict
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, &headers, REPORT_TRIAL_ERRORS),
            Error::TrialNotFound
        ));

        let err = classify(
            StatusCode::SERVICE_UNAVAILABLE,
            &with_retry_after("10"),
            NEXT_TRIAL_ERRORS,
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(10)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_falls_through() {
        let headers = HeaderMap::new();
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, &headers, GET_EXPERIMENT_ERRORS),
            Error::Unauthorized
        ));

        // 404 only means "not found" to operations that list it
        let err = classify(StatusCode::NOT_FOUND, &headers, LIST_EXPERIMENTS_ERRORS);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.kind(), Some(ErrorKind::UnexpectedResponse));
        assert_eq!(err.to_string(), "unexpected server response: 404");

        // 503 is only special while dispensing
        let err = classify(StatusCode::SERVICE_UNAVAILABLE, &headers, REPORT_TRIAL_ERRORS);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::TrialUnavailable.to_string(), "trial-unavailable");
        assert_eq!(
            "experiment-name-conflict".parse::<ErrorKind>().unwrap(),
            ErrorKind::ExperimentNameConflict
        );
        assert_eq!(Error::ExperimentStopped.to_string(), "experiment-stopped");
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(Error::ExperimentStopped.is_terminal());
        assert!(Error::TrialNotFound.is_terminal());
        assert!(!Error::Unauthorized.is_terminal());
        assert!(
            !Error::TrialUnavailable {
                retry_after: DEFAULT_RETRY_AFTER
            }
            .is_terminal()
        );
        assert_eq!(Error::Config("x".to_string()).kind(), None);
    }
}
