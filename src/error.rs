// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `PowerSched` library.
//!
//! Network-boundary failures are converted into these types at the call site.
//! Outcomes that are not failures (a deferred schedule push, a load failure
//! that keeps the previous schedule) are reported through
//! [`Decision`](crate::reconcile::Decision) instead.

use thiserror::Error;

use crate::form::FormField;
use crate::types::MeterId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The backend answered with `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The schedule form fields never became available.
    #[error("schedule form fields are unavailable")]
    ElementsUnavailable,

    /// Meter is not tracked by the registry.
    #[error("meter {0} not found")]
    MeterNotFound(MeterId),

    /// A power-control commit failed for a single meter.
    #[error("power control for meter {meter_id} failed: {reason}")]
    CommitFailed {
        /// The meter whose commit failed.
        meter_id: MeterId,
        /// Description of the failure.
        reason: String,
    },

    /// A required schedule field was left empty.
    #[error("schedule field {0} is empty")]
    IncompleteForm(FormField),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// A time-of-day string could not be parsed.
    #[error("invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),
}

/// Errors related to communication with the backend.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the backend failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to parsing backend replies and push payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
