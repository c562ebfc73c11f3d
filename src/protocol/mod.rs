// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote services consumed by the dashboard core.
//!
//! The schedule store and the meter registry are reached through
//! [`RemoteScheduleService`] and [`RemoteMeterService`]. [`HttpBackend`]
//! implements both against the dashboard's REST API; tests and alternative
//! transports provide their own implementations.
//!
//! Every backend reply is wrapped in an [`ApiEnvelope`].

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpBackend, HttpConfig};

use std::future::Future;

use crate::error::{Error, ParseError, Result};
use crate::schedule::PowerSchedule;
use crate::types::MeterId;

/// Standard reply wrapper: `{success, data?, error?, message?}`.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct ApiEnvelope<T> {
    /// Whether the backend accepted the request.
    pub success: bool,
    /// Payload on success.
    pub data: Option<T>,
    /// Error description on failure.
    pub error: Option<String>,
    /// Human-readable status message.
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Returns the payload, treating a missing payload as an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` when `success` is false and
    /// `ParseError::MissingField` when `data` is absent.
    pub fn into_data(self) -> Result<T> {
        self.into_optional()?
            .ok_or_else(|| ParseError::MissingField("data".to_string()).into())
    }

    /// Returns the payload if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` when `success` is false.
    pub fn into_optional(self) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Error::Rejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// A meter as listed by the backend registry.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MeterInfo {
    /// Meter identifier.
    #[serde(alias = "meter_id")]
    pub id: MeterId,
    /// Reported relay state.
    #[serde(default)]
    pub power_on: bool,
    /// Voltage in volts.
    #[serde(default)]
    pub voltage: f64,
    /// Current in amperes.
    #[serde(default)]
    pub current: f64,
    /// Active power.
    #[serde(default)]
    pub power: f64,
    /// Energy used today in kWh.
    #[serde(default)]
    pub daily_energy: Option<f64>,
    /// Cumulative energy in kWh.
    #[serde(default)]
    pub energy: Option<f64>,
    /// Cost accrued today.
    #[serde(default)]
    pub cost_today: Option<f64>,
    /// Household name.
    #[serde(default)]
    pub name: Option<String>,
    /// Parking space label.
    #[serde(default)]
    pub parking: Option<String>,
    /// `"online"` or `"offline"`.
    #[serde(default)]
    pub status: Option<String>,
}

impl MeterInfo {
    /// Returns `true` unless the backend reported the meter offline.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status.as_deref() != Some("offline")
    }
}

/// Per-meter outcome of a batch control request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct BatchControlResult {
    /// Meter identifier.
    pub meter_id: MeterId,
    /// Whether the relay accepted the command.
    pub success: bool,
}

/// Summary of a batch control request.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct BatchControlReport {
    /// Number of meters addressed.
    #[serde(default)]
    pub total_count: usize,
    /// Number of meters switched.
    #[serde(default)]
    pub success_count: usize,
    /// Number of meters that failed.
    #[serde(default)]
    pub failed_count: usize,
    /// Individual results.
    #[serde(default)]
    pub results: Vec<BatchControlResult>,
}

/// Polling interval section of the system configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct UpdateInterval {
    /// Current interval in seconds.
    pub current: u64,
}

/// Subset of the system configuration the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SystemConfig {
    /// Stored power schedule, if configured.
    #[serde(default)]
    pub power_schedule: Option<PowerSchedule>,
    /// Polling interval, if configured.
    #[serde(default)]
    pub update_interval: Option<UpdateInterval>,
}

/// Remote store holding the power schedule.
pub trait RemoteScheduleService: Send + Sync {
    /// Fetches the current schedule.
    fn fetch_schedule(&self) -> impl Future<Output = Result<PowerSchedule>> + Send;

    /// Replaces the stored schedule and returns what the backend stored.
    fn save_schedule(
        &self,
        schedule: &PowerSchedule,
    ) -> impl Future<Output = Result<PowerSchedule>> + Send;

    /// Fetches the system configuration.
    ///
    /// The default implementation wraps [`fetch_schedule`](Self::fetch_schedule).
    fn fetch_config(&self) -> impl Future<Output = Result<SystemConfig>> + Send {
        async {
            Ok(SystemConfig {
                power_schedule: Some(self.fetch_schedule().await?),
                update_interval: None,
            })
        }
    }
}

/// Remote registry of meters and their relays.
pub trait RemoteMeterService: Send + Sync {
    /// Lists all meters with their latest readings.
    fn list_meters(&self) -> impl Future<Output = Result<Vec<MeterInfo>>> + Send;

    /// Switches one meter's relay.
    fn set_power(
        &self,
        meter_id: MeterId,
        power_on: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Switches several relays in one request.
    fn batch_set_power(
        &self,
        meter_ids: &[MeterId],
        power_on: bool,
    ) -> impl Future<Output = Result<BatchControlReport>> + Send;
}
