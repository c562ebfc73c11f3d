// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derived supply status shown on the dashboard.

use std::fmt;

/// Whether the schedule currently calls for power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// Inside the open-power window.
    Supplying,
    /// Outside the open-power window.
    Stopped,
}

impl ScheduleStatus {
    /// Returns the status label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Supplying => "Supplying",
            Self::Stopped => "Stopped",
        }
    }

    /// Returns `true` for [`ScheduleStatus::Supplying`].
    #[must_use]
    pub const fn is_supplying(&self) -> bool {
        matches!(self, Self::Supplying)
    }
}

impl From<bool> for ScheduleStatus {
    fn from(supplying: bool) -> Self {
        if supplying {
            Self::Supplying
        } else {
            Self::Stopped
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status and time-range label recomputed on every tick and schedule change.
///
/// # Examples
///
/// ```
/// use powersched_lib::schedule::{ScheduleDisplay, ScheduleStatus};
///
/// let display = ScheduleDisplay::new(ScheduleStatus::Supplying, "08:00 - 18:00");
/// assert_eq!(display.status_label(), "Supplying");
/// assert_eq!(display.time_range_label(), "Supply window: 08:00 - 18:00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleDisplay {
    /// Current status.
    pub status: ScheduleStatus,
    /// Time range of the open-power window.
    pub time_range: String,
}

impl ScheduleDisplay {
    /// Creates a display value.
    #[must_use]
    pub fn new(status: ScheduleStatus, time_range: impl Into<String>) -> Self {
        Self {
            status,
            time_range: time_range.into(),
        }
    }

    /// Returns the status label.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    /// Returns the prefixed time-range label.
    #[must_use]
    pub fn time_range_label(&self) -> String {
        format!("Supply window: {}", self.time_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_bool() {
        assert_eq!(ScheduleStatus::from(true), ScheduleStatus::Supplying);
        assert_eq!(ScheduleStatus::from(false), ScheduleStatus::Stopped);
    }

    #[test]
    fn status_labels() {
        assert_eq!(ScheduleStatus::Supplying.to_string(), "Supplying");
        assert_eq!(ScheduleStatus::Stopped.to_string(), "Stopped");
    }
}
