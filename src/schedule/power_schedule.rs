// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The power schedule as stored by the backend.

use crate::types::TimeOfDay;

use super::{ScheduleDisplay, ScheduleStatus, ScheduleWindow};

/// Daily power schedule.
///
/// Only `open_power` drives the on/off decision. `close_power` is carried
/// through loads, saves and form reconciliation but is never evaluated.
///
/// A schedule is replaced wholesale on every load or save; it is never
/// mutated field by field.
///
/// # Examples
///
/// ```
/// use powersched_lib::schedule::PowerSchedule;
/// use powersched_lib::types::TimeOfDay;
///
/// let json = r#"{
///     "open_power": {"start": "08:00:00", "end": "18:00:00"},
///     "close_power": {"start": "18:00:00", "end": "08:00:00"}
/// }"#;
/// let schedule: PowerSchedule = serde_json::from_str(json).unwrap();
///
/// assert!(schedule.is_supplying(TimeOfDay::from_hm(9, 0).unwrap()));
/// assert!(!schedule.is_supplying(TimeOfDay::from_hm(19, 0).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PowerSchedule {
    /// Window during which meters are supplied.
    pub open_power: ScheduleWindow,
    /// Window during which supply is cut. Stored and displayed only.
    pub close_power: ScheduleWindow,
}

impl PowerSchedule {
    /// Creates a schedule.
    #[must_use]
    pub const fn new(open_power: ScheduleWindow, close_power: ScheduleWindow) -> Self {
        Self {
            open_power,
            close_power,
        }
    }

    /// Returns `true` if meters should be powered at `now`.
    #[must_use]
    pub fn is_supplying(&self, now: TimeOfDay) -> bool {
        self.open_power.is_within(now)
    }

    /// Returns the supply status at `now`.
    #[must_use]
    pub fn status(&self, now: TimeOfDay) -> ScheduleStatus {
        ScheduleStatus::from(self.is_supplying(now))
    }

    /// Returns the status and time-range label at `now`.
    #[must_use]
    pub fn display(&self, now: TimeOfDay) -> ScheduleDisplay {
        ScheduleDisplay::new(self.status(now), self.open_power.range_label())
    }
}
