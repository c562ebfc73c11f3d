// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard event types.

use crate::reconcile::Decision;
use crate::schedule::{PowerSchedule, ScheduleDisplay};
use crate::types::MeterId;

/// Events emitted by the dashboard core.
///
/// # Examples
///
/// ```
/// use powersched_lib::event::DashboardEvent;
/// use powersched_lib::types::MeterId;
///
/// let event = DashboardEvent::power_changed(MeterId::new(3), true, true);
/// assert_eq!(event.meter_id(), Some(MeterId::new(3)));
/// assert!(event.is_meter_event());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DashboardEvent {
    /// The supply status or time-range label was recomputed.
    StatusUpdated(ScheduleDisplay),

    /// A schedule went through reconciliation.
    ScheduleReconciled {
        /// What happened to the form.
        decision: Decision,
    },

    /// The user saved a schedule.
    ScheduleSaved(PowerSchedule),

    /// A meter's local power state changed.
    MeterPowerChanged {
        /// The meter.
        meter_id: MeterId,
        /// The new local power state.
        powered_on: bool,
        /// `true` if the change is awaiting remote confirmation.
        optimistic: bool,
    },

    /// A failed commit was rolled back.
    PowerRolledBack {
        /// The meter.
        meter_id: MeterId,
        /// The restored power state.
        restored_on: bool,
        /// Why the commit failed.
        reason: String,
    },

    /// Meter data was refreshed from the registry.
    MetersRefreshed {
        /// Number of meters received.
        count: usize,
    },
}

impl DashboardEvent {
    /// Returns the meter this event concerns, if any.
    #[must_use]
    pub fn meter_id(&self) -> Option<MeterId> {
        match self {
            Self::MeterPowerChanged { meter_id, .. } | Self::PowerRolledBack { meter_id, .. } => {
                Some(*meter_id)
            }
            _ => None,
        }
    }

    /// Returns `true` for per-meter events.
    #[must_use]
    pub fn is_meter_event(&self) -> bool {
        self.meter_id().is_some()
    }

    /// Returns `true` for schedule events.
    #[must_use]
    pub fn is_schedule_event(&self) -> bool {
        matches!(
            self,
            Self::StatusUpdated(_) | Self::ScheduleReconciled { .. } | Self::ScheduleSaved(_)
        )
    }

    /// Creates a power change event.
    #[must_use]
    pub fn power_changed(meter_id: MeterId, powered_on: bool, optimistic: bool) -> Self {
        Self::MeterPowerChanged {
            meter_id,
            powered_on,
            optimistic,
        }
    }

    /// Creates a rollback event.
    #[must_use]
    pub fn rolled_back(meter_id: MeterId, restored_on: bool, reason: impl Into<String>) -> Self {
        Self::PowerRolledBack {
            meter_id,
            restored_on,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleStatus;

    #[test]
    fn meter_id_for_meter_events() {
        let event = DashboardEvent::rolled_back(MeterId::new(2), false, "timeout");
        assert_eq!(event.meter_id(), Some(MeterId::new(2)));
        assert!(!event.is_schedule_event());
    }

    #[test]
    fn schedule_events_have_no_meter() {
        let event =
            DashboardEvent::StatusUpdated(ScheduleDisplay::new(ScheduleStatus::Stopped, "x"));
        assert!(event.meter_id().is_none());
        assert!(event.is_schedule_event());
        assert!(!DashboardEvent::MetersRefreshed { count: 3 }.is_schedule_event());
    }
}
