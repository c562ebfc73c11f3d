// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schedule change notifications pushed by the backend.

use crate::error::{ParseError, Result};
use crate::schedule::PowerSchedule;

/// Payload of a server-side schedule change: `{"schedule": {...}, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleEvent {
    /// The new schedule.
    pub schedule: PowerSchedule,
    /// Message to show the user.
    #[serde(default)]
    pub message: Option<String>,
}

impl ScheduleEvent {
    /// Parses a raw push payload.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the payload is not a schedule event.
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| ParseError::Json(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::TimeOfDay;

    #[test]
    fn parse_push_payload() {
        let event = ScheduleEvent::parse(
            r#"{
                "schedule": {
                    "open_power": {"start": "07:00:00", "end": "23:00:00"},
                    "close_power": {"start": "23:00:00", "end": "07:00:00"}
                },
                "message": "Power schedule updated"
            }"#,
        )
        .unwrap();
        assert_eq!(event.schedule.open_power.start, TimeOfDay::from_hm(7, 0).unwrap());
        assert_eq!(event.message.as_deref(), Some("Power schedule updated"));
    }

    #[test]
    fn message_is_optional() {
        let event = ScheduleEvent::parse(
            r#"{"schedule": {
                "open_power": {"start": "07:00", "end": "23:00"},
                "close_power": {"start": "23:00", "end": "07:00"}
            }}"#,
        )
        .unwrap();
        assert!(event.message.is_none());
    }

    #[test]
    fn malformed_payload_is_parse_error() {
        assert!(matches!(
            ScheduleEvent::parse(r#"{"message": "no schedule"}"#),
            Err(Error::Parse(ParseError::Json(_)))
        ));
    }
}
