// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Daily on/off window and its containment test.

use std::fmt;

use crate::types::{MINUTES_PER_DAY, TimeOfDay};

/// A daily recurring window during which power should be on.
///
/// There is no ordering constraint between `start` and `end`: an `end`
/// earlier than `start` describes a window that crosses midnight.
///
/// # Examples
///
/// ```
/// use powersched_lib::schedule::ScheduleWindow;
/// use powersched_lib::types::TimeOfDay;
///
/// let night: ScheduleWindow = ScheduleWindow::parse("22:00", "06:00").unwrap();
/// assert!(night.crosses_midnight());
/// assert!(night.is_within(TimeOfDay::from_hm(23, 30).unwrap()));
/// assert!(!night.is_within(TimeOfDay::from_hm(12, 0).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScheduleWindow {
    /// Start of the window (inclusive).
    pub start: TimeOfDay,
    /// End of the window (exclusive).
    pub end: TimeOfDay,
}

impl ScheduleWindow {
    /// Creates a window from its two edges.
    #[must_use]
    pub const fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Parses a window from two `HH:MM` or `HH:MM:SS` strings.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTimeOfDay` if either edge does not parse.
    pub fn parse(start: &str, end: &str) -> Result<Self, crate::error::ValueError> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    /// End of the window in minutes, with `00:00` read as end of day when
    /// the window starts after midnight.
    fn effective_end(&self) -> u16 {
        let (start, end) = (self.start.minutes(), self.end.minutes());
        if end == 0 && start > 0 {
            MINUTES_PER_DAY
        } else {
            end
        }
    }

    /// Returns `true` if the window spans 00:00.
    #[must_use]
    pub fn crosses_midnight(&self) -> bool {
        self.start.minutes() > self.effective_end()
    }

    /// Returns `true` if start and end coincide. Such a window is never open.
    #[must_use]
    pub fn is_zero_width(&self) -> bool {
        self.start.minutes() == self.effective_end()
    }

    /// Returns `true` if power should be on at `now`.
    #[must_use]
    pub fn is_within(&self, now: TimeOfDay) -> bool {
        is_within(self, now.minutes())
    }

    /// Human-readable time range, e.g. `"22:00 - 06:00 (crosses midnight)"`.
    #[must_use]
    pub fn range_label(&self) -> String {
        if self.crosses_midnight() {
            format!("{} - {} (crosses midnight)", self.start, self.end)
        } else {
            format!("{} - {}", self.start, self.end)
        }
    }
}

impl fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.range_label())
    }
}

/// Decides whether `now_minutes` (minutes since midnight) falls inside `window`.
///
/// - `start < end`: open on `[start, end)`.
/// - `start == end`: never open.
/// - `start > end`: open from `start` to midnight and from midnight to `end`.
///
/// An `end` of 00:00 with a `start` after midnight is read as 24:00 before
/// picking a branch, so `08:00 - 00:00` is open from 08:00 to the end of the day.
#[must_use]
pub fn is_within(window: &ScheduleWindow, now_minutes: u16) -> bool {
    let start = window.start.minutes();
    let end = window.effective_end();

    if start < end {
        now_minutes >= start && now_minutes < end
    } else if start > end {
        now_minutes >= start || now_minutes < end
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u16, end: u16) -> ScheduleWindow {
        ScheduleWindow::new(
            TimeOfDay::from_minutes(start).unwrap(),
            TimeOfDay::from_minutes(end).unwrap(),
        )
    }

    #[test]
    fn daytime_window_is_half_open() {
        let w = window(480, 1080);
        for now in 0..MINUTES_PER_DAY {
            assert_eq!(is_within(&w, now), (480..1080).contains(&now), "now={now}");
        }
    }

    #[test]
    fn crossing_window_wraps_midnight() {
        let w = window(1320, 360);
        for now in 0..MINUTES_PER_DAY {
            assert_eq!(is_within(&w, now), now >= 1320 || now < 360, "now={now}");
        }
        assert!(is_within(&w, 0));
        assert!(is_within(&w, 1439));
        assert!(!is_within(&w, 360));
    }

    #[test]
    fn end_at_midnight_means_end_of_day() {
        let normalized = window(480, 0);
        for now in 0..MINUTES_PER_DAY {
            assert_eq!(is_within(&normalized, now), now >= 480, "now={now}");
        }
        assert!(!normalized.crosses_midnight());
    }

    #[test]
    fn zero_width_window_is_always_off() {
        let w = window(600, 600);
        assert!(w.is_zero_width());
        assert!((0..MINUTES_PER_DAY).all(|now| !is_within(&w, now)));
    }

    #[test]
    fn midnight_to_midnight_is_always_off() {
        let w = window(0, 0);
        assert!(w.is_zero_width());
        assert!((0..MINUTES_PER_DAY).all(|now| !is_within(&w, now)));
    }

    #[test]
    fn start_at_midnight_is_regular_window() {
        let w = window(0, 360);
        assert!(is_within(&w, 0));
        assert!(is_within(&w, 359));
        assert!(!is_within(&w, 360));
    }

    #[test]
    fn range_label_marks_crossing() {
        assert_eq!(window(480, 1080).range_label(), "08:00 - 18:00");
        assert_eq!(
            window(1320, 360).range_label(),
            "22:00 - 06:00 (crosses midnight)"
        );
        assert_eq!(window(480, 0).range_label(), "08:00 - 00:00");
    }

    #[test]
    fn parse_accepts_backend_format() {
        let w = ScheduleWindow::parse("08:00:00", "18:00:00").unwrap();
        assert_eq!(w, window(480, 1080));
        assert!(ScheduleWindow::parse("08:00", "late").is_err());
    }

    #[test]
    fn serde_round_trip_with_backend_strings() {
        let w: ScheduleWindow =
            serde_json::from_str(r#"{"start":"22:00:00","end":"06:00:00"}"#).unwrap();
        assert_eq!(w, window(1320, 360));
        assert_eq!(
            serde_json::to_value(w).unwrap(),
            serde_json::json!({"start": "22:00:00", "end": "06:00:00"})
        );
    }
}
