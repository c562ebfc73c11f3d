// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-of-day type for daily power schedules.
//!
//! The backend exchanges schedule edges as `"HH:MM:SS"` strings while time
//! inputs on the dashboard work with `"HH:MM"`. [`TimeOfDay`] stores the
//! minute of the day and converts between both representations. Seconds are
//! accepted on input and discarded.
//!
//! # Examples
//!
//! ```
//! use powersched_lib::types::TimeOfDay;
//!
//! let t: TimeOfDay = "08:30:00".parse().unwrap();
//! assert_eq!(t.minutes(), 510);
//! assert_eq!(t.to_hhmm(), "08:30");
//! assert_eq!(t.to_hhmmss(), "08:30:00");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::Timelike;

use crate::error::ValueError;

/// Number of minutes in a day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// A time of day with minute precision, stored as minutes since midnight.
///
/// Valid range: 0 (00:00) to 1439 (23:59).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Midnight (00:00).
    pub const MIDNIGHT: Self = Self(0);

    /// Last minute of the day (23:59).
    pub const LAST_MINUTE: Self = Self(MINUTES_PER_DAY - 1);

    /// Creates a time of day from minutes since midnight.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `minutes` is 1440 or more.
    pub fn from_minutes(minutes: u16) -> Result<Self, ValueError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: MINUTES_PER_DAY - 1,
                actual: minutes,
            });
        }
        Ok(Self(minutes))
    }

    /// Creates a time of day from hours and minutes.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTimeOfDay` if either component is out of range.
    pub fn from_hm(hours: u8, minutes: u8) -> Result<Self, ValueError> {
        if hours > 23 || minutes > 59 {
            return Err(ValueError::InvalidTimeOfDay(format!(
                "{hours:02}:{minutes:02}"
            )));
        }
        Ok(Self(u16::from(hours) * 60 + u16::from(minutes)))
    }

    /// Converts any chrono time value, dropping seconds.
    #[must_use]
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        // hour() < 24 and minute() < 60, so the sum is below 1440
        #[allow(clippy::cast_possible_truncation)]
        let minutes = (time.hour() * 60 + time.minute()) as u16;
        Self(minutes)
    }

    /// Returns the current local wall-clock time of day.
    #[must_use]
    pub fn now_local() -> Self {
        Self::from_time(&chrono::Local::now())
    }

    /// Returns minutes since midnight.
    #[must_use]
    pub const fn minutes(&self) -> u16 {
        self.0
    }

    /// Returns the hour component (0-23).
    #[must_use]
    pub const fn hour(&self) -> u16 {
        self.0 / 60
    }

    /// Returns the minute component (0-59).
    #[must_use]
    pub const fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// Formats as `HH:MM`, the representation used by time inputs.
    #[must_use]
    pub fn to_hhmm(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }

    /// Formats as `HH:MM:SS`, the representation stored by the backend.
    #[must_use]
    pub fn to_hhmmss(&self) -> String {
        format!("{:02}:{:02}:00", self.hour(), self.minute())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ValueError;

    /// Parses `H:M`, `HH:MM` or `HH:MM:SS`. Components may be unpadded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidTimeOfDay(s.to_string());
        let mut parts = s.trim().split(':');

        let hours = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(invalid)?;
        let minutes = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(invalid)?;

        match parts.next() {
            None => {}
            Some(secs) if secs.parse::<u8>().is_ok_and(|v| v < 60) => {}
            Some(_) => return Err(invalid()),
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Self::from_hm(hours, minutes).map_err(|_| invalid())
    }
}

impl serde::Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hhmmss())
    }
}

impl<'de> serde::Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
