// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall-clock source for schedule evaluation.

use parking_lot::Mutex;

use crate::types::TimeOfDay;

/// Source of the current local time of day.
pub trait Clock: Send + Sync {
    /// Returns the current time of day.
    fn now(&self) -> TimeOfDay;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeOfDay {
        TimeOfDay::now_local()
    }
}

/// A clock that reports a settable time.
///
/// # Examples
///
/// ```
/// use powersched_lib::dashboard::{Clock, FixedClock};
/// use powersched_lib::types::TimeOfDay;
///
/// let clock = FixedClock::new(TimeOfDay::from_hm(9, 0).unwrap());
/// clock.set(TimeOfDay::from_hm(19, 30).unwrap());
/// assert_eq!(clock.now().to_string(), "19:30");
/// ```
#[derive(Debug)]
pub struct FixedClock {
    time: Mutex<TimeOfDay>,
}

impl FixedClock {
    /// Creates a clock stopped at `time`.
    #[must_use]
    pub fn new(time: TimeOfDay) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Moves the clock to `time`.
    pub fn set(&self, time: TimeOfDay) {
        *self.time.lock() = time;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> TimeOfDay {
        *self.time.lock()
    }
}
