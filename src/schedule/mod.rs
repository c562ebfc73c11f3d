// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power schedule model and evaluation.
//!
//! A [`PowerSchedule`] holds two daily [`ScheduleWindow`]s. Whether meters
//! should currently be powered is decided by [`is_within`] on the
//! `open_power` window, which handles windows crossing midnight, an end of
//! 00:00 meaning end of day, and zero-width windows.
//!
//! # Examples
//!
//! ```
//! use powersched_lib::schedule::{ScheduleWindow, is_within};
//!
//! let evening = ScheduleWindow::parse("18:00", "00:00").unwrap();
//! assert!(is_within(&evening, 23 * 60 + 59));
//! assert!(!is_within(&evening, 0));
//! ```

mod power_schedule;
mod status;
mod window;

pub use power_schedule::PowerSchedule;
pub use status::{ScheduleDisplay, ScheduleStatus};
pub use window::{ScheduleWindow, is_within};
