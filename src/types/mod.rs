// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the library.
//!
//! # Types
//!
//! - [`TimeOfDay`] - Minute of the day (00:00-23:59)
//! - [`MeterId`] - Backend identifier of a meter
//! - [`PowerState`] - On/Off state of a meter's supply

mod meter_id;
mod power;
mod time;

pub use meter_id::MeterId;
pub use power::PowerState;
pub use time::{MINUTES_PER_DAY, TimeOfDay};
