// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Meter state tracking.
//!
//! [`MeterState`] holds what the grid shows for one meter. The
//! [`MeterRegistry`] owns every tracked meter and serializes power changes
//! through [`PowerIntent`]s, so a late commit result never overrides a newer
//! request for the same meter.

mod meter_state;
mod registry;

pub use meter_state::{DisplayField, DisplayFields, MeterMetrics, MeterState};
pub use registry::{IntentOutcome, MeterRegistry, MeterStatistics, PowerIntent};
