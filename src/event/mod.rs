// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard events and push payloads.
//!
//! [`EventBus`] broadcasts [`DashboardEvent`]s to any number of subscribers.
//! [`ScheduleEvent`] is the payload the backend pushes when the schedule
//! changes server-side.
//!
//! # Examples
//!
//! ```
//! use powersched_lib::event::{DashboardEvent, EventBus};
//! use powersched_lib::types::MeterId;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DashboardEvent::power_changed(MeterId::new(1), false, true));
//! ```

mod dashboard_event;
mod event_bus;
mod schedule_event;

pub use dashboard_event::DashboardEvent;
pub use event_bus::EventBus;
pub use schedule_event::ScheduleEvent;
