// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `PowerSched` Lib - power-schedule control for metering dashboards.
//!
//! This library drives a dashboard that manages a fleet of metered power
//! outlets under a daily supply schedule. It talks to the meter registry
//! over HTTP and keeps local state consistent with the server while the
//! user edits it.
//!
//! # Supported Features
//!
//! - **Schedule evaluation**: daily supply windows, including windows that
//!   wrap past midnight
//! - **Edit protection**: inbound updates never overwrite a field the user
//!   is typing into
//! - **Reconciliation**: server schedules are merged into the form unless
//!   the user has unsaved edits
//! - **Optimistic power control**: meters switch locally at once, commit
//!   concurrently, and roll back individually on failure
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use powersched_lib::dashboard::Dashboard;
//! use powersched_lib::form::FormFieldAccessor;
//! use powersched_lib::protocol::HttpBackend;
//!
//! # async fn run(form: Arc<dyn FormFieldAccessor>) -> powersched_lib::Result<()> {
//! let backend = Arc::new(HttpBackend::new("192.168.1.20:5000")?);
//! let dashboard = Dashboard::builder(Arc::clone(&backend), backend, form).build();
//!
//! // Meters and schedule in parallel
//! let initial = dashboard.load_initial().await?;
//! println!("{} meters, schedule {:?}", initial.meters, initial.reconciliation.decision);
//!
//! // Status tick and periodic reload
//! dashboard.start();
//!
//! // Save whatever the user typed and apply it to every meter
//! let report = dashboard.save_schedule().await?;
//! println!("switched {} meters", report.switched.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Evaluating a Schedule
//!
//! ```
//! use powersched_lib::schedule::{PowerSchedule, ScheduleStatus};
//! use powersched_lib::types::TimeOfDay;
//!
//! let schedule: PowerSchedule = serde_json::from_str(
//!     r#"{
//!         "open_power": {"start": "18:00:00", "end": "06:00:00"},
//!         "close_power": {"start": "06:00:00", "end": "18:00:00"}
//!     }"#,
//! ).unwrap();
//!
//! // Overnight window
//! let display = schedule.display(TimeOfDay::from_hm(2, 0).unwrap());
//! assert_eq!(display.status, ScheduleStatus::Supplying);
//! assert_eq!(display.time_range, "18:00 - 06:00 (crosses midnight)");
//! ```

pub mod dashboard;
pub mod edit;
pub mod error;
pub mod event;
pub mod form;
pub mod notify;
pub mod propagate;
pub mod protocol;
pub mod reconcile;
pub mod schedule;
pub mod state;
pub mod types;

pub use dashboard::{Dashboard, DashboardBuilder, DashboardConfig, InitialLoad};
pub use edit::{EditKey, EditProtectionTracker};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{DashboardEvent, EventBus, ScheduleEvent};
pub use form::{FormField, FormFieldAccessor, FormSnapshot, ReadySignal};
pub use notify::{Notification, NotificationLevel, NotificationSink, TracingSink};
pub use propagate::{MeterPowerPropagator, OptimisticCommand, PropagationReport};
#[cfg(feature = "http")]
pub use protocol::{HttpBackend, HttpConfig};
pub use protocol::{MeterInfo, RemoteMeterService, RemoteScheduleService};
pub use reconcile::{Decision, Reconciliation, ScheduleReconciler};
pub use schedule::{PowerSchedule, ScheduleDisplay, ScheduleStatus, ScheduleWindow};
pub use state::{IntentOutcome, MeterRegistry, MeterState};
pub use types::{MeterId, PowerState, TimeOfDay};
