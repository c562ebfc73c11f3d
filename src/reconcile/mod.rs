// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation of server schedules with the schedule editor form.
//!
//! [`ScheduleReconciler`] owns the last server-confirmed [`PowerSchedule`]
//! and decides whether an incoming schedule may be written into the form.
//! Local edits always win: when the form holds values the user changed, the
//! incoming schedule is stored but the form is left untouched and the
//! unsaved-changes cue is shown.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use powersched_lib::edit::EditProtectionTracker;
//! use powersched_lib::form::{FormFieldAccessor, ReadySignal};
//! use powersched_lib::reconcile::{Decision, ReconcilerConfig, ScheduleReconciler};
//! use powersched_lib::schedule::{PowerSchedule, ScheduleWindow};
//! use powersched_lib::types::TimeOfDay;
//!
//! # async fn example(form: Arc<dyn FormFieldAccessor>) -> powersched_lib::Result<()> {
//! let reconciler = ScheduleReconciler::new(
//!     form,
//!     EditProtectionTracker::new(),
//!     ReadySignal::ready(),
//!     ReconcilerConfig::default(),
//! );
//!
//! let schedule = PowerSchedule::new(
//!     ScheduleWindow::parse("08:00:00", "18:00:00")?,
//!     ScheduleWindow::parse("18:00:00", "08:00:00")?,
//! );
//! let result = reconciler.apply_incoming(schedule, TimeOfDay::from_hm(9, 0)?).await;
//! if result.decision == Decision::Deferred {
//!     println!("form has unsaved changes");
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::edit::EditProtectionTracker;
use crate::form::{FormField, FormFieldAccessor, FormSnapshot, ReadySignal};
use crate::protocol::RemoteScheduleService;
use crate::schedule::{PowerSchedule, ScheduleDisplay};
use crate::types::TimeOfDay;

/// Retry policy for reaching the schedule form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    max_attempts: u32,
    retry_delay: Duration,
}

impl ReconcilerConfig {
    /// Default number of attempts to read the form.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    /// Default delay between attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
        }
    }

    /// Sets the number of attempts. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Returns the number of attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Decision {
    /// The form now shows the incoming schedule.
    Applied,
    /// The form holds unsaved edits and was left untouched.
    Deferred,
    /// The form fields never became available; the pass was aborted.
    ElementsUnavailable,
    /// The schedule could not be fetched; the previous schedule is kept.
    LoadFailed(String),
}

impl Decision {
    /// Returns `true` for [`Decision::Applied`].
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Decision plus the status to display afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// What happened to the form.
    pub decision: Decision,
    /// Status derived from the current schedule, if one is known and the
    /// pass was not aborted.
    pub display: Option<ScheduleDisplay>,
}

/// Holds the last server-confirmed schedule and guards the form against
/// overwrites.
pub struct ScheduleReconciler {
    form: Arc<dyn FormFieldAccessor>,
    tracker: EditProtectionTracker,
    ready: ReadySignal,
    config: ReconcilerConfig,
    current: RwLock<Option<PowerSchedule>>,
}

impl std::fmt::Debug for ScheduleReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleReconciler")
            .field("config", &self.config)
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

impl ScheduleReconciler {
    /// Creates a reconciler with no known schedule.
    #[must_use]
    pub fn new(
        form: Arc<dyn FormFieldAccessor>,
        tracker: EditProtectionTracker,
        ready: ReadySignal,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            form,
            tracker,
            ready,
            config,
            current: RwLock::new(None),
        }
    }

    /// Returns the last server-confirmed schedule.
    #[must_use]
    pub fn current(&self) -> Option<PowerSchedule> {
        *self.current.read()
    }

    /// Returns the status for the current schedule at `now`.
    #[must_use]
    pub fn display(&self, now: TimeOfDay) -> Option<ScheduleDisplay> {
        self.current().map(|schedule| schedule.display(now))
    }

    /// Returns the form accessor.
    #[must_use]
    pub fn form(&self) -> &Arc<dyn FormFieldAccessor> {
        &self.form
    }

    /// Records a schedule the user just saved and clears the unsaved cue.
    pub fn mark_saved(&self, schedule: PowerSchedule) {
        *self.current.write() = Some(schedule);
        self.form.set_unsaved_warning(false);
        tracing::info!(window = %schedule.open_power, "Schedule saved");
    }

    /// Reconciles an incoming schedule with the form.
    ///
    /// The schedule always becomes the current schedule. The form is only
    /// written when it holds no unsaved edits, and protected or focused
    /// fields are skipped even then.
    pub async fn apply_incoming(&self, schedule: PowerSchedule, now: TimeOfDay) -> Reconciliation {
        let Some(form_values) = self.read_form().await else {
            tracing::error!(
                attempts = self.config.max_attempts,
                "Schedule form fields unavailable"
            );
            *self.current.write() = Some(schedule);
            return Reconciliation {
                decision: Decision::ElementsUnavailable,
                display: None,
            };
        };

        let previous = self.current.write().replace(schedule);
        let incoming = FormSnapshot::from_schedule(&schedule);
        let confirmed = previous.as_ref().map(FormSnapshot::from_schedule);
        let edited = edited_fields(&form_values, &incoming, confirmed.as_ref());

        let decision = if edited.is_empty() {
            for field in FormField::ALL {
                if self.tracker.is_protected(&field.edit_key()) || self.form.has_focus(field) {
                    tracing::debug!(%field, "Skipping protected schedule field");
                    continue;
                }
                self.form.write(field, incoming.get(field));
            }
            self.form.set_unsaved_warning(false);
            tracing::info!(window = %schedule.open_power, "Schedule applied");
            Decision::Applied
        } else {
            tracing::warn!(fields = ?edited, "Unsaved schedule edits, deferring server update");
            self.form.set_unsaved_warning(true);
            Decision::Deferred
        };

        Reconciliation {
            decision,
            display: Some(schedule.display(now)),
        }
    }

    /// Fetches the schedule and reconciles it.
    ///
    /// A failed fetch yields [`Decision::LoadFailed`] and keeps the current
    /// schedule on display.
    pub async fn load_and_apply<S>(&self, service: &S, now: TimeOfDay) -> Reconciliation
    where
        S: RemoteScheduleService + ?Sized,
    {
        match service.fetch_schedule().await {
            Ok(schedule) => self.apply_incoming(schedule, now).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load schedule");
                Reconciliation {
                    decision: Decision::LoadFailed(e.to_string()),
                    display: self.display(now),
                }
            }
        }
    }

    /// Reads the form, waiting for it to be mounted between attempts.
    async fn read_form(&self) -> Option<FormSnapshot> {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            match FormSnapshot::read_from(self.form.as_ref()) {
                Ok(snapshot) => return Some(snapshot),
                Err(missing) => {
                    tracing::debug!(attempt, ?missing, "Schedule form fields not mounted");
                }
            }
            if attempt < attempts {
                if self.ready.is_ready() {
                    tokio::time::sleep(self.config.retry_delay).await;
                } else {
                    self.ready.wait(self.config.retry_delay).await;
                }
            }
        }
        None
    }
}

/// Returns the fields holding values the user typed.
///
/// A field counts as edited when it is non-empty and matches neither the
/// incoming value nor the last confirmed value.
fn edited_fields(
    form: &FormSnapshot,
    incoming: &FormSnapshot,
    confirmed: Option<&FormSnapshot>,
) -> Vec<FormField> {
    FormField::ALL
        .into_iter()
        .filter(|field| {
            let value = form.get(*field);
            !value.is_empty()
                && value != incoming.get(*field)
                && confirmed.is_none_or(|c| value != c.get(*field))
        })
        .collect()
}
