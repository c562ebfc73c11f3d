// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access to the schedule editor form owned by the host UI.
//!
//! The host implements [`FormFieldAccessor`] for its four time inputs and
//! fulfils a [`ReadySignal`] once they are mounted. The library never looks
//! up UI elements itself.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

use crate::edit::EditKey;
use crate::error::{Error, Result};
use crate::schedule::{PowerSchedule, ScheduleWindow};
use crate::types::TimeOfDay;

/// Entity name used for schedule fields in [`EditKey`]s.
pub const SCHEDULE_ENTITY: &str = "schedule";

/// One of the four editable schedule time fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    /// Start of the open-power window.
    OpenStart,
    /// End of the open-power window.
    OpenEnd,
    /// Start of the close-power window.
    CloseStart,
    /// End of the close-power window.
    CloseEnd,
}

impl FormField {
    /// All fields, in form order.
    pub const ALL: [Self; 4] = [Self::OpenStart, Self::OpenEnd, Self::CloseStart, Self::CloseEnd];

    /// Returns the stable key the host uses for this input.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::OpenStart => "openStartTime",
            Self::OpenEnd => "openEndTime",
            Self::CloseStart => "closeStartTime",
            Self::CloseEnd => "closeEndTime",
        }
    }

    /// Returns the edit-protection key for this field.
    #[must_use]
    pub fn edit_key(&self) -> EditKey {
        EditKey::new(SCHEDULE_ENTITY, self.key())
    }

    /// Returns the edge of `schedule` this field edits.
    #[must_use]
    pub fn value_in(&self, schedule: &PowerSchedule) -> TimeOfDay {
        match self {
            Self::OpenStart => schedule.open_power.start,
            Self::OpenEnd => schedule.open_power.end,
            Self::CloseStart => schedule.close_power.start,
            Self::CloseEnd => schedule.close_power.end,
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Read/write access to the schedule form.
///
/// All methods are called from within a single reconciliation pass and must
/// not block.
pub trait FormFieldAccessor: Send + Sync {
    /// Reads the raw value of a field, or `None` if the input is not mounted.
    fn read(&self, field: FormField) -> Option<String>;

    /// Writes an `HH:MM` value into a field.
    fn write(&self, field: FormField, value: &str);

    /// Returns `true` if the field currently has input focus.
    fn has_focus(&self, field: FormField) -> bool;

    /// Shows or hides the persistent "unsaved changes" cue.
    fn set_unsaved_warning(&self, visible: bool);
}

/// Normalizes a time input value to `HH:MM`.
///
/// Values that do not parse as a time of day are returned trimmed, so they
/// still compare unequal to any server value.
#[must_use]
pub fn normalize_hhmm(raw: &str) -> String {
    raw.parse::<TimeOfDay>()
        .map_or_else(|_| raw.trim().to_string(), |t| t.to_hhmm())
}

/// The four form values, normalized to `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    values: [String; 4],
}

impl FormSnapshot {
    /// Builds a snapshot from raw values in [`FormField::ALL`] order.
    #[must_use]
    pub fn new(values: [&str; 4]) -> Self {
        Self {
            values: values.map(normalize_hhmm),
        }
    }

    /// Returns what the form would show for `schedule`.
    #[must_use]
    pub fn from_schedule(schedule: &PowerSchedule) -> Self {
        Self {
            values: FormField::ALL.map(|field| field.value_in(schedule).to_hhmm()),
        }
    }

    /// Reads all four fields from the host.
    ///
    /// # Errors
    ///
    /// Returns the fields that are not mounted.
    pub fn read_from(form: &dyn FormFieldAccessor) -> std::result::Result<Self, Vec<FormField>> {
        let raw = FormField::ALL.map(|field| form.read(field));
        let missing: Vec<FormField> = FormField::ALL
            .iter()
            .zip(&raw)
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(Self {
            values: raw.map(|value| normalize_hhmm(value.as_deref().unwrap_or_default())),
        })
    }

    /// Returns the value of `field`.
    #[must_use]
    pub fn get(&self, field: FormField) -> &str {
        &self.values[field as usize]
    }

    /// Returns the fields whose values differ from `other`.
    #[must_use]
    pub fn diverging_fields(&self, other: &Self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| self.get(*field) != other.get(*field))
            .collect()
    }

    /// Converts the snapshot into a schedule.
    ///
    /// # Errors
    ///
    /// Returns `Error::IncompleteForm` for the first empty field and
    /// `Error::Value` for a value that is not a time of day.
    pub fn to_schedule(&self) -> Result<PowerSchedule> {
        let mut times = [TimeOfDay::MIDNIGHT; 4];
        for (slot, field) in times.iter_mut().zip(FormField::ALL) {
            let value = self.get(field);
            if value.is_empty() {
                return Err(Error::IncompleteForm(field));
            }
            *slot = value.parse()?;
        }
        let [open_start, open_end, close_start, close_end] = times;
        Ok(PowerSchedule::new(
            ScheduleWindow::new(open_start, open_end),
            ScheduleWindow::new(close_start, close_end),
        ))
    }
}

/// Signal fulfilled by the host once the schedule form is mounted.
///
/// Clones share the same signal.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    /// Creates an unfulfilled signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Creates a signal that is already fulfilled.
    #[must_use]
    pub fn ready() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx }
    }

    /// Marks the form as mounted.
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    /// Marks the form as unmounted.
    pub fn mark_unmounted(&self) {
        self.tx.send_replace(false);
    }

    /// Returns `true` if the form is mounted.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the form is mounted or `timeout` elapses.
    ///
    /// Returns whether the form is mounted.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|ready| *ready))
            .await
            .is_ok_and(|result| result.is_ok())
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}
