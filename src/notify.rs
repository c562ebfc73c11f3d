// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-facing notifications and the busy indicator.

use std::fmt;

use crate::types::MeterId;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Informational.
    Info,
    /// An operation succeeded.
    Success,
    /// Something needs the user's attention.
    Warning,
    /// An operation failed.
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Message text.
    pub message: String,
    /// Meter the message is about, if any.
    pub meter_id: Option<MeterId>,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            meter_id: None,
        }
    }

    /// Creates an info notification.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    /// Creates a success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    /// Creates a warning notification.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    /// Creates an error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    /// Attaches the meter this notification refers to.
    #[must_use]
    pub fn for_meter(mut self, meter_id: MeterId) -> Self {
        self.meter_id = Some(meter_id);
        self
    }
}

/// Toast surface and busy indicator implemented by the host UI.
pub trait NotificationSink: Send + Sync {
    /// Shows a notification.
    fn notify(&self, notification: Notification);

    /// Shows or hides the busy indicator.
    fn set_busy(&self, _busy: bool) {}
}

/// Sink that routes notifications to `tracing`, for headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        let meter = notification.meter_id.map(|id| id.value());
        match notification.level {
            NotificationLevel::Error => {
                tracing::error!(meter = ?meter, "{}", notification.message);
            }
            NotificationLevel::Warning => {
                tracing::warn!(meter = ?meter, "{}", notification.message);
            }
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(meter = ?meter, level = %notification.level, "{}", notification.message);
            }
        }
    }

    fn set_busy(&self, busy: bool) {
        tracing::debug!(busy, "Busy indicator");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_level() {
        assert_eq!(Notification::info("a").level, NotificationLevel::Info);
        assert_eq!(Notification::success("a").level, NotificationLevel::Success);
        assert_eq!(Notification::warning("a").level, NotificationLevel::Warning);
        assert_eq!(Notification::error("a").level, NotificationLevel::Error);
    }

    #[test]
    fn for_meter_attaches_id() {
        let n = Notification::error("failed").for_meter(MeterId::new(2));
        assert_eq!(n.meter_id, Some(MeterId::new(2)));
    }

    #[test]
    fn tracing_sink_accepts_all_levels() {
        let sink = TracingSink;
        sink.notify(Notification::info("info"));
        sink.notify(Notification::error("error").for_meter(MeterId::new(1)));
        sink.set_busy(true);
    }
}
