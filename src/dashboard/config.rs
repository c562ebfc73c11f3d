// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard timing configuration.

use std::time::Duration;

use crate::error::{Result, ValueError};
use crate::reconcile::ReconcilerConfig;

/// Timer settings for a [`Dashboard`](super::Dashboard).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use powersched_lib::dashboard::DashboardConfig;
///
/// let config = DashboardConfig::new()
///     .with_display_interval(Duration::from_secs(10))
///     .with_refresh_watchdog(Duration::from_secs(3));
/// assert_eq!(config.reload_interval(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConfig {
    display_interval: Duration,
    reload_interval: Duration,
    poll_interval: Duration,
    consistency_delay: Duration,
    refresh_watchdog: Duration,
    push_refresh_delay: Duration,
    edit_grace: Duration,
    reconciler: ReconcilerConfig,
}

impl DashboardConfig {
    /// Default interval between status recomputations.
    pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_secs(30);
    /// Default interval between full configuration reloads.
    pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(60);
    /// Default interval between meter polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
    /// Shortest accepted meter poll interval.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);
    /// Longest accepted meter poll interval.
    pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
    /// Default delay before the post-fan-out consistency pass.
    pub const DEFAULT_CONSISTENCY_DELAY: Duration = Duration::from_secs(2);
    /// Default time after which a refresh forces the busy indicator off.
    pub const DEFAULT_REFRESH_WATCHDOG: Duration = Duration::from_secs(5);
    /// Default delay between a schedule push and the meter refresh it triggers.
    pub const DEFAULT_PUSH_REFRESH_DELAY: Duration = Duration::from_millis(500);
    /// Default edit-protection grace period.
    pub const DEFAULT_EDIT_GRACE: Duration = Duration::from_millis(3000);

    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            display_interval: Self::DEFAULT_DISPLAY_INTERVAL,
            reload_interval: Self::DEFAULT_RELOAD_INTERVAL,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            consistency_delay: Self::DEFAULT_CONSISTENCY_DELAY,
            refresh_watchdog: Self::DEFAULT_REFRESH_WATCHDOG,
            push_refresh_delay: Self::DEFAULT_PUSH_REFRESH_DELAY,
            edit_grace: Self::DEFAULT_EDIT_GRACE,
            reconciler: ReconcilerConfig::new(),
        }
    }

    /// Sets the status recomputation interval.
    #[must_use]
    pub fn with_display_interval(mut self, interval: Duration) -> Self {
        self.display_interval = interval;
        self
    }

    /// Sets the configuration reload interval.
    #[must_use]
    pub fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = interval;
        self
    }

    /// Sets the initial meter poll interval.
    ///
    /// The value is not range checked here; [`Self::validate_poll_interval`]
    /// applies when it changes at runtime.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the consistency pass delay.
    #[must_use]
    pub fn with_consistency_delay(mut self, delay: Duration) -> Self {
        self.consistency_delay = delay;
        self
    }

    /// Sets the refresh watchdog.
    #[must_use]
    pub fn with_refresh_watchdog(mut self, watchdog: Duration) -> Self {
        self.refresh_watchdog = watchdog;
        self
    }

    /// Sets the delay before refreshing meters after a schedule push.
    #[must_use]
    pub fn with_push_refresh_delay(mut self, delay: Duration) -> Self {
        self.push_refresh_delay = delay;
        self
    }

    /// Sets the edit-protection grace period.
    #[must_use]
    pub fn with_edit_grace(mut self, grace: Duration) -> Self {
        self.edit_grace = grace;
        self
    }

    /// Sets the form retry policy.
    #[must_use]
    pub fn with_reconciler(mut self, reconciler: ReconcilerConfig) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Returns the status recomputation interval.
    #[must_use]
    pub fn display_interval(&self) -> Duration {
        self.display_interval
    }

    /// Returns the configuration reload interval.
    #[must_use]
    pub fn reload_interval(&self) -> Duration {
        self.reload_interval
    }

    /// Returns the initial meter poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the consistency pass delay.
    #[must_use]
    pub fn consistency_delay(&self) -> Duration {
        self.consistency_delay
    }

    /// Returns the refresh watchdog.
    #[must_use]
    pub fn refresh_watchdog(&self) -> Duration {
        self.refresh_watchdog
    }

    /// Returns the delay before refreshing meters after a schedule push.
    #[must_use]
    pub fn push_refresh_delay(&self) -> Duration {
        self.push_refresh_delay
    }

    /// Returns the edit-protection grace period.
    #[must_use]
    pub fn edit_grace(&self) -> Duration {
        self.edit_grace
    }

    /// Returns the form retry policy.
    #[must_use]
    pub fn reconciler(&self) -> ReconcilerConfig {
        self.reconciler
    }

    /// Checks that a meter poll interval lies within 5 to 180 seconds.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` for an interval outside the bounds.
    pub fn validate_poll_interval(interval: Duration) -> Result<Duration> {
        if (Self::MIN_POLL_INTERVAL..=Self::MAX_POLL_INTERVAL).contains(&interval) {
            return Ok(interval);
        }
        Err(ValueError::OutOfRange {
            min: 5,
            max: 180,
            actual: u16::try_from(interval.as_secs()).unwrap_or(u16::MAX),
        }
        .into())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::new()
    }
}
