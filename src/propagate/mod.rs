// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan-out of schedule decisions to meter relays.
//!
//! [`MeterPowerPropagator`] evaluates a schedule once and switches every
//! meter whose local state differs. Each switch is an [`OptimisticCommand`]:
//! the local state changes immediately, the remote commit runs concurrently
//! with all others, and a failed commit rolls back only its own meter.
//!
//! After the fan-out a deferred consistency pass re-reads every meter from
//! the registry to correct residual drift.

mod optimistic;

pub use optimistic::{OptimisticCommand, SettledCommand};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{JoinHandle, JoinSet};

use crate::edit::EditProtectionTracker;
use crate::error::{Error, Result};
use crate::event::{DashboardEvent, EventBus};
use crate::notify::{Notification, NotificationSink};
use crate::protocol::{MeterInfo, RemoteMeterService};
use crate::schedule::PowerSchedule;
use crate::state::{IntentOutcome, MeterRegistry};
use crate::types::{MeterId, PowerState, TimeOfDay};

/// Per-meter results of one schedule fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Power state the schedule asked for.
    pub desired_on: bool,
    /// Meters switched and confirmed.
    pub switched: Vec<MeterId>,
    /// Meters already in the desired state.
    pub unchanged: Vec<MeterId>,
    /// Meters whose commit failed and were rolled back.
    pub failed: Vec<MeterId>,
    /// Meters whose commit was overtaken by a newer command.
    pub superseded: Vec<MeterId>,
    /// Requested meters that are not tracked.
    pub missing: Vec<MeterId>,
}

impl PropagationReport {
    fn new(desired_on: bool) -> Self {
        Self {
            desired_on,
            ..Self::default()
        }
    }

    /// Returns `true` if no commit failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies schedule decisions to every tracked meter.
pub struct MeterPowerPropagator<M> {
    service: Arc<M>,
    registry: MeterRegistry,
    tracker: EditProtectionTracker,
    sink: Arc<dyn NotificationSink>,
    events: EventBus,
    consistency_delay: Duration,
    pending_pass: Mutex<Option<JoinHandle<()>>>,
}

impl<M> std::fmt::Debug for MeterPowerPropagator<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterPowerPropagator")
            .field("meters", &self.registry.len())
            .field("consistency_delay", &self.consistency_delay)
            .finish_non_exhaustive()
    }
}

impl<M> MeterPowerPropagator<M>
where
    M: RemoteMeterService + 'static,
{
    /// Default delay before the consistency pass.
    pub const DEFAULT_CONSISTENCY_DELAY: Duration = Duration::from_secs(2);

    /// Creates a propagator.
    #[must_use]
    pub fn new(
        service: Arc<M>,
        registry: MeterRegistry,
        tracker: EditProtectionTracker,
        sink: Arc<dyn NotificationSink>,
        events: EventBus,
    ) -> Self {
        Self {
            service,
            registry,
            tracker,
            sink,
            events,
            consistency_delay: Self::DEFAULT_CONSISTENCY_DELAY,
            pending_pass: Mutex::new(None),
        }
    }

    /// Sets the delay before the consistency pass.
    #[must_use]
    pub fn with_consistency_delay(mut self, delay: Duration) -> Self {
        self.consistency_delay = delay;
        self
    }

    /// Returns the meter registry.
    #[must_use]
    pub fn registry(&self) -> &MeterRegistry {
        &self.registry
    }

    /// Returns the remote meter service.
    #[must_use]
    pub fn service(&self) -> &Arc<M> {
        &self.service
    }

    /// Switches every listed meter to the state `schedule` asks for at `now`.
    ///
    /// All commits run concurrently. A failure rolls back only the failing
    /// meter and is reported with one error notification for that meter.
    /// A consistency pass is scheduled once the fan-out is issued.
    pub async fn apply_schedule(
        &self,
        schedule: &PowerSchedule,
        meter_ids: impl IntoIterator<Item = MeterId>,
        now: TimeOfDay,
    ) -> PropagationReport {
        let desired = schedule.is_supplying(now);
        let mut report = PropagationReport::new(desired);
        let ids: BTreeSet<MeterId> = meter_ids.into_iter().collect();
        let mut commits = JoinSet::new();

        for id in ids {
            match self.registry.is_powered_on(id) {
                None => {
                    tracing::warn!(%id, "Meter not tracked, skipping");
                    report.missing.push(id);
                }
                Some(current) if current == desired => report.unchanged.push(id),
                Some(_) => {
                    let Ok(command) = OptimisticCommand::begin(&self.registry, id, desired) else {
                        report.missing.push(id);
                        continue;
                    };
                    self.events
                        .publish(DashboardEvent::power_changed(id, desired, true));

                    let service = Arc::clone(&self.service);
                    let registry = self.registry.clone();
                    commits.spawn(async move {
                        command
                            .commit(&registry, service.set_power(id, desired))
                            .await
                    });
                }
            }
        }

        let issued = commits.len();
        tracing::info!(
            desired_on = desired,
            issued,
            unchanged = report.unchanged.len(),
            "Schedule fan-out issued"
        );
        if issued > 0 {
            self.sink.notify(Notification::info(format!(
                "Switching {issued} meter(s) {}",
                PowerState::from(desired)
            )));
        }
        self.schedule_consistency_pass();

        while let Some(joined) = commits.join_next().await {
            let settled = match joined {
                Ok(settled) => settled,
                Err(e) => {
                    tracing::error!(error = %e, "Power commit task failed");
                    continue;
                }
            };
            let id = settled.meter_id;
            match self.settle(settled) {
                Ok(IntentOutcome::Confirmed) => report.switched.push(id),
                Ok(IntentOutcome::Superseded) => report.superseded.push(id),
                Ok(IntentOutcome::RolledBack { .. }) | Err(_) => report.failed.push(id),
            }
        }

        // Commits settle in completion order
        report.switched.sort_unstable();
        report.failed.sort_unstable();
        report.superseded.sort_unstable();
        report
    }

    /// Switches one meter, superseding any unsettled switch of the same meter.
    ///
    /// # Errors
    ///
    /// Returns `Error::MeterNotFound` if the meter is not tracked and
    /// `Error::CommitFailed` if the commit failed and was rolled back.
    pub async fn set_power(&self, meter_id: MeterId, desired: bool) -> Result<IntentOutcome> {
        let command = OptimisticCommand::begin(&self.registry, meter_id, desired)?;
        self.events
            .publish(DashboardEvent::power_changed(meter_id, desired, true));
        let settled = command
            .commit(&self.registry, self.service.set_power(meter_id, desired))
            .await;
        self.settle(settled)
    }

    /// Publishes the outcome and notifies the user of a rollback.
    fn settle(&self, settled: SettledCommand) -> Result<IntentOutcome> {
        let outcome = settled.outcome;
        let meter_id = settled.meter_id;
        let desired = settled.desired;
        let result = settled.into_result();

        match (&outcome, &result) {
            (IntentOutcome::RolledBack { restored }, Err(e)) => {
                self.sink
                    .notify(Notification::error(e.to_string()).for_meter(meter_id));
                let reason = match e {
                    Error::CommitFailed { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                self.events
                    .publish(DashboardEvent::rolled_back(meter_id, *restored, reason));
            }
            (IntentOutcome::Confirmed, _) => {
                self.events
                    .publish(DashboardEvent::power_changed(meter_id, desired, false));
            }
            _ => {}
        }
        result
    }

    /// Schedules a full re-read of all meters after the consistency delay.
    ///
    /// A pass that has not run yet is replaced.
    pub fn schedule_consistency_pass(&self) {
        let service = Arc::clone(&self.service);
        let registry = self.registry.clone();
        let tracker = self.tracker.clone();
        let events = self.events.clone();
        let delay = self.consistency_delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match service.list_meters().await {
                Ok(meters) => {
                    let changed = merge_meters(&registry, &tracker, &events, &meters);
                    tracing::debug!(count = meters.len(), changed, "Consistency pass complete");
                }
                Err(e) => tracing::warn!(error = %e, "Consistency pass failed"),
            }
        });

        if let Some(previous) = self.pending_pass.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Returns `true` if a consistency pass is scheduled and has not finished.
    #[must_use]
    pub fn has_pending_pass(&self) -> bool {
        self.pending_pass
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels a scheduled consistency pass.
    pub fn cancel_pending(&self) {
        if let Some(handle) = self.pending_pass.lock().take() {
            handle.abort();
        }
    }
}

impl<M> Drop for MeterPowerPropagator<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_pass.get_mut().take() {
            handle.abort();
        }
    }
}

/// Merges registry entries and publishes confirmed power changes.
///
/// Returns the number of meters whose power state changed.
pub(crate) fn merge_meters(
    registry: &MeterRegistry,
    tracker: &EditProtectionTracker,
    events: &EventBus,
    meters: &[MeterInfo],
) -> usize {
    meters
        .iter()
        .filter(|info| {
            let changed = registry.merge_remote(info, tracker);
            if changed {
                events.publish(DashboardEvent::power_changed(info.id, info.power_on, false));
            }
            changed
        })
        .count()
}
