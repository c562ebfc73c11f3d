// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard orchestration.
//!
//! [`Dashboard`] wires the reconciler, the propagator and the remote
//! services together and runs the periodic work: a status tick (30 s by
//! default), a meter poll (30 s, adjustable between 5 and 180 s), a full
//! configuration reload (60 s) and the listener for schedule pushes.
//! Background tasks hold only a weak reference, so dropping the last
//! `Arc<Dashboard>` stops them; [`Dashboard::shutdown`] stops them
//! explicitly.

mod builder;
mod clock;
mod config;

pub use builder::DashboardBuilder;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DashboardConfig;

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::edit::EditProtectionTracker;
use crate::error::{Error, Result};
use crate::event::{DashboardEvent, EventBus, ScheduleEvent};
use crate::form::{FormFieldAccessor, FormSnapshot};
use crate::notify::{Notification, NotificationLevel, NotificationSink};
use crate::propagate::{MeterPowerPropagator, PropagationReport, merge_meters};
use crate::protocol::{
    BatchControlReport, RemoteMeterService, RemoteScheduleService, SystemConfig,
};
use crate::reconcile::{Decision, Reconciliation, ScheduleReconciler};
use crate::schedule::{PowerSchedule, ScheduleDisplay};
use crate::state::{IntentOutcome, MeterRegistry, MeterState, MeterStatistics};
use crate::types::{MeterId, PowerState, TimeOfDay};

#[derive(Debug, Default)]
struct BackgroundTasks {
    display: Option<JoinHandle<()>>,
    reload: Option<JoinHandle<()>>,
    poll: Option<JoinHandle<()>>,
    push: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    fn abort_all(&mut self) {
        for handle in [
            self.display.take(),
            self.reload.take(),
            self.poll.take(),
            self.push.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

fn replace_task(slot: &mut Option<JoinHandle<()>>, handle: JoinHandle<()>) {
    if let Some(previous) = slot.replace(handle) {
        previous.abort();
    }
}

/// Result of [`Dashboard::load_initial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialLoad {
    /// Number of meters loaded.
    pub meters: usize,
    /// Outcome of reconciling the loaded schedule.
    pub reconciliation: Reconciliation,
}

/// Schedule editor and meter grid controller.
pub struct Dashboard<S, M> {
    schedules: Arc<S>,
    propagator: MeterPowerPropagator<M>,
    reconciler: ScheduleReconciler,
    tracker: EditProtectionTracker,
    sink: Arc<dyn NotificationSink>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    config: DashboardConfig,
    status: watch::Sender<Option<ScheduleDisplay>>,
    poll_interval: Mutex<Duration>,
    tasks: Mutex<BackgroundTasks>,
}

impl<S, M> std::fmt::Debug for Dashboard<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("reconciler", &self.reconciler)
            .field("propagator", &self.propagator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, M> Dashboard<S, M>
where
    S: RemoteScheduleService + 'static,
    M: RemoteMeterService + 'static,
{
    /// Starts building a dashboard over the given services and form.
    #[must_use]
    pub fn builder(
        schedules: Arc<S>,
        meters: Arc<M>,
        form: Arc<dyn FormFieldAccessor>,
    ) -> DashboardBuilder<S, M> {
        DashboardBuilder::new(schedules, meters, form)
    }

    // ========== Accessors ==========

    /// Returns the tracked meters.
    #[must_use]
    pub fn registry(&self) -> &MeterRegistry {
        self.propagator.registry()
    }

    /// Returns the schedule reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &ScheduleReconciler {
        &self.reconciler
    }

    /// Returns the meter power propagator.
    #[must_use]
    pub fn propagator(&self) -> &MeterPowerPropagator<M> {
        &self.propagator
    }

    /// Returns the edit-protection tracker shared with the host's inputs.
    #[must_use]
    pub fn tracker(&self) -> &EditProtectionTracker {
        &self.tracker
    }

    /// Returns the timing configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Returns the active meter poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        *self.poll_interval.lock()
    }

    /// Returns the last server-confirmed schedule.
    #[must_use]
    pub fn current_schedule(&self) -> Option<PowerSchedule> {
        self.reconciler.current()
    }

    /// Watches the latest supply status.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<Option<ScheduleDisplay>> {
        self.status.subscribe()
    }

    /// Subscribes to dashboard events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Computes meter statistics.
    #[must_use]
    pub fn statistics(&self) -> MeterStatistics {
        self.registry().statistics()
    }

    fn now(&self) -> TimeOfDay {
        self.clock.now()
    }

    // ========== Status ==========

    /// Recomputes the supply status from the current schedule.
    ///
    /// Returns `None` until a schedule is known.
    pub fn tick(&self) -> Option<ScheduleDisplay> {
        self.tracker.purge_expired();
        let display = self.reconciler.display(self.now())?;
        self.publish_status(&display);
        Some(display)
    }

    fn publish_status(&self, display: &ScheduleDisplay) {
        self.status.send_replace(Some(display.clone()));
        self.events
            .publish(DashboardEvent::StatusUpdated(display.clone()));
    }

    fn publish_reconciliation(&self, reconciliation: &Reconciliation) {
        self.events.publish(DashboardEvent::ScheduleReconciled {
            decision: reconciliation.decision.clone(),
        });
        if let Some(display) = &reconciliation.display {
            self.publish_status(display);
        }
    }

    // ========== Schedule ==========

    /// Reconciles a schedule received from the server.
    pub async fn apply_incoming(&self, schedule: PowerSchedule) -> Reconciliation {
        let reconciliation = self.reconciler.apply_incoming(schedule, self.now()).await;
        self.publish_reconciliation(&reconciliation);
        reconciliation
    }

    /// Handles a raw schedule push.
    ///
    /// The schedule is reconciled, the pushed message is shown, and the meter
    /// grid is refreshed after the push refresh delay.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` if the payload is not a schedule event.
    pub async fn handle_push(&self, payload: &str) -> Result<Reconciliation> {
        let event = ScheduleEvent::parse(payload)?;
        tracing::debug!(message = ?event.message, "Schedule push received");

        let reconciliation = self.apply_incoming(event.schedule).await;
        self.sink.notify(Notification::info(
            event
                .message
                .unwrap_or_else(|| "Power schedule updated".to_string()),
        ));

        tokio::time::sleep(self.config.push_refresh_delay()).await;
        if let Err(e) = self.refresh_all().await {
            tracing::debug!(error = %e, "Refresh after schedule push failed");
        }
        Ok(reconciliation)
    }

    /// Reloads the schedule on the user's request.
    pub async fn reload_schedule(&self) -> Reconciliation {
        self.sink
            .notify(Notification::info("Reloading power schedule"));
        let reconciliation = self
            .reconciler
            .load_and_apply(self.schedules.as_ref(), self.now())
            .await;
        if let Decision::LoadFailed(reason) = &reconciliation.decision {
            self.sink.notify(Notification::error(format!(
                "Failed to load power schedule: {reason}"
            )));
        }
        self.publish_reconciliation(&reconciliation);
        reconciliation
    }

    /// Reloads the system configuration and reconciles its schedule.
    ///
    /// A changed update interval in the configuration restarts the meter
    /// poll; an out-of-range one is logged and the current interval kept.
    /// Falls back to the schedule endpoint when the configuration carries no
    /// schedule. Failures keep the current schedule.
    pub async fn reload_config(self: &Arc<Self>) -> Reconciliation {
        let loaded = match self.schedules.fetch_config().await {
            Ok(SystemConfig {
                power_schedule,
                update_interval,
            }) => {
                if let Some(update) = update_interval {
                    self.apply_update_interval(Duration::from_secs(update.current));
                }
                match power_schedule {
                    Some(schedule) => Ok(schedule),
                    None => {
                        tracing::debug!("System config has no schedule, fetching it directly");
                        self.schedules.fetch_schedule().await
                    }
                }
            }
            Err(e) => Err(e),
        };

        let reconciliation = match loaded {
            Ok(schedule) => self.reconciler.apply_incoming(schedule, self.now()).await,
            Err(e) => {
                tracing::warn!(error = %e, "Config reload failed");
                Reconciliation {
                    decision: Decision::LoadFailed(e.to_string()),
                    display: self.reconciler.display(self.now()),
                }
            }
        };
        self.publish_reconciliation(&reconciliation);
        reconciliation
    }

    /// Saves the schedule in the form and applies it to every meter.
    ///
    /// # Errors
    ///
    /// Returns `Error::ElementsUnavailable` if the form is not mounted,
    /// `Error::IncompleteForm` or `Error::Value` for an invalid form, and the
    /// remote error if the save failed. Nothing is sent for an invalid form
    /// and a failed save keeps the previous schedule.
    pub async fn save_schedule(&self) -> Result<PropagationReport> {
        let snapshot = FormSnapshot::read_from(self.reconciler.form().as_ref()).map_err(|missing| {
            tracing::error!(?missing, "Schedule form fields unavailable");
            self.sink
                .notify(Notification::error("Schedule form is not available"));
            Error::ElementsUnavailable
        })?;

        let schedule = snapshot.to_schedule().inspect_err(|e| {
            self.sink
                .notify(Notification::error(format!("Invalid schedule: {e}")));
        })?;

        let stored = self
            .busy_while(self.schedules.save_schedule(&schedule))
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, "Failed to save schedule");
                self.sink
                    .notify(Notification::error(format!("Failed to save schedule: {e}")));
            })?;

        self.reconciler.mark_saved(stored);
        self.events.publish(DashboardEvent::ScheduleSaved(stored));
        self.sink
            .notify(Notification::success("Power schedule saved"));

        let now = self.now();
        self.publish_status(&stored.display(now));
        let ids = self.registry().ids();
        Ok(self.propagator.apply_schedule(&stored, ids, now).await)
    }

    // ========== Meters ==========

    /// Loads meters and the schedule for the first time.
    ///
    /// Each meter's power state is derived from the schedule rather than
    /// taken from the registry, so readings of meters outside the supply
    /// window show as zero.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the meter list could not be fetched. A
    /// failed schedule fetch is reported in the returned reconciliation.
    pub async fn load_initial(&self) -> Result<InitialLoad> {
        let (meters, schedule) = self
            .busy_while(async {
                tokio::join!(
                    self.propagator.service().list_meters(),
                    self.schedules.fetch_schedule()
                )
            })
            .await;

        let now = self.now();
        let reconciliation = match schedule {
            Ok(schedule) => self.reconciler.apply_incoming(schedule, now).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load schedule");
                self.sink.notify(Notification::error(format!(
                    "Failed to load power schedule: {e}"
                )));
                Reconciliation {
                    decision: Decision::LoadFailed(e.to_string()),
                    display: self.reconciler.display(now),
                }
            }
        };
        self.publish_reconciliation(&reconciliation);

        let meters = meters.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to load meters");
            self.sink
                .notify(Notification::error(format!("Failed to load meters: {e}")));
        })?;

        let supplying = self.reconciler.current().map(|s| s.is_supplying(now));
        self.registry().replace_all(meters.iter().map(|info| {
            let mut state = MeterState::from_info(info);
            if let Some(on) = supplying {
                state.set_powered_on(on);
            }
            state
        }));

        let count = meters.len();
        tracing::info!(meters = count, supplying = ?supplying, "Initial load complete");
        self.events
            .publish(DashboardEvent::MetersRefreshed { count });
        Ok(InitialLoad {
            meters: count,
            reconciliation,
        })
    }

    /// Re-reads every meter from the backend.
    ///
    /// The busy indicator is cleared when the request settles, or by the
    /// busy watchdog if it takes longer.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the meter list could not be fetched.
    pub async fn refresh_all(&self) -> Result<usize> {
        let meters = self
            .busy_while(self.propagator.service().list_meters())
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, "Failed to refresh meters");
                self.sink
                    .notify(Notification::error(format!("Failed to refresh meter data: {e}")));
            })?;

        let changed = merge_meters(self.registry(), &self.tracker, &self.events, &meters);
        tracing::debug!(count = meters.len(), changed, "Meters refreshed");
        self.events.publish(DashboardEvent::MetersRefreshed {
            count: meters.len(),
        });
        Ok(meters.len())
    }

    /// Inverts one meter's power state.
    ///
    /// # Errors
    ///
    /// Returns `Error::MeterNotFound` for an untracked meter and
    /// `Error::CommitFailed` if the switch was rolled back.
    pub async fn toggle_meter(&self, meter_id: MeterId) -> Result<IntentOutcome> {
        let desired = self
            .registry()
            .get(meter_id)
            .ok_or(Error::MeterNotFound(meter_id))?
            .power_state()
            .inverted();

        let outcome = self.propagator.set_power(meter_id, desired.is_on()).await?;
        if outcome == IntentOutcome::Confirmed {
            self.sink.notify(
                Notification::success(format!("Meter {meter_id} switched {desired}"))
                    .for_meter(meter_id),
            );
        }
        Ok(outcome)
    }

    /// Switches several meters in one request.
    ///
    /// Meters the backend reports as switched are updated locally.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the request failed; local state is then
    /// unchanged.
    pub async fn batch_power(
        &self,
        meter_ids: &[MeterId],
        power_on: bool,
    ) -> Result<BatchControlReport> {
        let report = self
            .busy_while(
                self.propagator
                    .service()
                    .batch_set_power(meter_ids, power_on),
            )
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, "Batch power control failed");
                self.sink
                    .notify(Notification::error(format!("Batch power control failed: {e}")));
            })?;

        let switched: Vec<MeterId> = if report.results.is_empty() {
            meter_ids.to_vec()
        } else {
            report
                .results
                .iter()
                .filter(|r| r.success)
                .map(|r| r.meter_id)
                .collect()
        };

        for id in &switched {
            match self.registry().set_confirmed(*id, power_on) {
                Ok(true) => self
                    .events
                    .publish(DashboardEvent::power_changed(*id, power_on, false)),
                Ok(false) => {}
                Err(e) => tracing::debug!(%id, error = %e, "Batch result for untracked meter"),
            }
        }

        let level = if switched.len() < meter_ids.len() {
            NotificationLevel::Warning
        } else {
            NotificationLevel::Success
        };
        self.sink.notify(Notification::new(
            level,
            format!(
                "{}/{} meters switched {}",
                switched.len(),
                meter_ids.len(),
                PowerState::from(power_on)
            ),
        ));
        Ok(report)
    }

    /// Shows the busy indicator while `operation` runs.
    ///
    /// The watchdog clears the indicator once the refresh watchdog elapses,
    /// even if the operation is still pending.
    async fn busy_while<F: Future>(&self, operation: F) -> F::Output {
        self.sink.set_busy(true);
        let sink = Arc::clone(&self.sink);
        let timeout = self.config.refresh_watchdog();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(timeout = ?timeout, "Request still pending, clearing busy indicator");
            sink.set_busy(false);
        });

        let output = operation.await;
        watchdog.abort();
        self.sink.set_busy(false);
        output
    }

    // ========== Background tasks ==========

    /// Starts the status tick, the meter poll and the configuration reload.
    ///
    /// Calling it again restarts all three timers.
    pub fn start(self: &Arc<Self>) {
        let display = Self::spawn_periodic(
            Arc::downgrade(self),
            self.config.display_interval(),
            |dashboard| async move {
                dashboard.tick();
            },
        );
        let reload = Self::spawn_periodic(
            Arc::downgrade(self),
            self.config.reload_interval(),
            |dashboard| async move {
                dashboard.reload_config().await;
            },
        );

        let poll_interval = self.poll_interval();
        let poll = self.spawn_poll(poll_interval);

        let mut tasks = self.tasks.lock();
        replace_task(&mut tasks.display, display);
        replace_task(&mut tasks.reload, reload);
        replace_task(&mut tasks.poll, poll);
        tracing::info!(
            display_interval_s = self.config.display_interval().as_secs(),
            poll_interval_s = poll_interval.as_secs(),
            reload_interval_s = self.config.reload_interval().as_secs(),
            "Dashboard timers started"
        );
    }

    /// Changes the meter poll interval.
    ///
    /// A running poll is restarted at the new interval; otherwise the
    /// interval takes effect on the next [`Self::start`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if `interval` is outside 5 to 180 seconds. The
    /// current interval is then kept.
    pub fn set_poll_interval(self: &Arc<Self>, interval: Duration) -> Result<()> {
        let interval = DashboardConfig::validate_poll_interval(interval)?;
        *self.poll_interval.lock() = interval;

        let mut tasks = self.tasks.lock();
        if tasks.poll.as_ref().is_some_and(|handle| !handle.is_finished()) {
            replace_task(&mut tasks.poll, self.spawn_poll(interval));
        }
        tracing::info!(interval = ?interval, "Meter poll reconfigured");
        Ok(())
    }

    fn apply_update_interval(self: &Arc<Self>, interval: Duration) {
        if interval == self.poll_interval() {
            return;
        }
        if let Err(e) = self.set_poll_interval(interval) {
            tracing::warn!(
                error = %e,
                current = ?self.poll_interval(),
                "Ignoring configured update interval"
            );
        }
    }

    fn spawn_poll(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        Self::spawn_periodic(Arc::downgrade(self), interval, |dashboard| async move {
            if let Err(e) = dashboard.refresh_all().await {
                tracing::debug!(error = %e, "Meter poll failed");
            }
        })
    }

    /// Replaces the status tick with one at `interval`.
    pub fn set_display_interval(self: &Arc<Self>, interval: Duration) {
        let display = Self::spawn_periodic(Arc::downgrade(self), interval, |dashboard| async move {
            dashboard.tick();
        });
        replace_task(&mut self.tasks.lock().display, display);
        tracing::info!(interval = ?interval, "Status tick reconfigured");
    }

    /// Consumes raw schedule pushes from `rx` until the channel closes.
    ///
    /// Malformed payloads are logged and ignored.
    pub fn attach_push_channel(self: &Arc<Self>, mut rx: mpsc::Receiver<String>) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tracing::debug!("Starting schedule push listener");
            while let Some(payload) = rx.recv().await {
                let Some(dashboard) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = dashboard.handle_push(&payload).await {
                    tracing::warn!(error = %e, payload = %payload, "Ignoring schedule push");
                }
            }
            tracing::debug!("Schedule push listener stopped");
        });
        replace_task(&mut self.tasks.lock().push, handle);
    }

    /// Stops all timers, the push listener and any pending consistency pass.
    pub fn shutdown(&self) {
        self.tasks.lock().abort_all();
        self.propagator.cancel_pending();
        tracing::info!("Dashboard shut down");
    }

    /// Returns `true` while any background task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        let tasks = self.tasks.lock();
        [&tasks.display, &tasks.reload, &tasks.poll, &tasks.push]
            .into_iter()
            .flatten()
            .any(|handle| !handle.is_finished())
    }

    fn spawn_periodic<F, Fut>(weak: Weak<Self>, period: Duration, mut run: F) -> JoinHandle<()>
    where
        F: FnMut(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(dashboard) = weak.upgrade() else {
                    break;
                };
                run(dashboard).await;
            }
        })
    }
}

impl<S, M> Drop for Dashboard<S, M> {
    fn drop(&mut self) {
        self.tasks.get_mut().abort_all();
    }
}
