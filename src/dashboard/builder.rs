// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dashboard builder.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::{BackgroundTasks, Clock, Dashboard, DashboardConfig, SystemClock};
use crate::edit::EditProtectionTracker;
use crate::event::EventBus;
use crate::form::{FormFieldAccessor, ReadySignal};
use crate::notify::{NotificationSink, TracingSink};
use crate::propagate::MeterPowerPropagator;
use crate::protocol::{RemoteMeterService, RemoteScheduleService};
use crate::reconcile::ScheduleReconciler;
use crate::state::MeterRegistry;

/// Builder for a [`Dashboard`].
///
/// Notifications default to [`TracingSink`], time to [`SystemClock`], and
/// the form is assumed to be mounted unless a [`ReadySignal`] is supplied.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use powersched_lib::dashboard::Dashboard;
/// use powersched_lib::form::FormFieldAccessor;
/// use powersched_lib::protocol::HttpBackend;
///
/// # async fn example(form: Arc<dyn FormFieldAccessor>) -> powersched_lib::Result<()> {
/// let backend = Arc::new(HttpBackend::new("http://192.168.1.20:5000")?);
/// let dashboard = Dashboard::builder(Arc::clone(&backend), backend, form).build();
///
/// dashboard.load_initial().await?;
/// dashboard.start();
/// # Ok(())
/// # }
/// ```
pub struct DashboardBuilder<S, M> {
    schedules: Arc<S>,
    meters: Arc<M>,
    form: Arc<dyn FormFieldAccessor>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    ready: ReadySignal,
    events: EventBus,
    config: DashboardConfig,
}

impl<S, M> DashboardBuilder<S, M>
where
    S: RemoteScheduleService + 'static,
    M: RemoteMeterService + 'static,
{
    pub(crate) fn new(schedules: Arc<S>, meters: Arc<M>, form: Arc<dyn FormFieldAccessor>) -> Self {
        Self {
            schedules,
            meters,
            form,
            sink: Arc::new(TracingSink),
            clock: Arc::new(SystemClock),
            ready: ReadySignal::ready(),
            events: EventBus::new(),
            config: DashboardConfig::default(),
        }
    }

    /// Sets the notification sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the clock used to evaluate schedules.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the signal the host fulfils once the form is mounted.
    #[must_use]
    pub fn with_ready_signal(mut self, ready: ReadySignal) -> Self {
        self.ready = ready;
        self
    }

    /// Sets the event bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Sets the timing configuration.
    #[must_use]
    pub fn with_config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the dashboard. Background tasks start with [`Dashboard::start`].
    #[must_use]
    pub fn build(self) -> Arc<Dashboard<S, M>> {
        let tracker = EditProtectionTracker::with_grace(self.config.edit_grace());
        let registry = MeterRegistry::new();

        let reconciler = ScheduleReconciler::new(
            self.form,
            tracker.clone(),
            self.ready,
            self.config.reconciler(),
        );
        let propagator = MeterPowerPropagator::new(
            self.meters,
            registry,
            tracker.clone(),
            Arc::clone(&self.sink),
            self.events.clone(),
        )
        .with_consistency_delay(self.config.consistency_delay());
        let (status, _) = watch::channel(None);

        Arc::new(Dashboard {
            schedules: self.schedules,
            propagator,
            reconciler,
            tracker,
            sink: self.sink,
            events: self.events,
            clock: self.clock,
            config: self.config,
            status,
            poll_interval: Mutex::new(self.config.poll_interval()),
            tasks: Mutex::new(BackgroundTasks::default()),
        })
    }
}
