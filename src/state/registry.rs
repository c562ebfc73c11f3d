// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared collection of tracked meters.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::edit::EditProtectionTracker;
use crate::error::{Error, Result};
use crate::protocol::MeterInfo;
use crate::state::meter_state::{DisplayField, MeterMetrics, MeterState, remote_display_value};
use crate::types::MeterId;

#[derive(Debug, Clone)]
struct TrackedMeter {
    state: MeterState,
    /// Last power state acknowledged by the registry.
    confirmed: bool,
    confirmed_seq: u64,
    intent_seq: u64,
    in_flight: usize,
}

impl TrackedMeter {
    fn new(state: MeterState) -> Self {
        Self {
            confirmed: state.is_powered_on(),
            state,
            confirmed_seq: 0,
            intent_seq: 0,
            in_flight: 0,
        }
    }
}

/// Ticket for one optimistic power change of one meter.
///
/// Issued by [`MeterRegistry::begin_intent`] and resolved by
/// [`MeterRegistry::finish_intent`] once the remote commit has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerIntent {
    meter_id: MeterId,
    seq: u64,
    previous: bool,
    desired: bool,
}

impl PowerIntent {
    /// Returns the meter this intent targets.
    #[must_use]
    pub fn meter_id(&self) -> MeterId {
        self.meter_id
    }

    /// Returns the local power state before the intent was applied.
    #[must_use]
    pub fn previous(&self) -> bool {
        self.previous
    }

    /// Returns the requested power state.
    #[must_use]
    pub fn desired(&self) -> bool {
        self.desired
    }
}

/// How a settled intent affected the local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// The commit succeeded and the optimistic state stands.
    Confirmed,
    /// The commit failed and the last acknowledged state was restored.
    RolledBack {
        /// The power state restored.
        restored: bool,
    },
    /// A newer intent for the same meter was issued; local state untouched.
    Superseded,
}

/// Aggregate figures over all tracked meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeterStatistics {
    /// Number of tracked meters.
    pub total: usize,
    /// Number of meters not reported offline.
    pub online: usize,
    /// Number of powered meters.
    pub powered: usize,
    /// Summed power of powered, online meters.
    pub total_power: f64,
    /// Summed cost of powered, online meters.
    pub total_cost: f64,
}

/// Thread-safe collection of [`MeterState`]s.
///
/// Cloning is cheap and clones share the same meters. Every power change goes
/// through an intent so that only the most recently issued change for a meter
/// decides its final state.
///
/// # Examples
///
/// ```
/// use powersched_lib::state::{IntentOutcome, MeterRegistry, MeterState};
/// use powersched_lib::types::MeterId;
///
/// let registry = MeterRegistry::new();
/// let id = MeterId::new(1);
/// registry.insert(MeterState::new(id));
///
/// let intent = registry.begin_intent(id, true).unwrap();
/// assert_eq!(registry.is_powered_on(id), Some(true));
///
/// let outcome = registry.finish_intent(&intent, false);
/// assert_eq!(outcome, IntentOutcome::RolledBack { restored: false });
/// assert_eq!(registry.is_powered_on(id), Some(false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeterRegistry {
    meters: Arc<Mutex<HashMap<MeterId, TrackedMeter>>>,
}

impl MeterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `state`, replacing any previous state for the same meter.
    pub fn insert(&self, state: MeterState) {
        self.meters
            .lock()
            .insert(state.id(), TrackedMeter::new(state));
    }

    /// Replaces every tracked meter.
    pub fn replace_all(&self, states: impl IntoIterator<Item = MeterState>) {
        let fresh: HashMap<_, _> = states
            .into_iter()
            .map(|state| (state.id(), TrackedMeter::new(state)))
            .collect();
        *self.meters.lock() = fresh;
    }

    /// Returns a copy of one meter's state.
    #[must_use]
    pub fn get(&self, id: MeterId) -> Option<MeterState> {
        self.meters.lock().get(&id).map(|m| m.state.clone())
    }

    /// Returns `true` if the meter is tracked.
    #[must_use]
    pub fn contains(&self, id: MeterId) -> bool {
        self.meters.lock().contains_key(&id)
    }

    /// Returns the local power state of a meter.
    #[must_use]
    pub fn is_powered_on(&self, id: MeterId) -> Option<bool> {
        self.meters.lock().get(&id).map(|m| m.state.is_powered_on())
    }

    /// Returns all tracked ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<MeterId> {
        let mut ids: Vec<_> = self.meters.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns copies of all states ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MeterState> {
        let mut states: Vec<_> = self
            .meters
            .lock()
            .values()
            .map(|m| m.state.clone())
            .collect();
        states.sort_unstable_by_key(MeterState::id);
        states
    }

    /// Returns the number of tracked meters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.meters.lock().len()
    }

    /// Returns `true` if no meter is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meters.lock().is_empty()
    }

    /// Returns `true` if a power commit for the meter has not settled yet.
    #[must_use]
    pub fn has_pending(&self, id: MeterId) -> bool {
        self.meters.lock().get(&id).is_some_and(|m| m.in_flight > 0)
    }

    /// Applies `desired` locally and issues a ticket for the remote commit.
    ///
    /// The ticket supersedes every earlier ticket for the same meter.
    ///
    /// # Errors
    ///
    /// Returns `Error::MeterNotFound` if the meter is not tracked.
    pub fn begin_intent(&self, id: MeterId, desired: bool) -> Result<PowerIntent> {
        let mut meters = self.meters.lock();
        let tracked = meters.get_mut(&id).ok_or(Error::MeterNotFound(id))?;

        tracked.intent_seq += 1;
        tracked.in_flight += 1;
        let previous = tracked.state.is_powered_on();
        tracked.state.set_powered_on(desired);

        tracing::debug!(%id, desired_on = desired, seq = tracked.intent_seq, "Optimistic power change");
        Ok(PowerIntent {
            meter_id: id,
            seq: tracked.intent_seq,
            previous,
            desired,
        })
    }

    /// Resolves a ticket once its remote commit has settled.
    ///
    /// A successful commit becomes the acknowledged state unless a newer
    /// commit was already acknowledged. A failed commit restores the
    /// acknowledged state, but only if no newer ticket was issued meanwhile.
    pub fn finish_intent(&self, intent: &PowerIntent, succeeded: bool) -> IntentOutcome {
        let mut meters = self.meters.lock();
        let Some(tracked) = meters.get_mut(&intent.meter_id) else {
            return IntentOutcome::Superseded;
        };

        tracked.in_flight = tracked.in_flight.saturating_sub(1);
        if succeeded && intent.seq > tracked.confirmed_seq {
            tracked.confirmed = intent.desired;
            tracked.confirmed_seq = intent.seq;
        }

        if intent.seq != tracked.intent_seq {
            tracing::debug!(id = %intent.meter_id, seq = intent.seq, "Power change superseded");
            return IntentOutcome::Superseded;
        }

        if succeeded {
            IntentOutcome::Confirmed
        } else {
            let restored = tracked.confirmed;
            tracked.state.set_powered_on(restored);
            tracing::warn!(id = %intent.meter_id, restored_on = restored, "Power change rolled back");
            IntentOutcome::RolledBack { restored }
        }
    }

    /// Records a power state acknowledged by the registry outside of an intent.
    ///
    /// Returns whether the local state changed.
    ///
    /// # Errors
    ///
    /// Returns `Error::MeterNotFound` if the meter is not tracked.
    pub fn set_confirmed(&self, id: MeterId, powered_on: bool) -> Result<bool> {
        let mut meters = self.meters.lock();
        let tracked = meters.get_mut(&id).ok_or(Error::MeterNotFound(id))?;
        tracked.confirmed = powered_on;
        tracked.confirmed_seq = tracked.intent_seq;
        Ok(tracked.state.set_powered_on(powered_on))
    }

    /// Updates a display field after a local edit.
    ///
    /// # Errors
    ///
    /// Returns `Error::MeterNotFound` if the meter is not tracked.
    pub fn set_display_field(&self, id: MeterId, field: DisplayField, value: &str) -> Result<bool> {
        let mut meters = self.meters.lock();
        let tracked = meters.get_mut(&id).ok_or(Error::MeterNotFound(id))?;
        Ok(tracked.state.display_mut().set(field, value))
    }

    /// Merges a registry entry into the local state.
    ///
    /// Display fields under edit protection are left alone, and the power
    /// state of a meter with an unsettled commit is not overwritten. Unknown
    /// meters are added.
    ///
    /// Returns whether the local power state changed.
    pub fn merge_remote(&self, info: &MeterInfo, tracker: &EditProtectionTracker) -> bool {
        let mut meters = self.meters.lock();
        let tracked = meters
            .entry(info.id)
            .or_insert_with(|| TrackedMeter::new(MeterState::new(info.id)));

        tracked.state.set_online(info.is_online());
        tracked.state.set_metrics(MeterMetrics::from_info(info));

        for field in DisplayField::ALL {
            if tracker.is_protected(&field.edit_key(info.id)) {
                tracing::trace!(id = %info.id, %field, "Skipping protected field");
                continue;
            }
            if let Some(value) = remote_display_value(info, field) {
                tracked.state.display_mut().set(field, &value);
            }
        }

        if tracked.in_flight > 0 {
            tracing::debug!(id = %info.id, "Power commit in flight, keeping local power state");
            return false;
        }
        tracked.confirmed = info.power_on;
        tracked.confirmed_seq = tracked.intent_seq;
        tracked.state.set_powered_on(info.power_on)
    }

    /// Computes aggregate figures.
    #[must_use]
    pub fn statistics(&self) -> MeterStatistics {
        let meters = self.meters.lock();
        meters
            .values()
            .fold(MeterStatistics::default(), |mut stats, tracked| {
                let state = &tracked.state;
                stats.total += 1;
                if state.is_online() {
                    stats.online += 1;
                }
                if state.is_powered_on() {
                    stats.powered += 1;
                    if state.is_online() {
                        let metrics = state.metrics();
                        stats.total_power += metrics.power;
                        stats.total_cost += metrics.cost_today;
                    }
                }
                stats
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditKey;

    fn registry_with(ids: &[u32]) -> MeterRegistry {
        let registry = MeterRegistry::new();
        for id in ids {
            registry.insert(MeterState::new(MeterId::new(*id)));
        }
        registry
    }

    fn info(json: serde_json::Value) -> MeterInfo {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn ids_are_sorted() {
        let registry = registry_with(&[3, 1, 2]);
        assert_eq!(
            registry.ids(),
            vec![MeterId::new(1), MeterId::new(2), MeterId::new(3)]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn begin_intent_unknown_meter() {
        let registry = MeterRegistry::new();
        assert!(matches!(
            registry.begin_intent(MeterId::new(9), true),
            Err(Error::MeterNotFound(_))
        ));
    }

    #[test]
    fn successful_intent_is_confirmed() {
        let registry = registry_with(&[1]);
        let id = MeterId::new(1);
        let intent = registry.begin_intent(id, true).unwrap();
        assert!(registry.has_pending(id));
        assert!(!intent.previous());

        assert_eq!(registry.finish_intent(&intent, true), IntentOutcome::Confirmed);
        assert!(!registry.has_pending(id));
        assert_eq!(registry.is_powered_on(id), Some(true));
    }

    #[test]
    fn superseded_failure_does_not_restore() {
        let registry = registry_with(&[1]);
        let id = MeterId::new(1);
        let first = registry.begin_intent(id, true).unwrap();
        let second = registry.begin_intent(id, false).unwrap();

        assert_eq!(registry.finish_intent(&first, false), IntentOutcome::Superseded);
        assert_eq!(registry.is_powered_on(id), Some(false));
        assert_eq!(registry.finish_intent(&second, true), IntentOutcome::Confirmed);
        assert_eq!(registry.is_powered_on(id), Some(false));
    }

    #[test]
    fn latest_failure_restores_last_acknowledged() {
        let registry = registry_with(&[1]);
        let id = MeterId::new(1);
        let first = registry.begin_intent(id, true).unwrap();
        let second = registry.begin_intent(id, false).unwrap();

        // First commit lands, second fails
        assert_eq!(registry.finish_intent(&first, true), IntentOutcome::Superseded);
        assert_eq!(
            registry.finish_intent(&second, false),
            IntentOutcome::RolledBack { restored: true }
        );
        assert_eq!(registry.is_powered_on(id), Some(true));
    }

    #[test]
    fn stale_success_does_not_override_newer_ack() {
        let registry = registry_with(&[1]);
        let id = MeterId::new(1);
        let first = registry.begin_intent(id, true).unwrap();
        let second = registry.begin_intent(id, false).unwrap();
        assert_eq!(registry.finish_intent(&second, true), IntentOutcome::Confirmed);
        assert_eq!(registry.finish_intent(&first, true), IntentOutcome::Superseded);

        let third = registry.begin_intent(id, true).unwrap();
        assert_eq!(
            registry.finish_intent(&third, false),
            IntentOutcome::RolledBack { restored: false }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn merge_respects_protection_and_in_flight() {
        let registry = registry_with(&[1]);
        let tracker = EditProtectionTracker::new();
        let id = MeterId::new(1);
        tracker.begin_edit(EditKey::new(id, "household"));
        let intent = registry.begin_intent(id, true).unwrap();

        let changed = registry.merge_remote(
            &info(serde_json::json!({
                "id": 1, "power_on": false, "name": "Server name", "parking": "P-1"
            })),
            &tracker,
        );

        assert!(!changed);
        let state = registry.get(id).unwrap();
        assert!(state.is_powered_on());
        assert_eq!(state.display().household, "A1");
        assert_eq!(state.display().parking, "P-1");

        registry.finish_intent(&intent, true);
        assert!(registry.merge_remote(
            &info(serde_json::json!({"id": 1, "power_on": false})),
            &tracker,
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn merge_adds_unknown_meter() {
        let registry = MeterRegistry::new();
        let tracker = EditProtectionTracker::new();
        registry.merge_remote(
            &info(serde_json::json!({"id": 5, "power_on": true, "status": "offline"})),
            &tracker,
        );
        let state = registry.get(MeterId::new(5)).unwrap();
        assert!(state.is_powered_on());
        assert!(!state.is_online());
    }

    #[test]
    fn statistics_count_powered_online_meters() {
        let registry = MeterRegistry::new();
        let on: MeterInfo = info(serde_json::json!({
            "id": 1, "power_on": true, "power": 100.0, "cost_today": 10.0
        }));
        let offline: MeterInfo = info(serde_json::json!({
            "id": 2, "power_on": true, "power": 50.0, "cost_today": 5.0, "status": "offline"
        }));
        let off: MeterInfo = info(serde_json::json!({
            "id": 3, "power_on": false, "power": 70.0, "cost_today": 7.0
        }));
        registry.replace_all([&on, &offline, &off].into_iter().map(MeterState::from_info));

        let stats = registry.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.online, 2);
        assert_eq!(stats.powered, 2);
        assert!((stats.total_power - 100.0).abs() < f64::EPSILON);
        assert!((stats.total_cost - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn set_confirmed_updates_state() {
        let registry = registry_with(&[1]);
        assert!(registry.set_confirmed(MeterId::new(1), true).unwrap());
        assert!(!registry.set_confirmed(MeterId::new(1), true).unwrap());
    }

    #[test]
    fn set_display_field_reports_changes() {
        let registry = registry_with(&[1]);
        let id = MeterId::new(1);

        assert!(registry.set_display_field(id, DisplayField::Household, "Unit 4").unwrap());
        assert!(!registry.set_display_field(id, DisplayField::Household, "Unit 4").unwrap());
        assert_eq!(registry.get(id).unwrap().display().household, "Unit 4");

        let err = registry
            .set_display_field(MeterId::new(9), DisplayField::Parking, "P-01")
            .unwrap_err();
        assert!(matches!(err, Error::MeterNotFound(m) if m == MeterId::new(9)));
    }

    #[tokio::test(start_paused = true)]
    async fn local_display_edit_survives_merge_while_protected() {
        let registry = registry_with(&[1]);
        let tracker = EditProtectionTracker::new();
        let id = MeterId::new(1);

        registry.set_display_field(id, DisplayField::Household, "Unit 4").unwrap();
        tracker.begin_edit(DisplayField::Household.edit_key(id));
        registry.merge_remote(&info(serde_json::json!({"id": 1, "name": "Unit 7"})), &tracker);

        assert_eq!(registry.get(id).unwrap().display().household, "Unit 4");
    }
}
