// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-meter state tracking.

use std::fmt;

use crate::edit::EditKey;
use crate::protocol::MeterInfo;
use crate::types::{MeterId, PowerState};

/// An editable per-meter display field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayField {
    /// Household name.
    Household,
    /// Parking space label.
    Parking,
    /// Meter identifier label.
    MeterIdLabel,
}

impl DisplayField {
    /// All display fields.
    pub const ALL: [Self; 3] = [Self::Household, Self::Parking, Self::MeterIdLabel];

    /// Returns the stable field name.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Household => "household",
            Self::Parking => "parking",
            Self::MeterIdLabel => "meter_id",
        }
    }

    /// Returns the edit-protection key for this field of `meter_id`.
    #[must_use]
    pub fn edit_key(&self, meter_id: MeterId) -> EditKey {
        EditKey::new(meter_id, self.key())
    }
}

impl fmt::Display for DisplayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Text shown for a meter in the grid.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DisplayFields {
    /// Household name.
    pub household: String,
    /// Parking space label.
    pub parking: String,
    /// Meter identifier label.
    pub meter_id_label: String,
}

impl DisplayFields {
    /// Returns the placeholder fields for a meter the registry knows nothing about.
    #[must_use]
    pub fn placeholder(meter_id: MeterId) -> Self {
        Self {
            household: format!("A{meter_id}"),
            parking: format!("ABC-{:04}", meter_id.value()),
            meter_id_label: meter_id.label(),
        }
    }

    /// Returns the value of `field`.
    #[must_use]
    pub fn get(&self, field: DisplayField) -> &str {
        match field {
            DisplayField::Household => &self.household,
            DisplayField::Parking => &self.parking,
            DisplayField::MeterIdLabel => &self.meter_id_label,
        }
    }

    /// Sets `field`, returning `true` if the value changed.
    pub fn set(&mut self, field: DisplayField, value: &str) -> bool {
        let slot = match field {
            DisplayField::Household => &mut self.household,
            DisplayField::Parking => &mut self.parking,
            DisplayField::MeterIdLabel => &mut self.meter_id_label,
        };
        if slot == value {
            false
        } else {
            value.clone_into(slot);
            true
        }
    }
}

/// Electrical readings of a meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeterMetrics {
    /// Voltage in volts.
    pub voltage: f64,
    /// Current in amperes.
    pub current: f64,
    /// Active power.
    pub power: f64,
    /// Energy used today in kWh.
    pub daily_energy: f64,
    /// Cost accrued today.
    pub cost_today: f64,
}

impl MeterMetrics {
    /// Extracts the readings from a registry entry.
    ///
    /// Falls back to the cumulative energy when the daily figure is missing.
    #[must_use]
    pub fn from_info(info: &MeterInfo) -> Self {
        Self {
            voltage: info.voltage,
            current: info.current,
            power: info.power,
            daily_energy: info.daily_energy.or(info.energy).unwrap_or_default(),
            cost_today: info.cost_today.unwrap_or_default(),
        }
    }
}

/// Locally tracked state of one meter.
///
/// Readings of an unpowered meter are reported as zero, whatever was last
/// received for it.
///
/// # Examples
///
/// ```
/// use powersched_lib::state::MeterState;
/// use powersched_lib::types::MeterId;
///
/// let mut meter = MeterState::new(MeterId::new(1));
/// assert!(!meter.is_powered_on());
/// assert!(meter.set_powered_on(true));
/// assert!(!meter.set_powered_on(true));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeterState {
    id: MeterId,
    powered_on: bool,
    online: bool,
    display: DisplayFields,
    metrics: MeterMetrics,
}

impl MeterState {
    /// Creates an unpowered, online meter with placeholder display fields.
    #[must_use]
    pub fn new(id: MeterId) -> Self {
        Self {
            id,
            powered_on: false,
            online: true,
            display: DisplayFields::placeholder(id),
            metrics: MeterMetrics::default(),
        }
    }

    /// Builds the state reported by the registry.
    #[must_use]
    pub fn from_info(info: &MeterInfo) -> Self {
        let mut state = Self::new(info.id);
        state.powered_on = info.power_on;
        state.online = info.is_online();
        state.metrics = MeterMetrics::from_info(info);
        for field in DisplayField::ALL {
            if let Some(value) = remote_display_value(info, field) {
                state.display.set(field, &value);
            }
        }
        state
    }

    /// Returns the meter identifier.
    #[must_use]
    pub fn id(&self) -> MeterId {
        self.id
    }

    /// Returns `true` if the meter is powered.
    #[must_use]
    pub fn is_powered_on(&self) -> bool {
        self.powered_on
    }

    /// Returns the relay state.
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        PowerState::from(self.powered_on)
    }

    /// Sets the relay state, returning `true` if it changed.
    pub fn set_powered_on(&mut self, powered_on: bool) -> bool {
        if self.powered_on == powered_on {
            false
        } else {
            self.powered_on = powered_on;
            true
        }
    }

    /// Returns `true` unless the registry reported the meter offline.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Sets the online flag.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Returns the display fields.
    #[must_use]
    pub fn display(&self) -> &DisplayFields {
        &self.display
    }

    /// Returns mutable display fields.
    pub fn display_mut(&mut self) -> &mut DisplayFields {
        &mut self.display
    }

    /// Returns the readings, zeroed while the meter is unpowered.
    #[must_use]
    pub fn metrics(&self) -> MeterMetrics {
        if self.powered_on {
            self.metrics
        } else {
            MeterMetrics::default()
        }
    }

    /// Replaces the readings.
    pub fn set_metrics(&mut self, metrics: MeterMetrics) {
        self.metrics = metrics;
    }
}

/// Returns the non-empty value the registry reports for `field`.
pub(crate) fn remote_display_value(info: &MeterInfo, field: DisplayField) -> Option<String> {
    let value = match field {
        DisplayField::Household => info.name.clone(),
        DisplayField::Parking => info.parking.clone(),
        DisplayField::MeterIdLabel => Some(info.id.label()),
    }?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u32, power_on: bool) -> MeterInfo {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "power_on": power_on,
            "voltage": 220.5,
            "current": 1.5,
            "power": 330.0,
            "daily_energy": 12.5,
            "cost_today": 50.0,
            "name": "  B-2  ",
            "parking": "",
        }))
        .unwrap()
    }

    #[test]
    fn placeholder_fields() {
        let fields = DisplayFields::placeholder(MeterId::new(7));
        assert_eq!(fields.household, "A7");
        assert_eq!(fields.parking, "ABC-0007");
        assert_eq!(fields.meter_id_label, "RTU-0007");
    }

    #[test]
    fn from_info_keeps_placeholders_for_empty_values() {
        let state = MeterState::from_info(&info(2, true));
        assert_eq!(state.display().household, "B-2");
        assert_eq!(state.display().parking, "ABC-0002");
        assert!(state.is_powered_on());
        assert!((state.metrics().power - 330.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unpowered_meter_reports_zero_metrics() {
        let mut state = MeterState::from_info(&info(2, true));
        state.set_powered_on(false);
        assert_eq!(state.metrics(), MeterMetrics::default());
        state.set_powered_on(true);
        assert!((state.metrics().daily_energy - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_energy_falls_back_to_total() {
        let info: MeterInfo =
            serde_json::from_value(serde_json::json!({"id": 1, "energy": 3.25})).unwrap();
        let metrics = MeterMetrics::from_info(&info);
        assert!((metrics.daily_energy - 3.25).abs() < f64::EPSILON);
        assert!(metrics.cost_today.abs() < f64::EPSILON);
    }

    #[test]
    fn display_set_reports_change() {
        let mut fields = DisplayFields::placeholder(MeterId::new(1));
        assert!(fields.set(DisplayField::Parking, "P-9"));
        assert!(!fields.set(DisplayField::Parking, "P-9"));
        assert_eq!(fields.get(DisplayField::Parking), "P-9");
    }

    #[test]
    fn display_field_edit_key() {
        assert_eq!(
            DisplayField::Household.edit_key(MeterId::new(4)).to_string(),
            "4-household"
        );
    }
}
