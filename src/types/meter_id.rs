// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Meter identifier type.

use std::fmt;

/// Identifier of a meter as assigned by the backend registry.
///
/// Meters are numbered from 1 by the backend; the identifier is also used as
/// the entity part of edit-protection keys for per-meter fields.
///
/// # Examples
///
/// ```
/// use powersched_lib::types::MeterId;
///
/// let id = MeterId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// assert_eq!(id.label(), "RTU-0007");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MeterId(u32);

impl MeterId {
    /// Creates a meter identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the default parking/meter label used when the registry has none.
    #[must_use]
    pub fn label(&self) -> String {
        format!("RTU-{:04}", self.0)
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MeterId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<MeterId> for u32 {
    fn from(id: MeterId) -> Self {
        id.0
    }
}
