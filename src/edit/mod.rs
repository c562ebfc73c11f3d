// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edit protection for fields the user is typing into.
//!
//! While a field is protected, inbound updates for it are dropped rather than
//! merged. Protection starts when the user focuses a field and lasts until a
//! grace period has elapsed after the last blur, so a quick blur/refocus
//! during one logical edit never opens a gap.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use powersched_lib::edit::{EditKey, EditProtectionTracker};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tracker = EditProtectionTracker::new();
//! let key = EditKey::new("schedule", "openEndTime");
//!
//! tracker.begin_edit(key.clone());
//! assert!(tracker.is_protected(&key));
//!
//! tracker.end_edit(&key);
//! // Still protected during the grace period
//! assert!(tracker.is_protected(&key));
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Identifies one editable field of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditKey {
    entity: String,
    field: String,
}

impl EditKey {
    /// Creates a key from an entity (a meter id, `"schedule"`) and a field name.
    #[must_use]
    pub fn new(entity: impl fmt::Display, field: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            field: field.into(),
        }
    }

    /// Returns the entity part of the key.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the field part of the key.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for EditKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity, self.field)
    }
}

#[derive(Debug, Clone, Copy)]
enum Protection {
    /// Field has focus.
    Editing,
    /// Field was blurred; protection lapses at `deadline`.
    Releasing { deadline: Instant },
}

/// Tracks which fields are protected from inbound overwrites.
///
/// Cloning is cheap and clones share the same protected set. Expiry uses
/// `tokio::time::Instant`, so paused test clocks drive it deterministically.
#[derive(Debug, Clone)]
pub struct EditProtectionTracker {
    entries: Arc<Mutex<HashMap<EditKey, Protection>>>,
    grace: Duration,
}

impl EditProtectionTracker {
    /// Default grace period after a blur.
    pub const DEFAULT_GRACE: Duration = Duration::from_millis(3000);

    /// Creates a tracker with the default grace period.
    #[must_use]
    pub fn new() -> Self {
        Self::with_grace(Self::DEFAULT_GRACE)
    }

    /// Creates a tracker with a custom grace period.
    #[must_use]
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            grace,
        }
    }

    /// Returns the grace period.
    #[must_use]
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Protects `key` and cancels any pending expiry for it.
    pub fn begin_edit(&self, key: EditKey) {
        tracing::trace!(key = %key, "Edit protection started");
        self.entries.lock().insert(key, Protection::Editing);
    }

    /// Schedules removal of `key` once the grace period has elapsed.
    ///
    /// A repeated blur restarts the grace period. Keys that are not protected
    /// are ignored.
    pub fn end_edit(&self, key: &EditKey) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            *entry = Protection::Releasing {
                deadline: Instant::now() + self.grace,
            };
            tracing::trace!(key = %key, grace = ?self.grace, "Edit protection releasing");
        }
    }

    /// Returns `true` while `key` is being edited or inside its grace period.
    #[must_use]
    pub fn is_protected(&self, key: &EditKey) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(Protection::Editing) => true,
            Some(Protection::Releasing { deadline }) if Instant::now() < *deadline => true,
            Some(Protection::Releasing { .. }) => {
                entries.remove(key);
                tracing::debug!(key = %key, "Edit protection expired");
                false
            }
            None => false,
        }
    }

    /// Drops every entry whose grace period has elapsed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.lock().retain(|_, protection| match protection {
            Protection::Editing => true,
            Protection::Releasing { deadline } => now < *deadline,
        });
    }

    /// Returns the number of currently protected keys.
    #[must_use]
    pub fn protected_count(&self) -> usize {
        self.purge_expired();
        self.entries.lock().len()
    }
}

impl Default for EditProtectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
