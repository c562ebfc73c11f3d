// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot, apply, commit, restore.

use std::future::Future;

use crate::error::{Error, Result};
use crate::state::{IntentOutcome, MeterRegistry, PowerIntent};
use crate::types::MeterId;

/// A power change applied locally before the remote commit settles.
///
/// [`begin`](Self::begin) snapshots the meter and applies the new state;
/// [`commit`](Self::commit) awaits the remote operation and restores the
/// last acknowledged state if it failed, unless a newer command for the same
/// meter was issued in the meantime.
///
/// # Examples
///
/// ```
/// use powersched_lib::propagate::OptimisticCommand;
/// use powersched_lib::state::{IntentOutcome, MeterRegistry, MeterState};
/// use powersched_lib::types::MeterId;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> powersched_lib::Result<()> {
/// let registry = MeterRegistry::new();
/// registry.insert(MeterState::new(MeterId::new(1)));
///
/// let command = OptimisticCommand::begin(&registry, MeterId::new(1), true)?;
/// let settled = command.commit(&registry, async { Ok(()) }).await;
/// assert_eq!(settled.outcome, IntentOutcome::Confirmed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an optimistic command must be committed"]
pub struct OptimisticCommand {
    intent: PowerIntent,
}

/// Result of a settled [`OptimisticCommand`].
#[derive(Debug)]
pub struct SettledCommand {
    /// The meter.
    pub meter_id: MeterId,
    /// The requested power state.
    pub desired: bool,
    /// The power state before the command was applied.
    pub previous: bool,
    /// Effect on local state.
    pub outcome: IntentOutcome,
    /// The commit error, if the commit failed.
    pub error: Option<Error>,
}

impl SettledCommand {
    /// Converts a rolled-back command into `Error::CommitFailed`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommitFailed` if the command was rolled back.
    pub fn into_result(self) -> Result<IntentOutcome> {
        match self.outcome {
            IntentOutcome::RolledBack { .. } => Err(Error::CommitFailed {
                meter_id: self.meter_id,
                reason: self
                    .error
                    .map_or_else(|| "unknown error".to_string(), |e| e.to_string()),
            }),
            outcome => Ok(outcome),
        }
    }
}

impl OptimisticCommand {
    /// Snapshots the meter and applies `desired` locally.
    ///
    /// # Errors
    ///
    /// Returns `Error::MeterNotFound` if the meter is not tracked.
    pub fn begin(registry: &MeterRegistry, meter_id: MeterId, desired: bool) -> Result<Self> {
        registry
            .begin_intent(meter_id, desired)
            .map(|intent| Self { intent })
    }

    /// Returns the meter.
    #[must_use]
    pub fn meter_id(&self) -> MeterId {
        self.intent.meter_id()
    }

    /// Returns the requested power state.
    #[must_use]
    pub fn desired(&self) -> bool {
        self.intent.desired()
    }

    /// Returns the snapshot taken before applying.
    #[must_use]
    pub fn previous(&self) -> bool {
        self.intent.previous()
    }

    /// Awaits the remote commit and settles local state.
    pub async fn commit<F>(self, registry: &MeterRegistry, remote: F) -> SettledCommand
    where
        F: Future<Output = Result<()>>,
    {
        let result = remote.await;
        let outcome = registry.finish_intent(&self.intent, result.is_ok());
        SettledCommand {
            meter_id: self.meter_id(),
            desired: self.desired(),
            previous: self.previous(),
            outcome,
            error: result.err(),
        }
    }
}
