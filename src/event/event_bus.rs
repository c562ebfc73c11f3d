// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting dashboard events.

use tokio::sync::broadcast;

use super::DashboardEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcasts [`DashboardEvent`]s to any number of subscribers.
///
/// A subscriber that falls more than the channel capacity behind loses the
/// oldest events and receives `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use powersched_lib::event::{DashboardEvent, EventBus};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(DashboardEvent::MetersRefreshed { count: 20 });
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    /// Creates an event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates an event bus buffering up to `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event. Without subscribers the event is dropped.
    pub fn publish(&self, event: DashboardEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeterId;

    #[test]
    fn subscriber_count_tracks_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn publish_delivers_to_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DashboardEvent::power_changed(MeterId::new(1), true, false));

        assert_eq!(rx1.recv().await.unwrap().meter_id(), Some(MeterId::new(1)));
        assert_eq!(rx2.recv().await.unwrap().meter_id(), Some(MeterId::new(1)));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(DashboardEvent::MetersRefreshed { count: 0 });
    }

    #[tokio::test]
    async fn clone_shares_channel() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let mut rx = bus.subscribe();

        clone.publish(DashboardEvent::MetersRefreshed { count: 2 });
        assert_eq!(
            rx.recv().await.unwrap(),
            DashboardEvent::MetersRefreshed { count: 2 }
        );
    }
}
