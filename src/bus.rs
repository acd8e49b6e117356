//! In-process publish/subscribe primitive every realtime coordinator is
//! built on. Each topic maps to its own broadcast channel so ordering is
//! guaranteed per topic for a single publisher, and nothing is guaranteed
//! across topics.

use tokio::sync::broadcast;

use crate::dto::events::ServerEvent;

/// Logical broadcast topics used by the orchestration core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Player-facing game events (`new_event` envelopes).
    GameEvents,
    /// Fortune-wheel synchronization (`sync` envelopes).
    WheelEvents,
    /// Card effect application (`apply_effect` envelopes).
    CardEffects,
}

/// Topic-keyed event bus fanning out [`ServerEvent`]s to subscribers.
///
/// Delivery is fire-and-forget: publishing to a topic without subscribers is
/// not an error, and lagging subscribers drop messages rather than block the
/// publisher.
pub struct EventBus {
    game_events: Hub,
    wheel_events: Hub,
    card_effects: Hub,
}

impl EventBus {
    /// Build the bus with a per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            game_events: Hub::new(capacity),
            wheel_events: Hub::new(capacity),
            card_effects: Hub::new(capacity),
        }
    }

    /// Send an event to all current subscribers of `topic`.
    pub fn publish(&self, topic: Topic, event: ServerEvent) {
        self.hub(topic).broadcast(event);
    }

    /// Register a new subscriber that will receive subsequent events on `topic`.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<ServerEvent> {
        self.hub(topic).subscribe()
    }

    fn hub(&self, topic: Topic) -> &Hub {
        match topic {
            Topic::GameEvents => &self.game_events,
            Topic::WheelEvents => &self.wheel_events,
            Topic::CardEffects => &self.card_effects,
        }
    }
}

/// Single-topic broadcast hub wrapper.
struct Hub {
    sender: broadcast::Sender<ServerEvent>,
}

impl Hub {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::new(8);
        let mut wheel = bus.subscribe(Topic::WheelEvents);
        let mut game = bus.subscribe(Topic::GameEvents);

        bus.publish(
            Topic::WheelEvents,
            ServerEvent::new(Some("sync".into()), "{}".into()),
        );

        let received = wheel.recv().await.unwrap();
        assert_eq!(received.event.as_deref(), Some("sync"));
        assert!(game.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(8);
        bus.publish(
            Topic::CardEffects,
            ServerEvent::new(Some("apply_effect".into()), "{}".into()),
        );
    }

    #[tokio::test]
    async fn per_topic_ordering_is_preserved() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe(Topic::WheelEvents);

        bus.publish(
            Topic::WheelEvents,
            ServerEvent::new(Some("sync".into()), "first".into()),
        );
        bus.publish(
            Topic::WheelEvents,
            ServerEvent::new(Some("sync".into()), "second".into()),
        );

        assert_eq!(rx.recv().await.unwrap().data, "first");
        assert_eq!(rx.recv().await.unwrap().data, "second");
    }
}
