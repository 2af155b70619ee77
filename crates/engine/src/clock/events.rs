//! Clock events and the subscription registry that dispatches them.
//!
//! Listeners receive the clock mutably, so they may start or stop timers,
//! subscribe further listeners or move the clock while an event is being
//! delivered. The registry hands a listener out for the duration of its call
//! and takes it back afterwards; anything unsubscribed in between is dropped.

use std::fmt;

use abduction_domain::NormalizedGameDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::timer::TimerId;
use super::GameClock;

/// Callback invoked for clock events.
pub type Listener = Box<dyn FnMut(&mut GameClock, &ClockEvent)>;

// =============================================================================
// Events
// =============================================================================

/// Which date component rolled over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverKind {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl RolloverKind {
    /// Event name as used by scripts and logs (e.g., "hourRollover").
    pub fn event_name(&self) -> &'static str {
        match self {
            RolloverKind::Minute => "minuteRollover",
            RolloverKind::Hour => "hourRollover",
            RolloverKind::Day => "dayRollover",
            RolloverKind::Month => "monthRollover",
            RolloverKind::Year => "yearRollover",
        }
    }
}

impl fmt::Display for RolloverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    /// A date component changed because the clock ticked.
    Rollover {
        kind: RolloverKind,
        date: NormalizedGameDate,
    },
    /// A timer fired; `data` is whatever was attached to it.
    Timer {
        timer: TimerId,
        data: Option<Value>,
    },
}

impl ClockEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClockEvent::Rollover { kind, .. } => kind.event_name(),
            ClockEvent::Timer { .. } => "timer",
        }
    }

    pub(crate) fn topic(&self) -> Topic {
        match self {
            ClockEvent::Rollover { kind, .. } => Topic::Rollover(*kind),
            ClockEvent::Timer { timer, .. } => Topic::Timer(*timer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Topic {
    Rollover(RolloverKind),
    Timer(TimerId),
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Handle returned by `subscribe`/`on_timer`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    /// `None` while the listener is out being called.
    listener: Option<Listener>,
}

/// Registration-ordered listener registry.
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn subscribe(&mut self, topic: Topic, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            topic,
            listener: Some(listener),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Drop every listener on `topic`; returns how many were removed.
    pub fn unsubscribe_topic(&mut self, topic: Topic) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.topic != topic);
        before - self.subscriptions.len()
    }

    /// Snapshot of the listeners on `topic`, in registration order.
    pub fn subscribers(&self, topic: Topic) -> Vec<SubscriptionId> {
        self.subscriptions
            .iter()
            .filter(|s| s.topic == topic)
            .map(|s| s.id)
            .collect()
    }

    /// Hand out a listener for calling. `None` if it is gone or already out.
    pub fn take(&mut self, id: SubscriptionId) -> Option<Listener> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| s.listener.take())
    }

    /// Return a listener after its call, unless it was unsubscribed meanwhile.
    pub fn restore(&mut self, id: SubscriptionId, listener: Listener) {
        if let Some(subscription) = self.subscriptions.iter_mut().find(|s| s.id == id) {
            subscription.listener = Some(listener);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Box::new(|_: &mut GameClock, _: &ClockEvent| {})
    }

    #[test]
    fn event_names() {
        assert_eq!(RolloverKind::Minute.event_name(), "minuteRollover");
        assert_eq!(RolloverKind::Year.to_string(), "yearRollover");
    }

    #[test]
    fn subscribers_in_registration_order() {
        let mut bus = EventBus::default();
        let hour = Topic::Rollover(RolloverKind::Hour);
        let a = bus.subscribe(hour, noop());
        let _day = bus.subscribe(Topic::Rollover(RolloverKind::Day), noop());
        let b = bus.subscribe(hour, noop());

        assert_eq!(bus.subscribers(hour), vec![a, b]);
        assert_eq!(bus.subscribers(hour).len(), 2);
    }

    #[test]
    fn unsubscribe_removes_once() {
        let mut bus = EventBus::default();
        let id = bus.subscribe(Topic::Rollover(RolloverKind::Minute), noop());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn taken_listener_is_not_handed_out_twice() {
        let mut bus = EventBus::default();
        let id = bus.subscribe(Topic::Rollover(RolloverKind::Minute), noop());

        let listener = bus.take(id).unwrap();
        assert!(bus.take(id).is_none());
        bus.restore(id, listener);
        assert!(bus.take(id).is_some());
    }

    #[test]
    fn restore_after_unsubscribe_drops_listener() {
        let mut bus = EventBus::default();
        let topic = Topic::Rollover(RolloverKind::Day);
        let id = bus.subscribe(topic, noop());

        let listener = bus.take(id).unwrap();
        bus.unsubscribe(id);
        bus.restore(id, listener);
        assert!(bus.subscribers(topic).is_empty());
    }
}
