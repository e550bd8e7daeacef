//! Event bus: subscription-ordered delivery with nested suppression.
//!
//! One [`EventBus`] serves one design root. Dispatch is fully synchronous:
//! [`EventBus::emit`] invokes every matching subscriber before returning.
//! Compound operations raise the suppression counter so listeners never
//! observe a half-finished intermediate state; each `suppress` must be matched
//! by one `resume` (the counter nests, a boolean flag would not).

use tracing::trace;

use super::events::{EventTopic, ModelEvent};

/// Identifies one subscription for later removal.
pub type SubscriberId = u64;

/// One delivered event with its bus-wide monotonically increasing id.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Monotonically increasing delivery id.
    pub id: u64,
    /// The event payload.
    pub event: ModelEvent,
}

type Callback = Box<dyn FnMut(&Notification)>;

struct Subscriber {
    id: SubscriberId,
    topic: Option<EventTopic>,
    callback: Callback,
}

/// Named-event publish/subscribe with a nest-safe suppression counter.
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_subscriber: SubscriberId,
    next_notification: u64,
    suppress_depth: u32,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_subscriber: 1,
            next_notification: 1,
            suppress_depth: 0,
        }
    }

    /// Subscribe to one topic, or to every event with `None`.
    ///
    /// Subscribers are invoked in subscription order. Whatever state the
    /// callback needs travels in its captures.
    pub fn subscribe(
        &mut self,
        topic: Option<EventTopic>,
        callback: impl FnMut(&Notification) + 'static,
    ) -> SubscriberId {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.subscribers.push(Subscriber {
            id,
            topic,
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Raise the suppression counter.
    pub fn suppress(&mut self) {
        self.suppress_depth += 1;
    }

    /// Lower the suppression counter. Must pair with a prior `suppress`.
    pub fn resume(&mut self) {
        debug_assert!(self.suppress_depth > 0, "resume without matching suppress");
        self.suppress_depth = self.suppress_depth.saturating_sub(1);
    }

    /// Whether emits are currently being dropped.
    pub fn is_suppressed(&self) -> bool {
        self.suppress_depth > 0
    }

    /// Deliver an event to every matching subscriber, in subscription order.
    ///
    /// Dropped entirely while suppressed; suppressed events are not queued.
    pub fn emit(&mut self, event: ModelEvent) {
        if self.is_suppressed() {
            trace!(event = event.name(), "event suppressed");
            return;
        }
        let notification = Notification {
            id: self.next_notification,
            event,
        };
        self.next_notification += 1;
        trace!(
            event = notification.event.name(),
            id = notification.id,
            "emit"
        );
        for subscriber in &mut self.subscribers {
            let matches = subscriber
                .topic
                .map_or(true, |t| t == notification.event.topic());
            if matches {
                (subscriber.callback)(&notification);
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("next_notification", &self.next_notification)
            .field("suppress_depth", &self.suppress_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use slotmap::SlotMap;

    use super::*;
    use crate::tree::node::NodeId;

    fn design_reset() -> ModelEvent {
        let mut sm: SlotMap<NodeId, ()> = SlotMap::with_key();
        let design = sm.insert(());
        ModelEvent::DesignReset { design }
    }

    fn selection_cleared() -> ModelEvent {
        ModelEvent::SelectionChanged {
            node: None,
            uid: None,
        }
    }

    #[test]
    fn delivers_to_subscriber() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(None, move |n| sink.borrow_mut().push(n.event.name()));
        bus.emit(design_reset());
        assert_eq!(*seen.borrow(), vec!["DesignReset"]);
    }

    #[test]
    fn topic_filter() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(Some(EventTopic::SelectionChanged), move |n| {
            sink.borrow_mut().push(n.event.name())
        });
        bus.emit(design_reset());
        bus.emit(selection_cleared());
        assert_eq!(*seen.borrow(), vec!["SelectionChanged"]);
    }

    #[test]
    fn delivery_in_subscription_order() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&seen);
        bus.subscribe(None, move |_| first.borrow_mut().push("first"));
        let second = Rc::clone(&seen);
        bus.subscribe(None, move |_| second.borrow_mut().push("second"));
        bus.emit(design_reset());
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn notification_ids_increase() {
        let mut bus = EventBus::new();
        let ids = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&ids);
        bus.subscribe(None, move |n| sink.borrow_mut().push(n.id));
        bus.emit(design_reset());
        bus.emit(selection_cleared());
        bus.emit(design_reset());
        let ids = ids.borrow();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn suppression_drops_events() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        bus.subscribe(None, move |_| *sink.borrow_mut() += 1);

        bus.suppress();
        bus.emit(design_reset());
        bus.resume();
        assert_eq!(*count.borrow(), 0);

        bus.emit(design_reset());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn suppression_nests() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        bus.subscribe(None, move |_| *sink.borrow_mut() += 1);

        bus.suppress();
        bus.suppress();
        bus.resume();
        assert!(bus.is_suppressed());
        bus.emit(design_reset());
        bus.resume();
        assert!(!bus.is_suppressed());
        bus.emit(design_reset());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = bus.subscribe(None, move |_| *sink.borrow_mut() += 1);
        bus.emit(design_reset());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(design_reset());
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
