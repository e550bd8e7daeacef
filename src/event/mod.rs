//! Per-design event bus: topics, payloads, suppression-aware dispatch.

pub mod bus;
pub mod events;

pub use bus::{EventBus, Notification, SubscriberId};
pub use events::{EventTopic, ModelEvent};
