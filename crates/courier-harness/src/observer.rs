//! Observer that keeps a record of channel notifications.

use std::sync::{Mutex, PoisonError};

use courier_core::{error::ProtocolViolation, message::ProtocolMessage, observer::ChannelObserver};

/// Notification seen by a [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `on_sending` with the message type
    Sending(&'static str),
    /// `on_received` with the message type
    Received(&'static str),
    /// `on_rejected` with the rendered violation
    Rejected(String),
}

/// Records every notification in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    /// Observer with nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Events so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of rejections seen
    pub fn rejected_count(&self) -> usize {
        self.events().iter().filter(|event| matches!(event, Event::Rejected(_))).count()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl ChannelObserver for RecordingObserver {
    fn on_sending(&self, message: &dyn ProtocolMessage) {
        self.record(Event::Sending(message.message_type()));
    }

    fn on_received(&self, message: &dyn ProtocolMessage) {
        self.record(Event::Received(message.message_type()));
    }

    fn on_rejected(&self, violation: &ProtocolViolation) {
        self.record(Event::Rejected(violation.to_string()));
    }
}
