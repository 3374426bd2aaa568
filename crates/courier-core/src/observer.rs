//! Channel lifecycle hooks.
//!
//! Hosts that want to see traffic without wrapping the channel register a
//! [`ChannelObserver`]. The channel notifies every observer, in registration
//! order, at three points: just before an outgoing message enters the
//! binding pipeline, after an incoming message passes all checks, and when
//! an incoming message is rejected.
//!
//! Observers see messages but cannot veto them; that is what binding
//! elements are for.

use crate::{error::ProtocolViolation, message::ProtocolMessage};

/// Receives channel lifecycle notifications.
///
/// Thread-safe and shared behind `Arc<dyn ChannelObserver>`. Every method
/// defaults to doing nothing.
pub trait ChannelObserver: Send + Sync {
    /// An outgoing message is about to be prepared.
    fn on_sending(&self, _message: &dyn ProtocolMessage) {}

    /// An incoming message passed every check.
    fn on_received(&self, _message: &dyn ProtocolMessage) {}

    /// An incoming message was rejected.
    fn on_rejected(&self, _violation: &ProtocolViolation) {}
}
