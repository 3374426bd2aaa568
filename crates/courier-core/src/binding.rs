//! Binding element contract.
//!
//! A binding element is one reversible step applied to every message that
//! crosses the channel. Going out it *prepares for sending* (adds a nonce,
//! stamps a timestamp, signs); coming in it *prepares for receiving* (checks
//! and strips what its counterpart added). An element provides at most one
//! [`ProtectionKind`]; elements that provide none are pure transformations,
//! such as moving extension data in or out of extra fields.
//!
//! Elements are constructed once, owned by a single channel, and invoked
//! from every thread that uses it. Any mutable state they keep (a nonce
//! store, say) is theirs to synchronize.

use courier_proto::ProtectionKind;

use crate::{
    collaborators::MessageSerializer, env::Environment, error::BindingError,
    message::ProtocolMessage,
};

/// What an element did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOutcome {
    /// The element acted; its protection (if any) now covers the message
    Applied,

    /// The element does not apply to this message and left it untouched
    NotApplicable,
}

/// Channel facilities lent to elements for the duration of one call.
#[derive(Clone, Copy)]
pub struct BindingContext<'a> {
    /// The channel's serializer, for elements that work on wire fields
    pub serializer: &'a dyn MessageSerializer,

    /// Time and randomness
    pub env: &'a dyn Environment,
}

/// One step of the send/receive pipeline.
pub trait BindingElement: Send + Sync {
    /// Protection this element provides, or `None` for a pure
    /// transformation.
    fn protection(&self) -> Option<ProtectionKind>;

    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Transform an outgoing message.
    fn prepare_for_sending(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError>;

    /// Verify and undo the transformation on an incoming message.
    fn prepare_for_receiving(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError>;
}
