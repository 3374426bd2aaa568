//! Courier message channel
//!
//! Moves protocol messages between two parties over HTTP, either directly
//! (server to server) or indirectly (through the user's browser), applying
//! a configurable set of reversible binding elements on the way.
//!
//! # Architecture
//!
//! The channel is synchronous and owns no I/O. Serializing messages,
//! recognizing incoming ones, and performing direct HTTP exchanges are
//! delegated to collaborators supplied at construction. Clock and
//! randomness come from an [`Environment`], so signing, expiration, and
//! replay checks are deterministic under test.
//!
//! Every outgoing message runs the binding pipeline forward and every
//! incoming message runs it in reverse. Afterwards the channel checks that
//! the protections the message requires were all applied, which makes a
//! misconfigured channel fail loudly instead of sending unprotected
//! messages.
//!
//! # Components
//!
//! - [`channel`]: Channel, builder, and receive outcomes
//! - [`pipeline`]: Ordered, validated binding elements
//! - [`binding`]: Binding element contract
//! - [`message`]: Message contract and capabilities
//! - [`encoder`]: Redirect or form POST for indirect messages
//! - [`variant`]: Direct-message wire conventions per protocol family
//! - [`collaborators`]: Factory, serializer, and direct transport
//! - [`mod@env`]: Environment abstraction (time, RNG)
//! - [`error`]: Error taxonomy

pub mod binding;
pub mod channel;
pub mod collaborators;
pub mod encoder;
pub mod env;
pub mod error;
pub mod message;
pub mod observer;
pub mod ordering;
pub mod pipeline;
pub mod response;
pub mod variant;

pub use binding::{BindingContext, BindingElement, BindingOutcome};
pub use channel::{Channel, ChannelBuilder, ChannelConfig, Received};
pub use collaborators::{DirectWebRequestHandler, MessageFactory, MessageSerializer};
pub use encoder::{EncoderConfig, IndirectEncoder, IndirectEncoding};
pub use env::{Environment, SystemEnv};
pub use error::{
    BindingError, ChannelError, ConfigurationError, MessageValidationError, ProtocolViolation,
    TransportError, UsageError,
};
pub use message::{
    DirectedMessage, Expiring, ExtraData, ProtocolMessage, ReceivingEndpoint, ReplayProtected,
    TamperResistant,
};
pub use observer::ChannelObserver;
pub use pipeline::BindingPipeline;
pub use response::UserAgentResponse;
pub use variant::{FormUrlEncoded, KeyValueForm, ProtocolVariant};
