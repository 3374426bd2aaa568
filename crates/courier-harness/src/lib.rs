//! Deterministic test harness for the courier message channel.
//!
//! Doubles for everything a channel consumes: an environment with a virtual
//! clock and seeded RNG, a loopback direct transport, a concrete message
//! type with its factory and serializer, and binding elements that record
//! the order they run in.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod elements;
pub mod messages;
pub mod observer;
pub mod sim_env;
pub mod sim_transport;

pub use elements::{ExtraFieldElement, FailingElement, OrderLog, RecordingElement};
pub use messages::{TestMessage, TestMessageFactory, TestSerializer};
pub use observer::{Event, RecordingObserver};
pub use sim_env::SimEnv;
pub use sim_transport::LoopbackTransport;
