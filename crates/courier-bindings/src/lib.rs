//! Standard binding elements
//!
//! One element per protection kind:
//!
//! - [`SigningElement`]: tamper protection with HMAC-SHA256 over the
//!   message's canonical fields
//! - [`ExpirationElement`]: creation timestamps bounded by a maximum age and
//!   a clock skew allowance
//! - [`ReplayElement`]: single-use nonces remembered in a [`NonceStore`]
//!
//! A channel that requires replay protection must also carry expiration and
//! signing, since an unsigned nonce can be stripped and an unexpiring one
//! must be remembered forever. The channel enforces this at construction.
//!
//! All three read time and randomness from the channel's environment, never
//! from the system directly.

pub mod error;
pub mod expiration;
pub mod nonce_store;
pub mod replay;
pub mod signing;

pub use error::KeyError;
pub use expiration::{ExpirationConfig, ExpirationElement};
pub use nonce_store::{MemoryNonceStore, NonceStore};
pub use replay::{ReplayConfig, ReplayElement};
pub use signing::{SigningConfig, SigningElement};
