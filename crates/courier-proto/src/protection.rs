//! Message protection flags.
//!
//! A message declares the protections it cannot be trusted without, and the
//! channel records which protections its binding elements actually applied.
//! Both are [`Protections`] bitsets; a message is acceptable when its
//! required set is a subset of the applied set.
//!
//! The individual kinds form a dependency chain. Tamper protection is the
//! foundation: a timestamp or nonce that can be altered in transit protects
//! nothing. Expiration rests on tamper protection, and replay protection
//! rests on expiration, because a nonce store can only forget nonces once
//! messages carrying them would be rejected as expired anyway.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of protections (3 bits used)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Protections: u8 {
        /// Message cannot be altered without detection (signature)
        const TAMPER_PROTECTION = 0b0000_0001;

        /// Message is rejected once it is older than an allowed age
        const EXPIRATION = 0b0000_0010;

        /// Message is accepted at most once
        const REPLAY_PROTECTION = 0b0000_0100;
    }
}

impl Protections {
    /// Iterate the individual kinds in this set, lowest rank first.
    pub fn kinds(self) -> impl Iterator<Item = ProtectionKind> {
        ProtectionKind::ALL.into_iter().filter(move |kind| self.contains(kind.flag()))
    }
}

impl Default for Protections {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Protections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }

        let mut first = true;
        for kind in self.kinds() {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{kind}")?;
            first = false;
        }
        Ok(())
    }
}

/// A single protection a binding element can provide.
///
/// Kinds are totally ordered by [`rank`](ProtectionKind::rank). A kind is
/// only meaningful when every kind ranked below it is also provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtectionKind {
    /// Signature over the message fields
    TamperProtection,
    /// Creation timestamp checked against a maximum age
    Expiration,
    /// Single-use nonce
    ReplayProtection,
}

impl ProtectionKind {
    /// Every kind, lowest rank first.
    pub const ALL: [Self; 3] = [Self::TamperProtection, Self::Expiration, Self::ReplayProtection];

    /// Position in the dependency chain. Higher ranks depend on every lower
    /// rank.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::TamperProtection => 1,
            Self::Expiration => 2,
            Self::ReplayProtection => 3,
        }
    }

    /// The flag this kind occupies in a [`Protections`] set.
    #[must_use]
    pub const fn flag(self) -> Protections {
        match self {
            Self::TamperProtection => Protections::TAMPER_PROTECTION,
            Self::Expiration => Protections::EXPIRATION,
            Self::ReplayProtection => Protections::REPLAY_PROTECTION,
        }
    }

    /// Kinds that must also be configured for this kind to be meaningful.
    #[must_use]
    pub fn dependencies(self) -> Protections {
        ProtectionKind::ALL
            .into_iter()
            .filter(|other| other.rank() < self.rank())
            .fold(Protections::empty(), |acc, other| acc | other.flag())
    }
}

impl fmt::Display for ProtectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TamperProtection => "tamper-protection",
            Self::Expiration => "expiration",
            Self::ReplayProtection => "replay-protection",
        };
        f.write_str(name)
    }
}

impl From<ProtectionKind> for Protections {
    fn from(kind: ProtectionKind) -> Self {
        kind.flag()
    }
}
