//! Element construction errors.

use thiserror::Error;

/// Signing key that cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyError {
    /// Zero-length key
    #[error("signing key is empty")]
    Empty,

    /// Key rejected by the MAC implementation
    #[error("signing key has an unusable length")]
    InvalidLength,

    /// Configured key is not valid hex
    #[error("signing key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
