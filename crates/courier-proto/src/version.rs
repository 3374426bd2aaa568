//! Protocol version negotiated for a message.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// `major.minor` protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
}

impl ProtocolVersion {
    /// Version 1.0
    pub const V1_0: Self = Self::new(1, 0);
    /// Version 1.1
    pub const V1_1: Self = Self::new(1, 1);
    /// Version 2.0
    pub const V2_0: Self = Self::new(2, 0);

    /// Create a version
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidVersion(s.to_string());

        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let version: ProtocolVersion = "2.0".parse().unwrap();
        assert_eq!(version, ProtocolVersion::V2_0);
        assert_eq!(version.to_string(), "2.0");
    }

    #[test]
    fn rejects_garbage() {
        assert!("2".parse::<ProtocolVersion>().is_err());
        assert!("two.zero".parse::<ProtocolVersion>().is_err());
        assert!("1.x".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn versions_order_numerically() {
        assert!(ProtocolVersion::V1_0 < ProtocolVersion::V1_1);
        assert!(ProtocolVersion::V1_1 < ProtocolVersion::V2_0);
        assert!(ProtocolVersion::new(1, 10) > ProtocolVersion::new(1, 9));
    }
}
