//! OS release numbers
//!
//! Releases are plain integers that only ever increase. Zero is reserved for
//! "not installed", which is what a subscription's old version is reset to
//! when its bundle is missing from the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An OS release number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u32);

impl Version {
    /// The version of a bundle that is not installed
    pub const NOT_INSTALLED: Self = Self(0);

    #[must_use]
    pub const fn new(release: u32) -> Self {
        Self(release)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this names a real installed release
    #[must_use]
    pub const fn is_installed(self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for Version {
    fn from(release: u32) -> Self {
        Self(release)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_strings() {
        assert_eq!("31870".parse::<Version>().unwrap(), Version(31870));
        assert_eq!(" 10\n".parse::<Version>().unwrap(), Version(10));
        assert!("ten".parse::<Version>().is_err());
    }

    #[test]
    fn zero_is_not_installed() {
        assert!(!Version::NOT_INSTALLED.is_installed());
        assert!(Version(1).is_installed());
        assert!(Version(10) < Version(11));
    }
}
