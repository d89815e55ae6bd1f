//! Host version helpers.
//!
//! The driver targets two incompatible major versions of the host CMS.
//! Definitions may pin themselves to one of them; the matcher is configured
//! for exactly one.

use std::fmt;

use crate::errors::{DriverError, DriverResult};

/// Host major versions the built-in handlers exist for.
pub const SUPPORTED_VERSIONS: [u32; 2] = [7, 8];

/// A validated host major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostVersion(u32);

impl HostVersion {
    pub const V7: HostVersion = HostVersion(7);
    pub const V8: HostVersion = HostVersion(8);

    /// Validate a raw major version number.
    pub fn new(major: u32) -> DriverResult<Self> {
        if SUPPORTED_VERSIONS.contains(&major) {
            Ok(Self(major))
        } else {
            Err(DriverError::configuration(format!(
                "unsupported host version: {major}"
            )))
        }
    }

    /// Parse a version string such as `"8"` or `"v7"`.
    pub fn parse(s: &str) -> DriverResult<Self> {
        let digits = s.trim().trim_start_matches(['v', 'V']);
        let major = digits.parse::<u32>().map_err(|_| {
            DriverError::configuration(format!("unsupported host version: {s}"))
        })?;
        Self::new(major)
    }

    pub fn major(self) -> u32 {
        self.0
    }

    /// Whether this is the legacy major version, whose field values are
    /// wrapped in an entity language key.
    pub fn is_legacy(self) -> bool {
        self == Self::V7
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
