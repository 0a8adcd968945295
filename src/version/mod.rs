// src/version/mod.rs

//! Version handling for kernels, OS releases, and compilers
//!
//! Host version strings come in many shapes: `23.4.0` from a Darwin kernel,
//! `5.15.0-91-generic` from a distribution kernel, `9.3.1` from a compiler,
//! or a bare `3.79` from a tool requirement. All of them are normalized to a
//! `major.minor.patch` triple so comparisons are numeric, never textual.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` version with numeric ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a version from its components
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string
    ///
    /// Strict semver is tried first; anything else is normalized by reading
    /// up to three leading dot-separated numbers:
    /// - "20.1.0" → 20.1.0
    /// - "5.15.0-91-generic" → 5.15.0
    /// - "3.79" → 3.79.0
    /// - "14" → 14.0.0
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Ok(v) = semver::Version::parse(s) {
            return Ok(Self::new(v.major, v.minor, v.patch));
        }

        let numeric: String = s
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut parts = numeric.split('.').map(|p| p.parse::<u64>());

        let major = match parts.next() {
            Some(Ok(major)) => major,
            _ => {
                return Err(Error::ParseError(format!(
                    "Invalid version string: '{}'",
                    s
                )));
            }
        };
        let minor = parts.next().and_then(|p| p.ok()).unwrap_or(0);
        let patch = parts.next().and_then(|p| p.ok()).unwrap_or(0);

        Ok(Self::new(major, minor, patch))
    }

    /// Find and parse the first version-looking token in free-form text
    ///
    /// Used for `--version` banners such as `gcc (GCC) 11.4.0` or
    /// `GNU Make 4.3`.
    pub fn find_in(text: &str) -> Option<Self> {
        text.lines().next().and_then(|line| {
            line.split_whitespace()
                .filter(|part| part.chars().next().is_some_and(|c| c.is_ascii_digit()))
                .find_map(|part| Self::parse(part).ok())
        })
    }

    /// Whether both versions share the same major release
    pub fn same_major(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
