//! Runtime target identifiers.
//!
//! A pack declares the runtime it was built for as a family plus a version,
//! written as a single string such as `classic-4.8` or `modern-6.0`.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PackError, Result};

/// The runtime family a pack targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFamily {
    /// The legacy desktop runtime line.
    Classic,
    /// The current cross-platform runtime line.
    Modern,
    /// The portable API surface shared by classic and modern hosts.
    Standard,
    /// Discontinued profile for portable class libraries.
    Portable,
    /// Discontinued profile for constrained devices.
    Compact,
    /// Discontinued profile for embedded hosts.
    Lite,
}

impl RuntimeFamily {
    /// Canonical lowercase name used in target strings.
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeFamily::Classic => "classic",
            RuntimeFamily::Modern => "modern",
            RuntimeFamily::Standard => "standard",
            RuntimeFamily::Portable => "portable",
            RuntimeFamily::Compact => "compact",
            RuntimeFamily::Lite => "lite",
        }
    }

    /// True for families that can host a running test process. The standard
    /// surface and the discontinued profiles only exist as link targets.
    pub fn is_runnable(self) -> bool {
        matches!(self, RuntimeFamily::Classic | RuntimeFamily::Modern)
    }
}

impl fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeFamily {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "classic" => Ok(RuntimeFamily::Classic),
            "modern" => Ok(RuntimeFamily::Modern),
            "standard" => Ok(RuntimeFamily::Standard),
            "portable" => Ok(RuntimeFamily::Portable),
            "compact" => Ok(RuntimeFamily::Compact),
            "lite" => Ok(RuntimeFamily::Lite),
            _ => Err(PackError::InvalidTarget {
                value: s.to_string(),
            }),
        }
    }
}

/// A concrete runtime a pack was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeTarget {
    pub family: RuntimeFamily,
    pub version: Version,
}

impl RuntimeTarget {
    pub fn new(family: RuntimeFamily, version: Version) -> Self {
        RuntimeTarget { family, version }
    }

    /// Parses a target string such as `classic-4.8` or `modern-6.0.1`.
    ///
    /// Version strings may omit the minor or patch component; missing
    /// components read as zero.
    pub fn parse(text: &str) -> Result<Self> {
        let (family, version) = text
            .split_once('-')
            .ok_or_else(|| PackError::InvalidTarget {
                value: text.to_string(),
            })?;
        Ok(RuntimeTarget {
            family: family.parse()?,
            version: parse_lenient_version(version).ok_or_else(|| PackError::InvalidTarget {
                value: text.to_string(),
            })?,
        })
    }
}

impl fmt::Display for RuntimeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.version;
        if v.patch == 0 && v.pre.is_empty() && v.build.is_empty() {
            write!(f, "{}-{}.{}", self.family, v.major, v.minor)
        } else {
            write!(f, "{}-{v}", self.family)
        }
    }
}

impl FromStr for RuntimeTarget {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        RuntimeTarget::parse(s)
    }
}

impl Serialize for RuntimeTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RuntimeTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        RuntimeTarget::parse(&text).map_err(D::Error::custom)
    }
}

/// Parses `4`, `4.8`, or `4.8.1` into a full semver version.
fn parse_lenient_version(text: &str) -> Option<Version> {
    if text.is_empty() {
        return None;
    }
    if let Ok(version) = Version::parse(text) {
        return Some(version);
    }
    let mut parts = text.splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    Some(Version::new(major, minor, patch))
}
