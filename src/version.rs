//! Build tool version check
//!
//! The feature section syntax needs a minimum build tool version. A version
//! that cannot be detected only warns; a version that is too old is fatal.

use std::cmp::Ordering;
use std::fmt;

/// Minimum supported build tool version
pub const MIN_BUILD_TOOL_VERSION: Version = Version(5, 0, 3);

/// `major.minor.patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl Version {
    /// Parse the leading numeric components of a version string.
    ///
    /// Non-digit characters separate components, so `5.2.0b3` reads as
    /// 5.2.0 and `6.1` as 6.1.0.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u32>().ok());

        let major = parts.next()??;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Outcome of a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    Supported(Version),
    /// Version unknown; resolution continues
    Undetected,
}

/// Version check errors
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error(
        "An update to the build tool is required. Minimum version: {minimum}, current version: {current}. Update and try again."
    )]
    TooOld { minimum: Version, current: Version },
}

/// Check the reported build tool version against `minimum`
pub fn check_build_tool(current: Option<&str>, minimum: Version) -> Result<VersionCheck, VersionError> {
    let Some(current) = current.and_then(Version::parse) else {
        log::warn!("Can't detect build tool version");
        return Ok(VersionCheck::Undetected);
    };

    match current.cmp(&minimum) {
        Ordering::Less => Err(VersionError::TooOld { minimum, current }),
        _ => Ok(VersionCheck::Supported(current)),
    }
}
