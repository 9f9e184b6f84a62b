//! Release version newtype.
//!
//! Wraps a [`semver::Version`] so that manifest versions such as
//! `0.63.0-rc.1` are validated once at load time.

use super::error::{ArtefactError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated semantic version for a published release.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::release_version::ReleaseVersion;
///
/// let version = ReleaseVersion::try_from("0.63.0-rc.1").expect("valid version");
/// assert!(version.is_prerelease());
/// assert_eq!(version.to_string(), "0.63.0-rc.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion(semver::Version);

impl ReleaseVersion {
    /// Whether the version carries a pre-release suffix.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        let trimmed = value.trim().trim_start_matches('v');
        semver::Version::parse(trimmed)
            .map(Self)
            .map_err(|e| ArtefactError::InvalidReleaseVersion {
                value: value.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
