//! Release manifest schema and the platform descriptor table.
//!
//! A manifest lists one entry per published platform. Loading it produces a
//! [`DescriptorTable`]: a single lookup keyed by [`PlatformKey`] that drives
//! one generic install routine, so supporting a new platform is a data
//! change rather than a code change.

use super::download_url::DownloadUrl;
use super::release_version::ReleaseVersion;
use super::sha256_digest::Sha256Digest;
use crate::error::{InstallerError, Result};
use crate::platform::{CpuArch, OsFamily, PlatformKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Executable name installed when the manifest does not name one.
pub const DEFAULT_BINARY_NAME: &str = "kiln";

/// The on-disk release manifest.
///
/// ```toml
/// version = "0.63.0-rc.1"
///
/// [[platforms]]
/// os = "Linux"
/// arch = "x86_64"
/// url = "https://github.com/pivotal-cf/kiln/releases/download/0.63.0-rc.1/kiln-linux-0.63.0-rc.1.tar.gz"
/// sha256 = "116ed0b303fd6cdf6c5d327d805422c1a27b0ae839a46a2bb0e48e7cba7f3b5b"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseManifest {
    /// Version shared by every platform entry unless overridden.
    pub version: ReleaseVersion,
    /// Name of the executable inside each archive.
    #[serde(default = "default_binary_name")]
    pub binary: String,
    /// One entry per published platform.
    pub platforms: Vec<PlatformEntry>,
}

/// A single platform row in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformEntry {
    /// Operating system family.
    pub os: OsFamily,
    /// CPU architecture.
    pub arch: CpuArch,
    /// HTTPS location of the archive.
    pub url: DownloadUrl,
    /// Expected SHA-256 of the archive.
    pub sha256: Sha256Digest,
    /// Optional per-platform version override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ReleaseVersion>,
}

fn default_binary_name() -> String {
    DEFAULT_BINARY_NAME.to_owned()
}

/// Everything needed to fetch and verify one platform's artefact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDescriptor {
    /// HTTPS location of the archive.
    pub url: DownloadUrl,
    /// Expected SHA-256 of the archive.
    pub sha256: Sha256Digest,
    /// Version of the release the archive belongs to.
    pub version: ReleaseVersion,
}

/// Lookup from platform to release descriptor.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::manifest::{DescriptorTable, select_descriptor};
/// use kiln_installer::platform::{CpuArch, OsFamily, PlatformKey};
///
/// let toml = r#"
/// version = "1.0.0"
///
/// [[platforms]]
/// os = "Linux"
/// arch = "x86_64"
/// url = "https://example.test/kiln-linux.tar.gz"
/// sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// "#;
/// let table = DescriptorTable::from_toml(toml).expect("valid manifest");
/// let key = PlatformKey::new(OsFamily::Linux, CpuArch::X86_64);
/// let descriptor = select_descriptor(&table, &key).expect("published platform");
/// assert_eq!(descriptor.version.to_string(), "1.0.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    version: ReleaseVersion,
    binary: String,
    entries: BTreeMap<PlatformKey, ReleaseDescriptor>,
}

impl DescriptorTable {
    /// Build a table from a parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the manifest is empty, names an
    /// unusable binary, or lists the same platform twice.
    pub fn from_manifest(manifest: ReleaseManifest) -> std::result::Result<Self, ManifestError> {
        if manifest.platforms.is_empty() {
            return Err(ManifestError::NoPlatforms);
        }
        validate_binary_name(&manifest.binary)?;

        let mut entries = BTreeMap::new();
        for entry in manifest.platforms {
            let key = PlatformKey::new(entry.os, entry.arch);
            let descriptor = ReleaseDescriptor {
                url: entry.url,
                sha256: entry.sha256,
                version: entry.version.unwrap_or_else(|| manifest.version.clone()),
            };
            if entries.insert(key.clone(), descriptor).is_some() {
                return Err(ManifestError::DuplicatePlatform { platform: key });
            }
        }

        Ok(Self {
            version: manifest.version,
            binary: manifest.binary,
            entries,
        })
    }

    /// Parse a TOML manifest and build a table from it.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] on syntax or validation failures.
    pub fn from_toml(text: &str) -> std::result::Result<Self, ManifestError> {
        let manifest: ReleaseManifest = toml::from_str(text)?;
        Self::from_manifest(manifest)
    }

    /// Release version declared at the top of the manifest.
    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Name of the executable inside each archive.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        &self.binary
    }

    /// Whether the table has an entry for `key`.
    #[must_use]
    pub fn contains(&self, key: &PlatformKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up the descriptor for `key`.
    #[must_use]
    pub fn get(&self, key: &PlatformKey) -> Option<&ReleaseDescriptor> {
        self.entries.get(key)
    }

    /// Iterate over every platform and descriptor in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlatformKey, &ReleaseDescriptor)> {
        self.entries.iter()
    }

    /// Number of published platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty. Tables built from manifests never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comma-separated platform names, for error messages.
    #[must_use]
    pub fn platform_list(&self) -> String {
        self.entries
            .keys()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Select the descriptor published for `key`.
///
/// # Errors
///
/// Returns [`InstallerError::NoMatchingRelease`] when `key` is absent.
pub fn select_descriptor<'a>(
    table: &'a DescriptorTable,
    key: &PlatformKey,
) -> Result<&'a ReleaseDescriptor> {
    table
        .get(key)
        .ok_or_else(|| InstallerError::NoMatchingRelease {
            platform: key.clone(),
            version: table.version().clone(),
        })
}

/// Errors arising from loading a release manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML deserialization or field validation failed.
    #[error("manifest parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON deserialization or field validation failed.
    #[error("manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The manifest lists no platforms.
    #[error("manifest lists no platforms")]
    NoPlatforms,

    /// The same platform appears more than once.
    #[error("platform {platform} is listed more than once")]
    DuplicatePlatform {
        /// The repeated platform.
        platform: PlatformKey,
    },

    /// The binary name cannot be used as a file name.
    #[error("invalid binary name \"{name}\"")]
    InvalidBinaryName {
        /// The rejected name.
        name: String,
    },
}

fn validate_binary_name(name: &str) -> std::result::Result<(), ManifestError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        return Err(ManifestError::InvalidBinaryName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
