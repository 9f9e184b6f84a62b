//! Error types for the kiln installer.
//!
//! Each stage of the install pipeline has its own error type; this module
//! aggregates them into [`InstallerError`] and maps every variant onto the
//! process exit code reported by the CLI.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::artefact::manifest::ManifestError;
use crate::artefact::release_version::ReleaseVersion;
use crate::artefact::verification::IntegrityMismatch;
use crate::platform::PlatformKey;
use crate::smoke_check::PostInstallCheckError;
use thiserror::Error;

/// Exit code for configuration, manifest, and output failures.
pub const EXIT_CONFIGURATION: i32 = 1;
/// Exit code when the host has no published release.
pub const EXIT_UNSUPPORTED: i32 = 2;
/// Exit code for download failures.
pub const EXIT_DOWNLOAD: i32 = 3;
/// Exit code for checksum mismatches.
pub const EXIT_INTEGRITY: i32 = 4;
/// Exit code for extraction and installation failures.
pub const EXIT_EXTRACTION: i32 = 5;
/// Exit code for a failed post-install smoke check.
pub const EXIT_POST_INSTALL_CHECK: i32 = 6;

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The release table has no entry for the host platform.
    #[error("no kiln release for {platform}; supported platforms: {supported}")]
    UnsupportedPlatform {
        /// The detected host platform.
        platform: PlatformKey,
        /// Comma-separated list of platforms the manifest covers.
        supported: String,
    },

    /// No descriptor exists for the requested platform.
    #[error("kiln {version} has no release for {platform}")]
    NoMatchingRelease {
        /// The requested platform.
        platform: PlatformKey,
        /// The manifest's release version.
        version: ReleaseVersion,
    },

    /// The download stage failed.
    #[error("download stage failed: {0}")]
    Download(#[from] DownloadError),

    /// The downloaded archive did not match its published checksum.
    #[error("verification stage failed: {0}")]
    IntegrityMismatch(#[from] IntegrityMismatch),

    /// Extraction or installation into the destination failed.
    #[error("install stage failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The installed executable did not pass `--version`.
    #[error("post-install check failed: {0}")]
    PostInstallCheckFailed(#[from] PostInstallCheckError),

    /// The release manifest could not be loaded.
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    /// No destination directory could be determined.
    #[error("could not determine an install directory: {reason}; pass --bin-dir")]
    BinDirUnavailable {
        /// Why the default directory could not be resolved.
        reason: String,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Process exit code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiln_installer::error::InstallerError;
    /// use kiln_installer::platform::{CpuArch, OsFamily, PlatformKey};
    ///
    /// let err = InstallerError::UnsupportedPlatform {
    ///     platform: PlatformKey::new(OsFamily::Windows, CpuArch::X86_64),
    ///     supported: "Linux/x86_64".to_owned(),
    /// };
    /// assert_eq!(err.exit_code(), 2);
    /// ```
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedPlatform { .. } | Self::NoMatchingRelease { .. } => EXIT_UNSUPPORTED,
            Self::Download(_) => EXIT_DOWNLOAD,
            Self::IntegrityMismatch(_) => EXIT_INTEGRITY,
            Self::Extraction(_) => EXIT_EXTRACTION,
            Self::PostInstallCheckFailed(_) => EXIT_POST_INSTALL_CHECK,
            Self::Manifest(_) | Self::BinDirUnavailable { .. } | Self::WriteFailed { .. } => {
                EXIT_CONFIGURATION
            }
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
