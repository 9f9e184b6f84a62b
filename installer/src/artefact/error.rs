//! Error types for release manifest values.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid release-manifest values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A release version is not a valid semantic version.
    #[error("invalid release version \"{value}\": {reason}")]
    InvalidReleaseVersion {
        /// The rejected version string.
        value: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// A download URL does not use HTTPS.
    #[error("download URL must use https: {url}")]
    InsecureUrl {
        /// The rejected URL.
        url: String,
    },

    /// A download URL is syntactically unusable.
    #[error("invalid download URL \"{url}\": {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// An operating system or architecture name is empty.
    #[error("invalid platform component: {reason}")]
    InvalidPlatform {
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
