//! Release manifest model, download, verification, and extraction.
//!
//! This module implements the type-safe domain model for prebuilt kiln
//! release artefacts:
//!
//! # Sub-modules
//!
//! - [`error`] - Semantic error types for manifest value validation.
//! - [`download_url`] - HTTPS download URL newtype (`DownloadUrl`).
//! - [`release_version`] - Semantic version newtype (`ReleaseVersion`).
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`manifest`] - Manifest schema and the platform `DescriptorTable`.
//! - [`manifest_parser`] - TOML/JSON manifest loading and the bundled manifest.
//! - [`download`] - Artefact fetch trait and HTTP implementation.
//! - [`verification`] - SHA-256 verification of downloaded bytes.
//! - [`extraction`] - Archive extraction with path traversal protection.

pub mod download;
pub mod download_url;
pub mod error;
pub mod extraction;
pub mod manifest;
pub mod manifest_parser;
pub mod release_version;
pub mod sha256_digest;
pub mod verification;
