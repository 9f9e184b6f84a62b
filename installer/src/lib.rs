//! kiln installer library.
//!
//! This crate fetches the prebuilt `kiln` executable for the host platform,
//! verifies it against a published SHA-256 checksum, installs it into a bin
//! directory, and smoke-tests it. It is used by the `kiln-installer` CLI
//! binary and can be consumed programmatically for testing or custom
//! installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Release manifest model, download, verification, extraction
//! - [`cli`] - Command-line argument definitions
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error taxonomy and exit codes
//! - [`list_output`] - Output formatting for the platform listing
//! - [`output`] - Progress, success, and dry-run messages
//! - [`pipeline`] - Install stage orchestration
//! - [`platform`] - Host platform detection
//! - [`scratch`] - Scoped extraction workspaces and interrupt cleanup
//! - [`smoke_check`] - Post-install `kiln --version` check
//! - [`stager`] - Installation of the extracted executable

pub mod artefact;
pub mod cli;
pub mod dirs;
pub mod error;
pub mod list_output;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod scratch;
pub mod smoke_check;
pub mod stager;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
