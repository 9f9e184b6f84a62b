//! Install pipeline orchestration.
//!
//! One generic routine drives every platform: resolve the host, select its
//! descriptor, fetch, verify, install, and smoke-check. The stages run
//! strictly in order and the first failure ends the run; nothing is
//! retried.

use crate::artefact::download::ArtefactFetcher;
use crate::artefact::extraction::ArchiveFormat;
use crate::artefact::manifest::{DescriptorTable, ReleaseDescriptor, select_descriptor};
use crate::artefact::verification::verify;
use crate::error::Result;
use crate::output::{success_message, write_stderr_line};
use crate::platform::{PlatformKey, resolve_platform_for};
use crate::smoke_check::{CommandExecutor, verify_install};
use crate::stager::{InstalledArtifact, extract_and_install};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;
use std::io::Write;

/// Progress of one install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallStage {
    /// Nothing has been fetched yet.
    NotStarted,
    /// The archive bytes are in memory.
    Downloaded,
    /// The archive matched its published checksum.
    Verified,
    /// The executable is in the destination directory.
    Installed,
    /// The executable answered `--version`.
    Checked,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Downloaded => "downloaded",
            Self::Verified => "verified",
            Self::Installed => "installed",
            Self::Checked => "checked",
        };
        f.write_str(name)
    }
}

/// Inputs for one install run.
#[derive(Debug, Clone, Copy)]
pub struct InstallContext<'a> {
    /// Release table loaded from the manifest.
    pub table: &'a DescriptorTable,
    /// Platform to install for, normally [`PlatformKey::host`].
    pub host: &'a PlatformKey,
    /// Directory that receives the executable.
    pub bin_dir: &'a Utf8Path,
    /// Stop after installing without running `--version`.
    pub skip_check: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Collaborators with side effects outside the filesystem.
#[derive(Clone, Copy)]
pub struct InstallDeps<'a> {
    /// Downloads release archives.
    pub fetcher: &'a dyn ArtefactFetcher,
    /// Runs the installed executable.
    pub executor: &'a dyn CommandExecutor,
}

/// Outcome of a successful install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Platform the executable was installed for.
    pub platform: PlatformKey,
    /// Descriptor that was fetched.
    pub descriptor: ReleaseDescriptor,
    /// The installed executable.
    pub artifact: InstalledArtifact,
    /// Final stage reached: [`InstallStage::Checked`], or
    /// [`InstallStage::Installed`] when the check was skipped.
    pub stage: InstallStage,
    /// Output of `kiln --version`, if the check ran.
    pub version_output: Option<String>,
}

/// What an install run would do, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// Platform the executable would be installed for.
    pub platform: PlatformKey,
    /// Descriptor that would be fetched.
    pub descriptor: ReleaseDescriptor,
    /// Archive format inferred from the download URL.
    pub format: ArchiveFormat,
    /// Final path of the executable.
    pub destination: Utf8PathBuf,
}

/// Resolve the platform and descriptor for `context` without fetching.
///
/// # Errors
///
/// Returns [`crate::error::InstallerError::UnsupportedPlatform`] or
/// [`crate::error::InstallerError::NoMatchingRelease`] when the host is not
/// covered by the table.
pub fn plan_install(context: &InstallContext<'_>) -> Result<InstallPlan> {
    let platform = resolve_platform_for(context.table, context.host.clone())?;
    let descriptor = select_descriptor(context.table, &platform)?.clone();
    Ok(InstallPlan {
        format: ArchiveFormat::for_url(&descriptor.url),
        destination: context.bin_dir.join(context.table.binary_name()),
        platform,
        descriptor,
    })
}

/// Run every install stage in order.
///
/// Progress lines are written to `stderr` unless `context.quiet` is set.
///
/// # Errors
///
/// Returns the error of the first stage that fails. A failed post-install
/// check leaves the executable in place.
pub fn run_install(
    context: &InstallContext<'_>,
    deps: InstallDeps<'_>,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let mut stage = InstallStage::NotStarted;
    let result = run_stages(context, deps, &mut stage, stderr);
    if let Err(err) = &result {
        debug!("install failed after stage {stage}: {err}");
    }
    result
}

fn run_stages(
    context: &InstallContext<'_>,
    deps: InstallDeps<'_>,
    stage: &mut InstallStage,
    stderr: &mut dyn Write,
) -> Result<InstallReport> {
    let plan = plan_install(context)?;
    let InstallPlan {
        platform,
        descriptor,
        format,
        ..
    } = plan;
    let binary_name = context.table.binary_name();
    progress(
        context,
        stderr,
        format!("Installing {binary_name} {} for {platform}...", descriptor.version),
    );

    progress(context, stderr, format!("  Downloading {}", descriptor.url));
    let bytes = deps.fetcher.fetch(&descriptor.url)?;
    advance(stage, InstallStage::Downloaded);

    let bytes = verify(bytes, &descriptor.sha256)?;
    advance(stage, InstallStage::Verified);
    progress(context, stderr, format!("  Verified SHA-256 {}", descriptor.sha256));

    let artifact = extract_and_install(&bytes, &format, context.bin_dir, binary_name)?;
    advance(stage, InstallStage::Installed);
    progress(context, stderr, format!("  Installed {}", artifact.path));

    let version_output = if context.skip_check {
        progress(context, stderr, "  Skipping post-install check");
        None
    } else {
        let output = verify_install(context.bin_dir, binary_name, deps.executor)?;
        advance(stage, InstallStage::Checked);
        progress(context, stderr, format!("  {binary_name} --version: {output}"));
        Some(output)
    };

    progress(
        context,
        stderr,
        success_message(binary_name, &descriptor.version, &artifact.path),
    );

    Ok(InstallReport {
        platform,
        descriptor,
        artifact,
        stage: *stage,
        version_output,
    })
}

fn advance(stage: &mut InstallStage, next: InstallStage) {
    debug!("install stage {stage} -> {next}");
    *stage = next;
}

fn progress(context: &InstallContext<'_>, stderr: &mut dyn Write, message: impl fmt::Display) {
    if !context.quiet {
        write_stderr_line(stderr, message);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
