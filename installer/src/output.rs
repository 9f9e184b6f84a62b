//! User-facing text for the installer CLI.
//!
//! Progress, success, and dry-run messages are written to an injected
//! writer so that tests can capture them and `--quiet` can suppress them.

use crate::artefact::release_version::ReleaseVersion;
use crate::pipeline::InstallPlan;
use camino::Utf8Path;
use std::io::Write;

/// Write a line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Format a success message after installation.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use kiln_installer::artefact::release_version::ReleaseVersion;
/// use kiln_installer::output::success_message;
///
/// let version = ReleaseVersion::try_from("0.63.0-rc.1").expect("valid version");
/// let msg = success_message("kiln", &version, Utf8Path::new("/usr/local/bin/kiln"));
/// assert_eq!(msg, "Successfully installed kiln 0.63.0-rc.1 to /usr/local/bin/kiln");
/// ```
#[must_use]
pub fn success_message(binary_name: &str, version: &ReleaseVersion, path: &Utf8Path) -> String {
    format!("Successfully installed {binary_name} {version} to {path}")
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved install plan.
    pub plan: &'a InstallPlan,
    /// Manifest path, or `None` for the bundled manifest.
    pub manifest: Option<&'a Utf8Path>,
    /// Download timeout in seconds.
    pub timeout_secs: u64,
    /// Whether the post-install check is skipped.
    pub skip_check: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let manifest = self
            .manifest
            .map_or_else(|| "bundled".to_owned(), ToString::to_string);
        let descriptor = &self.plan.descriptor;
        [
            "Dry run - nothing will be downloaded or written".to_owned(),
            String::new(),
            format!("Manifest: {manifest}"),
            format!("Platform: {}", self.plan.platform),
            format!("Version: {}", descriptor.version),
            format!("URL: {}", descriptor.url),
            format!("SHA-256: {}", descriptor.sha256),
            format!("Archive format: {:?}", self.plan.format),
            format!("Destination: {}", self.plan.destination),
            format!("Download timeout: {}s", self.timeout_secs),
            format!("Skip check: {}", self.skip_check),
        ]
        .join("\n")
    }
}
