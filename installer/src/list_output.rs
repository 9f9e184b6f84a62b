//! Output formatting for the `platforms` command.
//!
//! Lists the platforms a release manifest covers in human-readable or JSON
//! form, marking the host platform when it is present.

use serde::Serialize;

use crate::artefact::manifest::DescriptorTable;
use crate::platform::PlatformKey;

/// Format the release table for human-readable output.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::manifest_parser::bundled_manifest;
/// use kiln_installer::list_output::format_human;
///
/// let table = bundled_manifest().expect("bundled manifest");
/// let output = format_human(&table, None);
/// assert!(output.contains("Linux/x86_64"));
/// ```
#[must_use]
pub fn format_human(table: &DescriptorTable, host: Option<&PlatformKey>) -> String {
    let mut output = format!(
        "{} {} is published for {} platform(s):\n",
        table.binary_name(),
        table.version(),
        table.len()
    );

    for (platform, descriptor) in table.iter() {
        let host_marker = if host == Some(platform) { " (host)" } else { "" };
        output.push('\n');
        output.push_str(&format!("  {platform}{host_marker}\n"));
        output.push_str(&format!("    url:     {}\n", descriptor.url));
        output.push_str(&format!("    sha256:  {}\n", descriptor.sha256));
        if descriptor.version != *table.version() {
            output.push_str(&format!("    version: {}\n", descriptor.version));
        }
    }

    output
}

/// Format the release table as JSON.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::manifest_parser::bundled_manifest;
/// use kiln_installer::list_output::format_json;
///
/// let table = bundled_manifest().expect("bundled manifest");
/// let json = format_json(&table, None);
/// assert!(json.contains("\"platforms\""));
/// ```
#[must_use]
pub fn format_json(table: &DescriptorTable, host: Option<&PlatformKey>) -> String {
    let json_data = ReleaseTableJson::from_table(table, host);

    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON-serializable representation of a release table.
#[derive(Debug, Serialize)]
pub struct ReleaseTableJson {
    /// Release version from the manifest.
    pub version: String,
    /// Name of the executable inside each archive.
    pub binary: String,
    /// One entry per published platform.
    pub platforms: Vec<PlatformJson>,
}

impl ReleaseTableJson {
    fn from_table(table: &DescriptorTable, host: Option<&PlatformKey>) -> Self {
        let platforms = table
            .iter()
            .map(|(platform, descriptor)| PlatformJson {
                os: platform.os.to_string(),
                arch: platform.arch.to_string(),
                host: host == Some(platform),
                url: descriptor.url.to_string(),
                sha256: descriptor.sha256.to_string(),
                version: descriptor.version.to_string(),
            })
            .collect();

        Self {
            version: table.version().to_string(),
            binary: table.binary_name().to_owned(),
            platforms,
        }
    }
}

/// JSON entry for one platform.
#[derive(Debug, Serialize)]
pub struct PlatformJson {
    /// Operating system family.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Whether this is the platform the installer is running on.
    pub host: bool,
    /// Download URL.
    pub url: String,
    /// Published SHA-256 digest.
    pub sha256: String,
    /// Release version for this platform.
    pub version: String,
}
