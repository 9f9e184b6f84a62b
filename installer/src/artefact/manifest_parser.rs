//! Release manifest loading.
//!
//! Manifests are TOML by default; a `.json` extension selects JSON. All
//! newtype validation (HTTPS URL, SHA-256 digest, semantic version) runs
//! during deserialization, so malformed fields are rejected at load time.
//! The manifest for the current kiln release is compiled in and used when
//! no path is supplied.

use super::manifest::{DescriptorTable, ManifestError, ReleaseManifest};
use camino::Utf8Path;
use log::debug;

/// The release manifest bundled with this installer.
pub const BUNDLED_MANIFEST: &str = include_str!("../../manifests/kiln.toml");

/// Serialization format of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// TOML document (the default).
    Toml,
    /// JSON document.
    Json,
}

impl ManifestFormat {
    /// Choose the format from a file extension, defaulting to TOML.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use kiln_installer::artefact::manifest_parser::ManifestFormat;
    ///
    /// assert_eq!(ManifestFormat::for_path(Utf8Path::new("kiln.json")), ManifestFormat::Json);
    /// assert_eq!(ManifestFormat::for_path(Utf8Path::new("kiln.toml")), ManifestFormat::Toml);
    /// ```
    #[must_use]
    pub fn for_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Parse manifest text into a [`DescriptorTable`].
///
/// # Errors
///
/// Returns [`ManifestError`] if the text is malformed or any field fails
/// validation.
pub fn parse_manifest(
    text: &str,
    format: ManifestFormat,
) -> Result<DescriptorTable, ManifestError> {
    let manifest: ReleaseManifest = match format {
        ManifestFormat::Toml => toml::from_str(text)?,
        ManifestFormat::Json => serde_json::from_str(text)?,
    };
    DescriptorTable::from_manifest(manifest)
}

/// Read and parse the manifest at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Read`] if the file cannot be read, or a parse
/// error as for [`parse_manifest`].
pub fn load_manifest(path: &Utf8Path) -> Result<DescriptorTable, ManifestError> {
    debug!("loading release manifest from {path}");
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_string(),
        source,
    })?;
    parse_manifest(&text, ManifestFormat::for_path(path))
}

/// Parse the bundled release manifest.
///
/// # Errors
///
/// Returns [`ManifestError`] only if the bundled manifest is itself
/// invalid.
pub fn bundled_manifest() -> Result<DescriptorTable, ManifestError> {
    parse_manifest(BUNDLED_MANIFEST, ManifestFormat::Toml)
}

/// Load the manifest at `path`, or the bundled manifest when `None`.
///
/// # Errors
///
/// Returns [`ManifestError`] as for [`load_manifest`].
pub fn load_or_bundled(path: Option<&Utf8Path>) -> Result<DescriptorTable, ManifestError> {
    match path {
        Some(path) => load_manifest(path),
        None => bundled_manifest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{CpuArch, OsFamily, PlatformKey};
    use camino::Utf8PathBuf;

    const VALID_JSON: &str = concat!(
        r#"{"version":"1.2.3","platforms":[{"os":"Linux","arch":"amd64","#,
        r#""url":"https://example.test/kiln-linux.tar.gz","#,
        r#""sha256":"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"}]}"#,
    );

    fn temp_manifest(name: &str, contents: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join(name)).expect("UTF-8 path");
        std::fs::write(&path, contents).expect("write manifest");
        (dir, path)
    }

    #[test]
    fn bundled_manifest_covers_intel_macos_and_linux() {
        let table = bundled_manifest().expect("bundled manifest is valid");
        assert_eq!(table.version().to_string(), "0.63.0-rc.1");
        assert!(table.contains(&PlatformKey::new(OsFamily::MacOs, CpuArch::X86_64)));
        assert!(table.contains(&PlatformKey::new(OsFamily::Linux, CpuArch::X86_64)));
        assert!(!table.contains(&PlatformKey::new(OsFamily::Linux, CpuArch::Arm64)));
        assert!(!table.contains(&PlatformKey::new(OsFamily::MacOs, CpuArch::Arm64)));
    }

    #[test]
    fn parses_json_manifest() {
        let table = parse_manifest(VALID_JSON, ManifestFormat::Json).expect("valid JSON");
        assert!(table.contains(&PlatformKey::new(OsFamily::Linux, CpuArch::X86_64)));
    }

    #[test]
    fn loads_manifest_by_extension() {
        let (_dir, path) = temp_manifest("release.json", VALID_JSON);
        let table = load_manifest(&path).expect("valid manifest file");
        assert_eq!(table.version().to_string(), "1.2.3");
    }

    #[test]
    fn json_text_in_toml_file_is_rejected() {
        let (_dir, path) = temp_manifest("release.toml", VALID_JSON);
        let err = load_manifest(&path).expect_err("format mismatch");
        assert!(matches!(err, ManifestError::Toml(_)), "got {err:?}");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_manifest(Utf8Path::new("/nonexistent/kiln.toml")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/kiln.toml"));
    }

    #[test]
    fn load_or_bundled_falls_back_to_bundled() {
        let table = load_or_bundled(None).expect("bundled manifest");
        assert_eq!(table.binary_name(), "kiln");
    }
}
