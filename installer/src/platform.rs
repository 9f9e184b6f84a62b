//! Host platform detection and resolution.
//!
//! A [`PlatformKey`] pairs an operating system family with a CPU
//! architecture. The host key is read once from `std::env::consts` and then
//! checked against the release table: a host with no table entry is
//! rejected rather than mapped onto some other platform's artefact.

use crate::artefact::error::ArtefactError;
use crate::artefact::manifest::DescriptorTable;
use crate::error::{InstallerError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OsFamily {
    /// Apple macOS (`darwin`).
    MacOs,
    /// Linux.
    Linux,
    /// Microsoft Windows.
    Windows,
    /// Any other operating system, by its lowercase name.
    Other(String),
}

impl OsFamily {
    /// The operating system this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Self::MacOs,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Canonical name used in manifests and messages.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Windows => "Windows",
            Self::Other(name) => name,
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CpuArch {
    /// 64-bit Intel/AMD (`x86_64`, `amd64`).
    X86_64,
    /// 64-bit ARM (`arm64`, `aarch64`).
    Arm64,
    /// Any other architecture, by its lowercase name.
    Other(String),
}

impl CpuArch {
    /// The architecture this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_name(std::env::consts::ARCH)
    }

    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Self::X86_64,
            "aarch64" | "arm64" => Self::Arm64,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Canonical name used in manifests and messages.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
            Self::Other(name) => name,
        }
    }
}

macro_rules! named_component {
    ($ty:ty, $label:literal) => {
        impl FromStr for $ty {
            type Err = ArtefactError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ArtefactError::InvalidPlatform {
                        reason: concat!($label, " must not be empty").to_owned(),
                    });
                }
                Ok(Self::from_name(trimmed))
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ArtefactError;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_owned()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_component!(OsFamily, "operating system");
named_component!(CpuArch, "architecture");

/// An (operating system, architecture) pair identifying a release artefact.
///
/// # Examples
///
/// ```
/// use kiln_installer::platform::{CpuArch, OsFamily, PlatformKey};
///
/// let key = PlatformKey::new(OsFamily::Linux, CpuArch::X86_64);
/// assert_eq!(key.to_string(), "Linux/x86_64");
///
/// let parsed: PlatformKey = "darwin/amd64".parse().expect("valid platform");
/// assert_eq!(parsed.os, OsFamily::MacOs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatformKey {
    /// Operating system family.
    pub os: OsFamily,
    /// CPU architecture.
    pub arch: CpuArch,
}

impl PlatformKey {
    /// Construct a key from its components.
    #[must_use]
    pub fn new(os: OsFamily, arch: CpuArch) -> Self {
        Self { os, arch }
    }

    /// The platform this binary is running on.
    #[must_use]
    pub fn host() -> Self {
        Self::new(OsFamily::current(), CpuArch::current())
    }
}

impl FromStr for PlatformKey {
    type Err = ArtefactError;

    /// Parse an `os/arch` pair.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (os, arch) = s
            .split_once('/')
            .ok_or_else(|| ArtefactError::InvalidPlatform {
                reason: format!("expected \"os/arch\", got \"{s}\""),
            })?;
        Ok(Self::new(os.parse()?, arch.parse()?))
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Detect the host platform and confirm the release table covers it.
///
/// # Errors
///
/// Returns [`InstallerError::UnsupportedPlatform`] when the table has no
/// entry for the host.
pub fn resolve_platform(table: &DescriptorTable) -> Result<PlatformKey> {
    resolve_platform_for(table, PlatformKey::host())
}

/// Confirm that `host` is covered by the release table.
///
/// # Errors
///
/// Returns [`InstallerError::UnsupportedPlatform`] when the table has no
/// entry for `host`.
pub fn resolve_platform_for(table: &DescriptorTable, host: PlatformKey) -> Result<PlatformKey> {
    debug!("resolving host platform {host}");
    if table.contains(&host) {
        return Ok(host);
    }
    Err(InstallerError::UnsupportedPlatform {
        supported: table.platform_list(),
        platform: host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_table;
    use rstest::rstest;

    #[rstest]
    #[case::macos("macOS", OsFamily::MacOs)]
    #[case::darwin("darwin", OsFamily::MacOs)]
    #[case::linux_upper("LINUX", OsFamily::Linux)]
    #[case::windows("windows", OsFamily::Windows)]
    #[case::freebsd("FreeBSD", OsFamily::Other("freebsd".to_owned()))]
    fn parses_os_aliases(#[case] name: &str, #[case] expected: OsFamily) {
        assert_eq!(name.parse::<OsFamily>().expect("valid os"), expected);
    }

    #[rstest]
    #[case::x86_64("x86_64", CpuArch::X86_64)]
    #[case::amd64("amd64", CpuArch::X86_64)]
    #[case::aarch64("aarch64", CpuArch::Arm64)]
    #[case::arm64("arm64", CpuArch::Arm64)]
    #[case::riscv("riscv64", CpuArch::Other("riscv64".to_owned()))]
    fn parses_arch_aliases(#[case] name: &str, #[case] expected: CpuArch) {
        assert_eq!(name.parse::<CpuArch>().expect("valid arch"), expected);
    }

    #[test]
    fn rejects_empty_components() {
        assert!("".parse::<OsFamily>().is_err());
        assert!("  ".parse::<CpuArch>().is_err());
        assert!("linux".parse::<PlatformKey>().is_err());
    }

    #[test]
    fn host_matches_compile_target() {
        let host = PlatformKey::host();
        assert_eq!(host.os, OsFamily::from_name(std::env::consts::OS));
        assert_eq!(host.arch, CpuArch::from_name(std::env::consts::ARCH));
    }

    #[test]
    fn resolves_covered_host() {
        let table = sample_table();
        let host = PlatformKey::new(OsFamily::Linux, CpuArch::X86_64);
        let resolved = resolve_platform_for(&table, host.clone()).expect("covered host");
        assert_eq!(resolved, host);
    }

    fn table_covering(key: &PlatformKey) -> DescriptorTable {
        let toml = format!(
            concat!(
                "version = \"0.63.0-rc.1\"\n\n",
                "[[platforms]]\n",
                "os = \"{os}\"\n",
                "arch = \"{arch}\"\n",
                "url = \"https://example.test/kiln.tar.gz\"\n",
                "sha256 = \"116ed0b303fd6cdf6c5d327d805422c1a27b0ae839a46a2bb0e48e7cba7f3b5b\"\n",
            ),
            os = key.os,
            arch = key.arch,
        );
        DescriptorTable::from_toml(&toml).expect("valid manifest")
    }

    #[test]
    fn resolve_platform_detects_the_host() {
        let table = table_covering(&PlatformKey::host());
        let resolved = resolve_platform(&table).expect("host is covered");
        assert_eq!(resolved, PlatformKey::host());
    }

    #[test]
    fn resolve_platform_rejects_a_table_without_the_host() {
        let foreign = PlatformKey::new(OsFamily::Other("plan9".to_owned()), CpuArch::X86_64);
        let table = table_covering(&foreign);
        let err = resolve_platform(&table).expect_err("host is not covered");
        assert!(matches!(err, InstallerError::UnsupportedPlatform { .. }), "got {err:?}");
        assert_eq!(err.exit_code(), 2);
    }

    #[rstest]
    #[case::windows(PlatformKey::new(OsFamily::Windows, CpuArch::X86_64))]
    #[case::linux_arm(PlatformKey::new(OsFamily::Linux, CpuArch::Arm64))]
    fn rejects_uncovered_host(#[case] host: PlatformKey) {
        let table = sample_table();
        let err = resolve_platform_for(&table, host.clone()).expect_err("uncovered host");
        match err {
            InstallerError::UnsupportedPlatform {
                platform,
                supported,
            } => {
                assert_eq!(platform, host);
                assert!(supported.contains("Linux/x86_64"), "supported: {supported}");
            }
            other => panic!("expected UnsupportedPlatform, got {other:?}"),
        }
    }
}
