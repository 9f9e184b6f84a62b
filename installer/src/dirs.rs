//! Directory resolution abstraction for platform-specific paths.
//!
//! The default install directory is the platform's per-user executable
//! directory (`$XDG_BIN_HOME` or `~/.local/bin` on Linux). Platforms
//! without one fall back to `~/.local/bin` on Unix and to
//! `%LOCALAPPDATA%\kiln\bin` on Windows.

use crate::error::{InstallerError, Result};
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Source of per-user base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The platform's per-user executable directory, if it defines one.
    fn executable_dir(&self) -> Option<PathBuf>;

    /// The platform's per-user local data directory.
    fn data_local_dir(&self) -> Option<PathBuf>;
}

/// Base directories of the current user, via `directories-next`.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve the current user's directories.
    ///
    /// Returns `None` when no home directory can be found.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|inner| Self { inner })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.inner.home_dir().to_path_buf())
    }

    fn executable_dir(&self) -> Option<PathBuf> {
        self.inner.executable_dir().map(PathBuf::from)
    }

    fn data_local_dir(&self) -> Option<PathBuf> {
        Some(self.inner.data_local_dir().to_path_buf())
    }
}

/// Directory that receives `kiln` when `--bin-dir` is not given.
///
/// # Errors
///
/// Returns [`InstallerError::BinDirUnavailable`] if no candidate directory
/// exists or the directory is not valid UTF-8.
pub fn default_bin_dir(dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    let candidate = dirs
        .executable_dir()
        .or_else(|| fallback_bin_dir(dirs))
        .ok_or_else(|| InstallerError::BinDirUnavailable {
            reason: "no home directory found".to_owned(),
        })?;

    Utf8PathBuf::try_from(candidate).map_err(|e| InstallerError::BinDirUnavailable {
        reason: format!("{} is not valid UTF-8", e.as_path().display()),
    })
}

#[cfg(windows)]
fn fallback_bin_dir(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    dirs.data_local_dir().map(|d| d.join("kiln").join("bin"))
}

#[cfg(not(windows))]
fn fallback_bin_dir(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    dirs.home_dir().map(|h| h.join(".local").join("bin"))
}
