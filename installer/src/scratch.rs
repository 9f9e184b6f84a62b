//! Scoped scratch workspace for archive extraction.
//!
//! Each install unpacks into a fresh temporary directory that is removed
//! when the [`ScratchWorkspace`] is dropped, on success and on error alike.
//! Live workspaces are also recorded in a process-wide registry so that an
//! interrupt handler can remove them before the process exits, since `Drop`
//! does not run when the process is terminated by a signal. Staging files
//! written next to the final executable are tracked in the same registry
//! through [`StagedFileGuard`].

use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

/// Exit status used after an interrupt, following the shell convention.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Prefix for scratch directory names.
const SCRATCH_PREFIX: &str = ".kiln-install-";

/// A temporary path that must not outlive an interrupted process.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LivePath {
    Dir(PathBuf),
    File(PathBuf),
}

impl LivePath {
    fn path(&self) -> &Path {
        match self {
            Self::Dir(path) | Self::File(path) => path,
        }
    }

    fn remove(&self) -> std::io::Result<()> {
        match self {
            Self::Dir(path) => std::fs::remove_dir_all(path),
            Self::File(path) => std::fs::remove_file(path),
        }
    }
}

static LIVE_WORKSPACES: Mutex<Vec<LivePath>> = Mutex::new(Vec::new());

fn live_workspaces() -> MutexGuard<'static, Vec<LivePath>> {
    LIVE_WORKSPACES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// A temporary directory owned by one install operation.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Create a new workspace under the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        debug!("created scratch workspace {}", dir.path().display());
        live_workspaces().push(LivePath::Dir(dir.path().to_path_buf()));
        Ok(Self { dir })
    }

    /// Path of the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        let path = self.dir.path();
        live_workspaces().retain(|live| live.path() != path);
        debug!("removing scratch workspace {}", path.display());
    }
}

/// Registration of a staging file for interrupt cleanup.
///
/// The file itself is owned elsewhere (usually by a
/// [`tempfile::NamedTempFile`]); dropping the guard only unregisters it.
#[derive(Debug)]
pub struct StagedFileGuard {
    path: PathBuf,
}

impl StagedFileGuard {
    /// Register `path` so that an interrupt removes it.
    #[must_use]
    pub fn track(path: &Path) -> Self {
        live_workspaces().push(LivePath::File(path.to_path_buf()));
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for StagedFileGuard {
    fn drop(&mut self) {
        live_workspaces().retain(|live| live.path() != self.path);
    }
}

/// Remove every live scratch workspace.
///
/// Returns the number of paths removed. Intended for interrupt handlers;
/// normal code paths rely on `Drop`.
pub fn remove_live_workspaces() -> usize {
    remove_matching(|_| true)
}

fn remove_matching(filter: impl Fn(&Path) -> bool) -> usize {
    let paths = {
        let mut live = live_workspaces();
        let (matched, kept): (Vec<LivePath>, Vec<LivePath>) =
            live.drain(..).partition(|live| filter(live.path()));
        *live = kept;
        matched
    };
    let mut removed = 0;
    for live in paths {
        match live.remove() {
            Ok(()) => removed += 1,
            Err(e) => warn!("failed to remove {}: {e}", live.path().display()),
        }
    }
    removed
}

/// Paths currently registered for interrupt cleanup.
#[cfg(test)]
pub(crate) fn live_paths() -> Vec<PathBuf> {
    live_workspaces()
        .iter()
        .map(|live| live.path().to_path_buf())
        .collect()
}

/// Install a Ctrl-C handler that removes live workspaces and exits with
/// [`EXIT_INTERRUPTED`].
///
/// # Errors
///
/// Returns an error if a handler is already installed.
pub fn install_interrupt_cleanup() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        remove_live_workspaces();
        std::process::exit(EXIT_INTERRUPTED);
    })
}
