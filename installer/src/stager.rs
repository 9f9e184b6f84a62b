//! Installation of the extracted executable.
//!
//! The archive is unpacked into a [`ScratchWorkspace`], the single entry
//! named after the executable is located, and it is copied into the
//! destination directory through a temporary file that is renamed into
//! place. A reader of the destination therefore sees either the previous
//! executable or the new one, never a partial write.

use crate::artefact::extraction::{ArtefactExtractor, ExtractionError};
use crate::artefact::sha256_digest::Sha256Digest;
use crate::scratch::{ScratchWorkspace, StagedFileGuard};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prefix for the temporary file written next to the final executable.
const STAGING_PREFIX: &str = ".kiln-";

/// Permission bits applied to the installed executable on Unix.
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// The executable placed in the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    /// Final path of the executable.
    pub path: Utf8PathBuf,
    /// SHA-256 of the installed file.
    pub sha256: Sha256Digest,
}

/// Unpack `archive` and install the entry named `binary_name` into
/// `destination_dir`.
///
/// The destination directory is created if missing. Running this twice on
/// the same archive leaves the same file with the same permissions.
///
/// # Errors
///
/// Returns [`ExtractionError`] if the archive cannot be unpacked, contains
/// no entry or several entries named `binary_name`, or if the destination
/// cannot be written.
pub fn extract_and_install(
    archive: &[u8],
    extractor: &dyn ArtefactExtractor,
    destination_dir: &Utf8Path,
    binary_name: &str,
) -> Result<InstalledArtifact, ExtractionError> {
    let workspace = ScratchWorkspace::new()?;
    let files = extractor.extract(archive, workspace.path())?;
    let entry = locate_entry(&files, binary_name)?;
    debug!("located {binary_name} at {} in archive", entry.display());

    let contents = fs::read(workspace.path().join(entry))?;
    let path = destination_dir.join(binary_name);
    persist_executable(&contents, destination_dir, &path).map_err(|source| {
        ExtractionError::Install {
            path: path.to_string(),
            source,
        }
    })?;

    info!("installed {path}");
    Ok(InstalledArtifact {
        path,
        sha256: Sha256Digest::of_bytes(&contents),
    })
}

/// Find the single extracted file whose name is `binary_name`.
fn locate_entry<'a>(files: &'a [PathBuf], binary_name: &str) -> Result<&'a Path, ExtractionError> {
    let mut matches = files
        .iter()
        .filter(|file| file.file_name().is_some_and(|name| name == binary_name));

    let Some(first) = matches.next() else {
        return Err(ExtractionError::MissingEntry {
            name: binary_name.to_owned(),
        });
    };

    let others: Vec<&PathBuf> = matches.collect();
    if others.is_empty() {
        return Ok(first);
    }

    let paths = std::iter::once(first)
        .chain(others)
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ExtractionError::AmbiguousEntry {
        name: binary_name.to_owned(),
        paths,
    })
}

/// Write `contents` to a temporary file in `dir`, mark it executable, and
/// rename it over `target`.
///
/// The temporary file is registered for interrupt cleanup until it has been
/// renamed.
fn persist_executable(contents: &[u8], dir: &Utf8Path, target: &Utf8Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)?;
    let _tracked = StagedFileGuard::track(staged.path());
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    set_executable(staged.path())?;
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::extraction::{ArchiveFormat, MockArtefactExtractor};
    use crate::test_utils::{ArchiveEntry, tar_gz_archive};
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    const KILN: &[u8] = b"#!/bin/sh\necho kiln 0.63.0-rc.1\n";

    fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp dir")
    }

    fn release_archive() -> Vec<u8> {
        tar_gz_archive(&[
            ArchiveEntry::file("kiln-linux/kiln", KILN, 0o644),
            ArchiveEntry::file("kiln-linux/LICENSE", b"Apache-2.0", 0o644),
        ])
    }

    #[test]
    fn installs_nested_entry_into_destination() {
        let dest = tempfile::tempdir().expect("temp dir");
        let dest_path = utf8_dir(&dest).join("bin");

        let installed =
            extract_and_install(&release_archive(), &ArchiveFormat::TarGz, &dest_path, "kiln")
                .expect("install");

        assert_eq!(installed.path, dest_path.join("kiln"));
        assert_eq!(installed.sha256, Sha256Digest::of_bytes(KILN));
        assert_eq!(fs::read(&installed.path).expect("installed file"), KILN);
    }

    #[cfg(unix)]
    #[test]
    fn installed_file_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dest = tempfile::tempdir().expect("temp dir");
        let installed =
            extract_and_install(&release_archive(), &ArchiveFormat::TarGz, &utf8_dir(&dest), "kiln")
                .expect("install");
        let mode = fs::metadata(&installed.path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, EXECUTABLE_MODE);
    }

    #[test]
    fn repeated_install_is_idempotent() {
        let dest = tempfile::tempdir().expect("temp dir");
        let dest_path = utf8_dir(&dest);
        let scratch_dirs = Arc::new(Mutex::new(Vec::new()));

        let mut extractor = MockArtefactExtractor::new();
        let seen = Arc::clone(&scratch_dirs);
        extractor.expect_extract().times(2).returning(move |archive, dir| {
            seen.lock().expect("lock").push(dir.to_path_buf());
            ArchiveFormat::TarGz.extract(archive, dir)
        });

        let archive = release_archive();
        let first = extract_and_install(&archive, &extractor, &dest_path, "kiln").expect("first");
        let first_meta = fs::metadata(&first.path).expect("metadata");
        let second = extract_and_install(&archive, &extractor, &dest_path, "kiln").expect("second");
        let second_meta = fs::metadata(&second.path).expect("metadata");

        assert_eq!(first, second);
        assert_eq!(first_meta.permissions(), second_meta.permissions());
        for dir in scratch_dirs.lock().expect("lock").iter() {
            assert!(!dir.exists(), "scratch dir left behind: {}", dir.display());
        }

        let names: Vec<_> = fs::read_dir(dest.path())
            .expect("read dest")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("kiln")]);
    }

    #[test]
    fn staging_file_is_unregistered_after_install() {
        let dest = tempfile::tempdir().expect("temp dir");
        let dest_path = utf8_dir(&dest);
        extract_and_install(&release_archive(), &ArchiveFormat::TarGz, &dest_path, "kiln")
            .expect("install");

        let leftover: Vec<PathBuf> = crate::scratch::live_paths()
            .into_iter()
            .filter(|path| path.starts_with(dest.path()))
            .collect();
        assert!(leftover.is_empty(), "still registered: {leftover:?}");
    }

    #[test]
    fn missing_entry_is_reported() {
        let dest = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz_archive(&[ArchiveEntry::file("README.md", b"docs", 0o644)]);
        let err = extract_and_install(&archive, &ArchiveFormat::TarGz, &utf8_dir(&dest), "kiln")
            .expect_err("no kiln entry");
        assert!(matches!(err, ExtractionError::MissingEntry { ref name } if name == "kiln"));
        assert!(!dest.path().join("kiln").exists());
    }

    #[test]
    fn ambiguous_entries_are_reported() {
        let dest = tempfile::tempdir().expect("temp dir");
        let archive = tar_gz_archive(&[
            ArchiveEntry::file("a/kiln", KILN, 0o755),
            ArchiveEntry::file("b/kiln", KILN, 0o755),
        ]);
        let err = extract_and_install(&archive, &ArchiveFormat::TarGz, &utf8_dir(&dest), "kiln")
            .expect_err("two kiln entries");
        match err {
            ExtractionError::AmbiguousEntry { paths, .. } => {
                assert!(paths.contains("a/kiln") && paths.contains("b/kiln"), "paths: {paths}");
            }
            other => panic!("expected AmbiguousEntry, got {other:?}"),
        }
    }

    #[rstest]
    #[case::prefix_only(&["kiln-docs/README.md"])]
    #[case::suffix_only(&["bin/kiln.exe"])]
    fn similar_names_do_not_match(#[case] paths: &[&str]) {
        let files: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        assert!(matches!(
            locate_entry(&files, "kiln"),
            Err(ExtractionError::MissingEntry { .. })
        ));
    }

    #[test]
    fn extractor_failure_leaves_destination_untouched() {
        let dest = tempfile::tempdir().expect("temp dir");
        let mut extractor = MockArtefactExtractor::new();
        extractor
            .expect_extract()
            .returning(|_, _| Err(ExtractionError::EmptyArchive));

        let err = extract_and_install(b"", &extractor, &utf8_dir(&dest), "kiln")
            .expect_err("extraction fails");
        assert!(matches!(err, ExtractionError::EmptyArchive));
        assert_eq!(fs::read_dir(dest.path()).expect("read dest").count(), 0);
    }
}
