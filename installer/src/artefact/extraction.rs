//! Archive extraction for release artefacts.
//!
//! Unpacks `.tar.gz` and `.tar.zst` archives held in memory into a
//! directory, validating every entry path first to prevent zip-slip
//! attacks. Only regular files and directories are materialised; links are
//! rejected because they could redirect later entries outside the
//! destination. Metadata records such as pax global headers are skipped.

use super::download_url::DownloadUrl;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Compression wrapped around the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar (`.tar.gz`, `.tgz`).
    TarGz,
    /// Zstandard-compressed tar (`.tar.zst`).
    TarZst,
}

impl ArchiveFormat {
    /// Infer the format from the URL's file name.
    ///
    /// Unknown suffixes are treated as gzip, which is how kiln releases are
    /// published.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiln_installer::artefact::download_url::DownloadUrl;
    /// use kiln_installer::artefact::extraction::ArchiveFormat;
    ///
    /// let url = DownloadUrl::try_from("https://example.test/kiln.tar.zst").expect("valid URL");
    /// assert_eq!(ArchiveFormat::for_url(&url), ArchiveFormat::TarZst);
    /// ```
    #[must_use]
    pub fn for_url(url: &DownloadUrl) -> Self {
        let name = url.file_name().unwrap_or_default().to_ascii_lowercase();
        if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Self::TarZst
        } else {
            Self::TarGz
        }
    }

    fn decoder<'a>(self, archive: &'a [u8]) -> Result<Box<dyn Read + 'a>, ExtractionError> {
        match self {
            Self::TarGz => Ok(Box::new(flate2::read::GzDecoder::new(archive))),
            Self::TarZst => {
                let decoder =
                    zstd::Decoder::new(archive).map_err(|e| ExtractionError::Malformed {
                        reason: e.to_string(),
                    })?;
                Ok(Box::new(decoder))
            }
        }
    }
}

/// Trait for extracting artefact archives, enabling test doubles.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Extract `archive` into `dest_dir`.
    ///
    /// Returns the paths, relative to `dest_dir`, of every regular file
    /// that was written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::EmptyArchive`]
    /// if no files are found, and [`ExtractionError::Malformed`] if the
    /// archive cannot be decoded.
    fn extract(&self, archive: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction and installation.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error while writing extracted or installed files.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive could not be decoded.
    #[error("malformed archive: {reason}")]
    Malformed {
        /// Description of the decoding failure.
        reason: String,
    },

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains a link or device entry.
    #[error("unsupported archive entry type for {path}")]
    UnsupportedEntry {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,

    /// The expected executable is not in the archive.
    #[error("archive does not contain an entry named {name}")]
    MissingEntry {
        /// The executable name that was searched for.
        name: String,
    },

    /// More than one entry carries the executable name.
    #[error("archive contains more than one entry named {name}: {paths}")]
    AmbiguousEntry {
        /// The executable name that was searched for.
        name: String,
        /// The matching archive paths.
        paths: String,
    },

    /// Writing the executable into the destination failed.
    #[error("failed to install {path}: {source}")]
    Install {
        /// The destination path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ArtefactExtractor for ArchiveFormat {
    fn extract(&self, archive: &[u8], dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let mut archive = tar::Archive::new(self.decoder(archive)?);
        let entries = archive.entries().map_err(malformed)?;
        let mut extracted = Vec::new();

        for entry_result in entries {
            let mut entry = entry_result.map_err(malformed)?;
            if is_metadata(entry.header().entry_type()) {
                continue;
            }
            let entry_path = entry.path().map_err(malformed)?.into_owned();
            validate_entry_path(&entry_path)?;

            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                std::fs::create_dir_all(dest_dir.join(&entry_path))?;
                continue;
            }
            if !entry_type.is_file() {
                return Err(ExtractionError::UnsupportedEntry {
                    path: entry_path.display().to_string(),
                });
            }

            let dest_path = dest_dir.join(&entry_path);
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry.unpack(&dest_path)?;
            extracted.push(entry_path);
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(extracted)
    }
}

/// Header-only entries that describe other entries and have no file of
/// their own.
fn is_metadata(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::XGlobalHeader
            | tar::EntryType::XHeader
            | tar::EntryType::GNULongName
            | tar::EntryType::GNULongLink
    )
}

fn malformed(err: std::io::Error) -> ExtractionError {
    ExtractionError::Malformed {
        reason: err.to_string(),
    }
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
