//! Download URL newtype.
//!
//! Only `https://` URLs with a non-empty host are accepted, so an
//! unencrypted release location is rejected when the manifest is loaded
//! rather than when the download starts.

use super::error::{ArtefactError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only transport scheme accepted for release downloads.
pub const SECURE_SCHEME: &str = "https://";

/// A validated HTTPS download URL.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::download_url::DownloadUrl;
///
/// let url = DownloadUrl::try_from("https://example.test/kiln-linux.tar.gz")
///     .expect("valid URL");
/// assert_eq!(url.file_name(), Some("kiln-linux.tar.gz"));
///
/// assert!(DownloadUrl::try_from("http://example.test/kiln.tar.gz").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DownloadUrl(String);

impl DownloadUrl {
    /// Return the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the final path segment, ignoring any query or fragment.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        let path = self.0.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().filter(|segment| !segment.is_empty())
    }
}

impl TryFrom<&str> for DownloadUrl {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        let Some(rest) = strip_scheme(value) else {
            return Err(ArtefactError::InsecureUrl {
                url: value.to_owned(),
            });
        };
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(ArtefactError::InvalidUrl {
                url: value.to_owned(),
                reason: "missing host".to_owned(),
            });
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ArtefactError::InvalidUrl {
                url: value.to_owned(),
                reason: "contains whitespace".to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for DownloadUrl {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl From<DownloadUrl> for String {
    fn from(value: DownloadUrl) -> Self {
        value.0
    }
}

impl AsRef<str> for DownloadUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strip a case-insensitive `https://` prefix.
fn strip_scheme(value: &str) -> Option<&str> {
    let prefix = value.get(..SECURE_SCHEME.len())?;
    prefix
        .eq_ignore_ascii_case(SECURE_SCHEME)
        .then(|| &value[SECURE_SCHEME.len()..])
}
