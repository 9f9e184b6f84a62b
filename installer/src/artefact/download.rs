//! Artefact download for prebuilt kiln releases.
//!
//! Provides a trait-based abstraction for fetching release archives so the
//! install pipeline can be exercised without network access. The production
//! implementation uses a `ureq` agent whose global timeout is supplied by
//! the caller. Downloads are attempted exactly once; retry policy belongs to
//! whoever invokes the installer.

use super::download_url::{DownloadUrl, SECURE_SCHEME};
use log::debug;
use std::io::Read;
use std::time::Duration;

/// Default network timeout for release downloads.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for fetching a release archive into memory.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::download::{DEFAULT_DOWNLOAD_TIMEOUT, HttpFetcher};
///
/// let fetcher = HttpFetcher::new(DEFAULT_DOWNLOAD_TIMEOUT);
/// // Use fetcher.fetch(&url) in production
/// # let _ = fetcher;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactFetcher {
    /// Download the body at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success
    /// response status.
    fn fetch(&self, url: &DownloadUrl) -> Result<Vec<u8>, DownloadError>;
}

/// Errors arising from artefact download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The URL does not use a secure transport.
    #[error("refusing to download over an insecure transport: {url}")]
    InsecureScheme {
        /// The rejected URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("download failed for {url}: HTTP status {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request did not complete within the timeout.
    #[error("download timed out after {} seconds: {url}", timeout.as_secs())]
    Timeout {
        /// The URL that was requested.
        url: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The request failed below the HTTP layer.
    #[error("download failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// Reading the response body failed.
    #[error("I/O error reading download from {url}: {source}")]
    Io {
        /// The URL that was requested.
        url: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests are bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .https_only(true)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
        }
    }

    /// The timeout applied to each request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl ArtefactFetcher for HttpFetcher {
    fn fetch(&self, url: &DownloadUrl) -> Result<Vec<u8>, DownloadError> {
        ensure_secure(url)?;
        debug!("fetching {url}");
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| self.map_ureq_error(url.as_str(), e))?;

        let mut body = Vec::new();
        response
            .into_body()
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| self.map_read_error(url.as_str(), e))?;
        debug!("fetched {} bytes from {url}", body.len());
        Ok(body)
    }
}

impl HttpFetcher {
    /// Map a ureq error to a [`DownloadError`].
    fn map_ureq_error(&self, url: &str, err: ureq::Error) -> DownloadError {
        match err {
            ureq::Error::StatusCode(status) => DownloadError::Status {
                url: url.to_owned(),
                status,
            },
            ureq::Error::Timeout(_) => DownloadError::Timeout {
                url: url.to_owned(),
                timeout: self.timeout,
            },
            ureq::Error::Io(io) => self.map_read_error(url, io),
            other => DownloadError::Transport {
                url: url.to_owned(),
                reason: other.to_string(),
            },
        }
    }

    /// Timeouts surface as I/O errors while streaming the body.
    fn map_read_error(&self, url: &str, err: std::io::Error) -> DownloadError {
        if err.kind() == std::io::ErrorKind::TimedOut {
            DownloadError::Timeout {
                url: url.to_owned(),
                timeout: self.timeout,
            }
        } else {
            DownloadError::Io {
                url: url.to_owned(),
                source: err,
            }
        }
    }
}

/// Reject anything that is not `https://`.
fn ensure_secure(url: &DownloadUrl) -> Result<(), DownloadError> {
    let scheme = url.as_str().get(..SECURE_SCHEME.len()).unwrap_or_default();
    if scheme.eq_ignore_ascii_case(SECURE_SCHEME) {
        Ok(())
    } else {
        Err(DownloadError::InsecureScheme {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5))
    }

    #[test]
    fn default_fetcher_uses_default_timeout() {
        assert_eq!(HttpFetcher::default().timeout(), DEFAULT_DOWNLOAD_TIMEOUT);
    }

    #[test]
    fn release_urls_pass_the_scheme_check() {
        let url = DownloadUrl::try_from("https://example.test/kiln.tar.gz").expect("valid URL");
        assert!(ensure_secure(&url).is_ok());
    }

    #[rstest]
    #[case::not_found(404)]
    #[case::server_error(500)]
    fn map_ureq_error_maps_status_codes(#[case] status: u16) {
        let err = ureq::Error::StatusCode(status);
        let mapped = fetcher().map_ureq_error("https://example.test/kiln", err);
        assert!(
            matches!(mapped, DownloadError::Status { status: s, .. } if s == status),
            "got {mapped:?}"
        );
        assert!(mapped.to_string().contains(&status.to_string()));
    }

    #[test]
    fn map_ureq_error_maps_io_timeout_to_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        let mapped = fetcher().map_ureq_error("https://example.test/kiln", ureq::Error::Io(io));
        assert!(matches!(mapped, DownloadError::Timeout { .. }), "got {mapped:?}");
        assert!(mapped.to_string().contains("5 seconds"));
    }

    #[test]
    fn map_read_error_keeps_other_io_errors() {
        let io = std::io::Error::other("connection reset");
        let mapped = fetcher().map_read_error("https://example.test/kiln", io);
        assert!(matches!(mapped, DownloadError::Io { .. }), "got {mapped:?}");
        let msg = mapped.to_string();
        assert!(msg.contains("https://example.test/kiln"), "message: {msg}");
        assert!(msg.contains("connection reset"), "message: {msg}");
    }

    #[test]
    fn transport_errors_include_url() {
        let err = DownloadError::Transport {
            url: "https://example.test/kiln".to_owned(),
            reason: "connection refused".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.test/kiln"));
        assert!(msg.contains("connection refused"));
    }
}
