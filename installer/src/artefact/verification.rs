//! Integrity verification for downloaded artefacts.
//!
//! The downloaded bytes are hashed with SHA-256 and compared against the
//! digest published in the release manifest. A mismatch is fatal: the bytes
//! are dropped and never reach extraction. Comparison is ordinary string
//! equality since the digest is public.

use super::sha256_digest::Sha256Digest;
use log::debug;

/// The computed digest of a download differs from the published digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("checksum mismatch: expected {expected}, computed {actual}")]
pub struct IntegrityMismatch {
    /// Digest published in the manifest.
    pub expected: Sha256Digest,
    /// Digest computed from the downloaded bytes.
    pub actual: Sha256Digest,
}

/// Check `bytes` against `expected`, handing the bytes back on success.
///
/// # Errors
///
/// Returns [`IntegrityMismatch`] carrying both digests when they differ.
///
/// # Examples
///
/// ```
/// use kiln_installer::artefact::sha256_digest::Sha256Digest;
/// use kiln_installer::artefact::verification::verify;
///
/// let expected = Sha256Digest::of_bytes(b"archive");
/// assert!(verify(b"archive".to_vec(), &expected).is_ok());
/// assert!(verify(b"tampered".to_vec(), &expected).is_err());
/// ```
pub fn verify(bytes: Vec<u8>, expected: &Sha256Digest) -> Result<Vec<u8>, IntegrityMismatch> {
    let actual = Sha256Digest::of_bytes(&bytes);
    if actual != *expected {
        return Err(IntegrityMismatch {
            expected: expected.clone(),
            actual,
        });
    }
    debug!("verified {} bytes against {expected}", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ARCHIVE: &[u8] = b"kiln release archive bytes";

    #[rstest]
    #[case::empty(&[])]
    #[case::archive(ARCHIVE)]
    fn matching_digest_returns_bytes(#[case] bytes: &[u8]) {
        let digest = Sha256Digest::of_bytes(bytes);
        let verified = verify(bytes.to_vec(), &digest).expect("matching digest");
        assert_eq!(verified, bytes);
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let digest = Sha256Digest::of_bytes(ARCHIVE);
        for index in 0..ARCHIVE.len() {
            for bit in 0..8 {
                let mut mutated = ARCHIVE.to_vec();
                mutated[index] ^= 1 << bit;
                let err = verify(mutated, &digest).expect_err("mutated bytes");
                assert_eq!(err.expected, digest);
                assert_ne!(err.actual, digest);
            }
        }
    }

    #[test]
    fn mismatch_message_shows_both_digests() {
        let expected = Sha256Digest::of_bytes(b"published");
        let err = verify(b"downloaded".to_vec(), &expected).expect_err("mismatch");
        let msg = err.to_string();
        assert!(msg.contains(expected.as_str()));
        assert!(msg.contains(Sha256Digest::of_bytes(b"downloaded").as_str()));
    }
}
