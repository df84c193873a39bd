//! File content digests.
//!
//! Digests depend only on file bytes, never on permissions or timestamps, so
//! the same artifact hashes identically on every platform.

use crate::error::{ReleaseError, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// MD5, used for Debian `md5sums` and the feed.
    Md5,
    /// SHA-1, used for the feed.
    Sha1,
    /// SHA-256, used for the feed.
    Sha256,
}

/// The three digests recorded for every published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    /// Lowercase hex MD5 digest.
    pub md5: String,
    /// Lowercase hex SHA-1 digest.
    pub sha1: String,
    /// Lowercase hex SHA-256 digest.
    pub sha256: String,
}

/// Compute the lowercase hex digest of the file at `path`.
///
/// Reads the whole file once, in chunks.
///
/// # Errors
///
/// Returns [`ReleaseError::Io`] if the file cannot be read.
///
/// # Examples
///
/// ```
/// use tools_release::checksum::{DigestAlgorithm, digest};
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("empty");
/// std::fs::write(&path, b"")?;
/// assert_eq!(
///     digest(&path, DigestAlgorithm::Md5)?,
///     "d41d8cd98f00b204e9800998ecf8427e"
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn digest(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    match algorithm {
        DigestAlgorithm::Md5 => hex_digest::<Md5>(path),
        DigestAlgorithm::Sha1 => hex_digest::<Sha1>(path),
        DigestAlgorithm::Sha256 => hex_digest::<Sha256>(path),
    }
}

/// Compute MD5, SHA-1 and SHA-256 of the file at `path`.
///
/// # Errors
///
/// Returns [`ReleaseError::Io`] if the file cannot be read.
pub fn checksums(path: &Path) -> Result<Checksums> {
    Ok(Checksums {
        md5: digest(path, DigestAlgorithm::Md5)?,
        sha1: digest(path, DigestAlgorithm::Sha1)?,
        sha256: digest(path, DigestAlgorithm::Sha256)?,
    })
}

fn hex_digest<D: Digest>(path: &Path) -> Result<String> {
    let operation = || format!("read {} for checksum", path.display());
    let mut file = fs::File::open(path).map_err(ReleaseError::io(operation()))?;
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(ReleaseError::io(operation()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("temp dir creation succeeds")
    }

    #[rstest]
    #[case::md5(DigestAlgorithm::Md5, "900150983cd24fb0d6963f7d28e17f72")]
    #[case::sha1(DigestAlgorithm::Sha1, "a9993e364706816aba3e25717850c26c9cd0d89d")]
    #[case::sha256(
        DigestAlgorithm::Sha256,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    )]
    fn digest_of_known_content(
        temp_dir: TempDir,
        #[case] algorithm: DigestAlgorithm,
        #[case] expected: &str,
    ) {
        let path = temp_dir.path().join("abc");
        fs::write(&path, b"abc").expect("write");
        assert_eq!(digest(&path, algorithm).expect("digest"), expected);
    }

    #[rstest]
    fn digest_ignores_permissions(temp_dir: TempDir) {
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        fs::write(&a, b"same bytes").expect("write a");
        fs::write(&b, b"same bytes").expect("write b");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&b, fs::Permissions::from_mode(0o755)).expect("chmod");
        }
        assert_eq!(checksums(&a).expect("a"), checksums(&b).expect("b"));
    }

    #[rstest]
    fn missing_file_is_an_io_error(temp_dir: TempDir) {
        let err = digest(&temp_dir.path().join("nope"), DigestAlgorithm::Sha1).expect_err("fails");
        assert!(matches!(err, ReleaseError::Io { .. }));
    }
}
