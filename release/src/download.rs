//! Artifact download.
//!
//! Provides a trait-based abstraction for fetching signed artifacts from the
//! URLs the CI system reports, enabling dependency injection for testing.

use crate::error::{ReleaseError, Result};
use crate::http::{agent, map_ureq_error};
use std::path::Path;

/// Trait for downloading an artifact to a local file.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactFetcher {
    /// Download `url` into `dest`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Network`] if the request fails, or
    /// [`ReleaseError::Io`] if the file cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file =
            std::fs::File::create(dest).map_err(ReleaseError::io("create release file"))?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file)
            .map_err(ReleaseError::io("write release file from http body"))?;
        Ok(())
    }
}
