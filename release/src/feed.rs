//! The JSON version feed consumed by the downloads page.

use crate::checksum::Checksums;
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of `release.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFeed {
    /// Published versions.
    pub versions: Vec<ToolsVersion>,
}

/// One published version and its downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsVersion {
    /// Version without pre-release tag, e.g. `100.3.1`.
    pub version: String,
    /// One entry per platform, in platform matrix order.
    pub downloads: Vec<ToolsDownload>,
}

/// The downloadable files of one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsDownload {
    /// Platform name.
    pub name: String,
    /// Platform architecture.
    pub arch: String,
    /// The `.tgz` or `.zip` archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<ToolsFile>,
    /// The native package, if the platform has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<ToolsFile>,
}

impl ToolsDownload {
    /// Create an entry with no files attached.
    #[must_use]
    pub fn new(name: &str, arch: &str) -> Self {
        Self {
            name: name.to_owned(),
            arch: arch.to_owned(),
            archive: None,
            package: None,
        }
    }

    /// Attach `file` as the archive for `.tgz`/`.zip` extensions, otherwise
    /// as the package.
    pub fn attach(&mut self, extension: &str, file: ToolsFile) {
        if is_archive_extension(extension) {
            self.archive = Some(file);
        } else {
            self.package = Some(file);
        }
    }
}

/// Whether `extension` (with leading dot) denotes an archive rather than a
/// package.
#[must_use]
pub fn is_archive_extension(extension: &str) -> bool {
    matches!(extension, ".tgz" | ".zip")
}

/// A published file with its digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsFile {
    /// Public download URL.
    pub url: String,
    /// Lowercase hex MD5 digest.
    pub md5: String,
    /// Lowercase hex SHA-1 digest.
    pub sha1: String,
    /// Lowercase hex SHA-256 digest.
    pub sha256: String,
}

impl ToolsFile {
    /// Pair a URL with precomputed digests.
    #[must_use]
    pub fn new(url: String, checksums: Checksums) -> Self {
        Self {
            url,
            md5: checksums.md5,
            sha1: checksums.sha1,
            sha256: checksums.sha256,
        }
    }
}

impl JsonFeed {
    /// A feed listing a single version.
    #[must_use]
    pub fn single(version: String, downloads: Vec<ToolsDownload>) -> Self {
        Self {
            versions: vec![ToolsVersion { version, downloads }],
        }
    }

    /// Render as two-space indented JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Packaging`] if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| ReleaseError::Packaging {
            operation: "encode json feed".to_owned(),
            message: e.to_string(),
        })?;
        json.push('\n');
        Ok(json)
    }

    /// Write the feed to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the write fails.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(ReleaseError::io(format!("write {}", path.display())))
    }
}
