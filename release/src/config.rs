//! Release configuration.
//!
//! Every value has a default matching the Database Tools release
//! infrastructure. An optional `release.toml` in the source root overrides
//! individual fields:
//!
//! ```toml
//! [storage]
//! bucket = "downloads.mongodb.org"
//! prefix = "/tools/db"
//!
//! [feed]
//! download_base_url = "https://fastdl.mongodb.org/tools/db"
//! ```

use crate::error::{ReleaseError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Name of the configuration file looked up in the source root.
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Top-level release configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Object-storage destination.
    pub storage: StorageConfig,
    /// Version feed settings.
    pub feed: FeedConfig,
    /// CI API settings.
    pub evergreen: EvergreenConfig,
    /// Windows installer toolchain locations.
    pub msi: MsiConfig,
    /// Local paths.
    pub paths: PathsConfig,
}

/// Object-storage destination for published files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix inside the bucket.
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "downloads.mongodb.org".to_owned(),
            prefix: "/tools/db".to_owned(),
        }
    }
}

/// Version feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Public base URL recorded for each stable artifact.
    pub download_base_url: String,
    /// File name of the feed.
    pub file_name: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            download_base_url: "https://fastdl.mongodb.org/tools/db".to_owned(),
            file_name: "release.json".to_owned(),
        }
    }
}

/// Evergreen API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvergreenConfig {
    /// API host, without a trailing slash.
    pub api_base: String,
    /// Project identifier.
    pub project: String,
}

impl Default for EvergreenConfig {
    fn default() -> Self {
        Self {
            api_base: "https://evergreen.mongodb.com".to_owned(),
            project: "mongo-tools".to_owned(),
        }
    }
}

/// Locations of the WiX toolchain and the SASL libraries on Windows
/// builders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MsiConfig {
    /// Directory holding `candle.exe`, `light.exe` and `WixUIExtension.dll`.
    pub wix_dir: Utf8PathBuf,
    /// Directory holding the SASL DLLs.
    pub sasl_dir: Utf8PathBuf,
}

impl Default for MsiConfig {
    fn default() -> Self {
        Self {
            wix_dir: Utf8PathBuf::from("/wixtools/bin"),
            sasl_dir: Utf8PathBuf::from("/sasl/bin"),
        }
    }
}

/// Local paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory, relative to the source root unless absolute, where
    /// `release.*` outputs are written.
    pub output_dir: Utf8PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from("."),
        }
    }
}

impl ReleaseConfig {
    /// Load `release.toml` from `source_root`, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Config`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(source_root: &Utf8Path) -> Result<Self> {
        let path = source_root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ReleaseError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&path, &content)
    }

    /// Parse configuration text; `path` is used for diagnostics only.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Config`] on invalid TOML or unknown keys.
    pub fn parse(path: &Utf8Path, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ReleaseError::Config {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Output directory resolved against `source_root`.
    #[must_use]
    pub fn output_dir(&self, source_root: &Utf8Path) -> Utf8PathBuf {
        source_root.join(&self.paths.output_dir)
    }
}
