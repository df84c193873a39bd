//! Naming policy for release files.
//!
//! Every published file is named
//! `mongodb-database-tools-<platform>-<arch>-<label><ext>`, where the label
//! is `unstable`, the full version, or `latest-stable`.

use crate::platform::Platform;
use crate::version::Version;
use std::fmt;

/// The fixed prefix for all release file names.
pub const PRODUCT_PREFIX: &str = "mongodb-database-tools";

/// Which channel a published file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel<'a> {
    /// Overwritten by every build of every revision.
    Unstable,
    /// Pinned to one stable version.
    Stable(&'a Version),
    /// Overwritten by every stable release.
    LatestStable,
}

/// A published release file name.
///
/// # Examples
///
/// ```
/// use tools_release::naming::{Channel, ReleaseFileName};
/// use tools_release::platform::{OsFamily, PackageKind, Platform};
/// use tools_release::version::Version;
///
/// let platform = Platform::new("rhel70", "x86_64", "rhel70", OsFamily::Linux, PackageKind::Rpm);
/// let version = Version::parse("100.3.1", "abc", true).expect("valid version");
///
/// let name = ReleaseFileName::new(&platform, Channel::Stable(&version), ".rpm");
/// assert_eq!(
///     name.to_string(),
///     "mongodb-database-tools-rhel70-x86_64-100.3.1.rpm"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseFileName<'a> {
    platform: &'a Platform,
    channel: Channel<'a>,
    extension: &'a str,
}

impl<'a> ReleaseFileName<'a> {
    /// Create a name for `platform` in `channel`; `extension` includes the
    /// leading dot.
    #[must_use]
    pub fn new(platform: &'a Platform, channel: Channel<'a>, extension: &'a str) -> Self {
        Self {
            platform,
            channel,
            extension,
        }
    }
}

impl fmt::Display for ReleaseFileName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PRODUCT_PREFIX}-{}-{}-",
            self.platform.name(),
            self.platform.arch()
        )?;
        match self.channel {
            Channel::Unstable => f.write_str("unstable")?,
            Channel::Stable(version) => write!(f, "{version}")?,
            Channel::LatestStable => f.write_str("latest-stable")?,
        }
        f.write_str(self.extension)
    }
}

/// Name of the top-level directory inside archives and of the Debian
/// staging tree: `mongodb-database-tools-<platform>-<arch>-<version>`.
#[must_use]
pub fn release_name(platform: &Platform, version: &Version) -> String {
    format!(
        "{PRODUCT_PREFIX}-{}-{}-{version}",
        platform.name(),
        platform.arch()
    )
}
