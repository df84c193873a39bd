//! Release platforms and the platform matrix.
//!
//! The matrix is the authoritative list of platforms a release must cover.
//! It is built once at start-up and passed by reference to every component
//! that needs it.

use crate::error::{ReleaseError, Result};
use std::fmt;

/// Environment variable naming the CI build variant of the current machine.
pub const VARIANT_ENV: &str = "EVG_VARIANT";

/// Operating-system family of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Linux distributions.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
}

/// Native installer format built for a platform, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// No installer; archive only.
    None,
    /// RPM package.
    Rpm,
    /// Debian package.
    Deb,
    /// Windows installer.
    Msi,
}

impl PackageKind {
    /// File extension of the package, without the leading dot.
    #[must_use]
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Rpm => Some("rpm"),
            Self::Deb => Some("deb"),
            Self::Msi => Some("msi"),
        }
    }
}

/// A release platform.
///
/// # Examples
///
/// ```
/// use tools_release::platform::{OsFamily, PackageKind, Platform};
///
/// let p = Platform::new("ubuntu1804", "arm64", "ubuntu1804-arm64", OsFamily::Linux, PackageKind::Deb);
/// assert_eq!(p.artifact_extensions(), ["tgz", "deb"]);
/// assert_eq!(p.debian_arch(), "arm64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    name: String,
    arch: String,
    variant: String,
    os: OsFamily,
    pkg: PackageKind,
    extensions: Vec<String>,
}

impl Platform {
    /// Create a platform whose expected artifacts follow from its OS family
    /// and package kind: an archive (`tgz` on linux, `zip` elsewhere) plus
    /// the package, if any.
    #[must_use]
    pub fn new(name: &str, arch: &str, variant: &str, os: OsFamily, pkg: PackageKind) -> Self {
        let archive = match os {
            OsFamily::Linux => "tgz",
            OsFamily::MacOs | OsFamily::Windows => "zip",
        };
        let extensions = std::iter::once(archive)
            .chain(pkg.extension())
            .map(str::to_owned)
            .collect();
        Self {
            name: name.to_owned(),
            arch: arch.to_owned(),
            variant: variant.to_owned(),
            os,
            pkg,
            extensions,
        }
    }

    /// Replace the expected artifact extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| (*e).to_owned()).collect();
        self
    }

    /// Platform name used in artifact names, e.g. `rhel70`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Architecture used in artifact names, e.g. `x86_64`.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// CI build variant producing this platform's artifacts.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Operating-system family.
    #[must_use]
    pub fn os(&self) -> OsFamily {
        self.os
    }

    /// Native package kind.
    #[must_use]
    pub fn pkg(&self) -> PackageKind {
        self.pkg
    }

    /// Extensions (without dots) of the artifacts a sign task must produce.
    #[must_use]
    pub fn artifact_extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Architecture label used in Debian control files.
    #[must_use]
    pub fn debian_arch(&self) -> &str {
        match self.arch.as_str() {
            "x86_64" => "amd64",
            "ppc64le" => "ppc64el",
            "aarch64" | "arm64" => "arm64",
            other => other,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.arch)
    }
}

/// The ordered set of platforms every release must cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformMatrix {
    platforms: Vec<Platform>,
}

impl PlatformMatrix {
    /// Build a matrix from an explicit platform list.
    #[must_use]
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self { platforms }
    }

    /// The Database Tools release platforms.
    #[must_use]
    pub fn database_tools() -> Self {
        use OsFamily::{Linux, MacOs, Windows};
        use PackageKind::{Deb, Msi, Rpm};

        Self::new(vec![
            Platform::new("amazon", "x86_64", "amazon", Linux, Rpm),
            Platform::new("amazon2", "x86_64", "amazon2", Linux, Rpm),
            Platform::new("debian92", "x86_64", "debian92", Linux, Deb),
            Platform::new("debian10", "x86_64", "debian10", Linux, Deb),
            Platform::new("macos", "x86_64", "macos", MacOs, PackageKind::None),
            Platform::new("rhel62", "x86_64", "rhel62", Linux, Rpm),
            Platform::new("rhel70", "x86_64", "rhel70", Linux, Rpm),
            Platform::new("rhel71", "ppc64le", "rhel71-ppc64le", Linux, Rpm),
            Platform::new("rhel72", "s390x", "rhel72-s390x", Linux, Rpm),
            Platform::new("rhel80", "x86_64", "rhel80", Linux, Rpm),
            Platform::new("suse12", "x86_64", "suse12", Linux, Rpm),
            Platform::new("suse15", "x86_64", "suse15", Linux, Rpm),
            Platform::new("ubuntu1604", "x86_64", "ubuntu1604", Linux, Deb),
            Platform::new("ubuntu1804", "x86_64", "ubuntu1804", Linux, Deb),
            Platform::new("ubuntu1804", "arm64", "ubuntu1804-arm64", Linux, Deb),
            Platform::new("windows", "x86_64", "windows", Windows, Msi),
        ])
    }

    /// Look up the platform built by `variant`.
    #[must_use]
    pub fn by_variant(&self, variant: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.variant == variant)
    }

    /// Position of the platform built by `variant` in matrix order.
    #[must_use]
    pub fn position(&self, variant: &str) -> Option<usize> {
        self.platforms.iter().position(|p| p.variant == variant)
    }

    /// Number of platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    /// Whether the matrix has no platforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Iterate over the platforms in matrix order.
    pub fn iter(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter()
    }

    /// Detect the platform of the current machine from [`VARIANT_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::PlatformDetection`] if the variable is unset
    /// or names an unknown variant.
    pub fn from_env(&self) -> Result<&Platform> {
        let variant =
            std::env::var(VARIANT_ENV).map_err(|e| ReleaseError::PlatformDetection {
                reason: format!("{VARIANT_ENV}: {e}"),
            })?;
        self.by_variant(&variant)
            .ok_or_else(|| ReleaseError::PlatformDetection {
                reason: format!("unknown build variant '{variant}'"),
            })
    }
}
