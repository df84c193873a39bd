//! Platform package assembly.
//!
//! Each build step produces one `release.<ext>` file in the output
//! directory from the Binary Set, the static documentation files, and the
//! installer templates.
//!
//! # Sub-modules
//!
//! - [`archive`] - `.tgz` and `.zip` archives.
//! - [`deb`] - Debian packages via `dpkg`.
//! - [`rpm`] - RPM packages via `rpmbuild`.
//! - [`msi`] - Windows installers via the WiX toolchain.
//! - [`deps`] - Distribution packages the binaries link against.

pub mod archive;
pub mod deb;
pub mod deps;
pub mod msi;
pub mod rpm;

use crate::config::MsiConfig;
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::platform::{OsFamily, PackageKind, Platform};
use crate::template::MetadataTemplate;
use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use tempfile::TempDir;

/// Package and directory name used inside installers.
pub const PACKAGE_NAME: &str = "mongodb-database-tools";

/// The tools shipped in every release, in packaging order.
pub const BINARIES: [&str; 8] = [
    "bsondump",
    "mongodump",
    "mongoexport",
    "mongofiles",
    "mongoimport",
    "mongorestore",
    "mongostat",
    "mongotop",
];

/// Documentation files shipped alongside the binaries.
pub const STATIC_FILES: [&str; 3] = ["LICENSE.md", "README.md", "THIRD-PARTY-NOTICES"];

/// Locations and file lists that feed every build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInputs {
    /// Directory holding the static files.
    pub source_root: Utf8PathBuf,
    /// Directory holding the compiled binaries.
    pub binaries_dir: Utf8PathBuf,
    /// Directory holding the `deb/`, `rpm/` and `msi/` templates.
    pub installer_dir: Utf8PathBuf,
    /// Binary names, without extension.
    pub binaries: Vec<String>,
    /// Static file names.
    pub static_files: Vec<String>,
}

impl BuildInputs {
    /// The Database Tools layout rooted at `source_root`: binaries in
    /// `bin/`, templates in `installer/`.
    #[must_use]
    pub fn database_tools(source_root: &Utf8Path) -> Self {
        Self {
            source_root: source_root.to_owned(),
            binaries_dir: source_root.join("bin"),
            installer_dir: source_root.join("installer"),
            binaries: BINARIES.iter().map(|b| (*b).to_owned()).collect(),
            static_files: STATIC_FILES.iter().map(|f| (*f).to_owned()).collect(),
        }
    }

    /// Path of the compiled binary `name`.
    #[must_use]
    pub fn binary(&self, name: &str) -> Utf8PathBuf {
        self.binaries_dir.join(name)
    }

    /// Path of the static file `name`.
    #[must_use]
    pub fn static_file(&self, name: &str) -> Utf8PathBuf {
        self.source_root.join(name)
    }

    /// Path of an installer resource, e.g. `("deb", "control")`.
    #[must_use]
    pub fn installer_file(&self, kind: &str, name: &str) -> Utf8PathBuf {
        self.installer_dir.join(kind).join(name)
    }
}

/// Everything a build step needs to know about the current build.
#[derive(Debug, Clone, Copy)]
pub struct PackageContext<'a> {
    /// Input files.
    pub inputs: &'a BuildInputs,
    /// Platform detected for this machine.
    pub platform: &'a Platform,
    /// Version being packaged.
    pub version: &'a Version,
    /// Directory receiving `release.*` outputs.
    pub output_dir: &'a Utf8Path,
}

impl PackageContext<'_> {
    /// Path of the output file `release.<ext>`.
    #[must_use]
    pub fn output_file(&self, ext: &str) -> Utf8PathBuf {
        self.output_dir.join(format!("release.{ext}"))
    }
}

/// Run the MSI step then the linux package step, returning the outputs
/// produced.
///
/// # Errors
///
/// Returns the first build failure, or [`ReleaseError::Packaging`] for a
/// linux platform that has no package kind.
pub fn build_packages(
    ctx: &PackageContext<'_>,
    executor: &dyn CommandExecutor,
    msi_config: &MsiConfig,
) -> Result<Vec<Utf8PathBuf>> {
    let mut outputs = Vec::new();
    outputs.extend(msi::build_msi(ctx, executor, msi_config)?);
    outputs.extend(build_linux_package(ctx, executor)?);
    Ok(outputs)
}

fn build_linux_package(
    ctx: &PackageContext<'_>,
    executor: &dyn CommandExecutor,
) -> Result<Option<Utf8PathBuf>> {
    if ctx.platform.os() != OsFamily::Linux {
        return Ok(None);
    }
    match ctx.platform.pkg() {
        PackageKind::Rpm => rpm::build_rpm(ctx, executor),
        PackageKind::Deb => deb::build_deb(ctx, executor),
        PackageKind::None | PackageKind::Msi => Err(ReleaseError::Packaging {
            operation: "build linux package".to_owned(),
            message: format!("linux platform {} has no rpm or deb package kind", ctx.platform),
        }),
    }
}

/// Create a scratch directory inside the output directory, so hard links
/// from the source tree stay on one filesystem.
pub(crate) fn scratch_dir(ctx: &PackageContext<'_>, prefix: &str) -> Result<TempDir> {
    std::fs::create_dir_all(ctx.output_dir)
        .map_err(ReleaseError::io(format!("create {}", ctx.output_dir)))?;
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(ctx.output_dir)
        .map_err(ReleaseError::io(format!("create {prefix} directory")))
}

/// Path of a scratch directory as UTF-8.
pub(crate) fn utf8_dir(dir: &TempDir) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|p| ReleaseError::Packaging {
        operation: "create scratch directory".to_owned(),
        message: format!("path {} is not valid UTF-8", p.display()),
    })
}

pub(crate) fn create_dirs(path: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(ReleaseError::io(format!("create {path}")))
}

pub(crate) fn hard_link(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    debug!("linking {src} to {dst}");
    std::fs::hard_link(src, dst).map_err(ReleaseError::io(format!("link {src} to {dst}")))
}

pub(crate) fn copy_file(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    debug!("copying {src} to {dst}");
    std::fs::copy(src, dst)
        .map(|_| ())
        .map_err(ReleaseError::io(format!("copy {src} to {dst}")))
}

/// Read the template at `path` and render it.
pub(crate) fn render_template_file(path: &Utf8Path, template: &MetadataTemplate) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ReleaseError::Packaging {
        operation: format!("read template {path}"),
        message: e.to_string(),
    })?;
    info!("rendering {path}");
    template.render(&content)
}

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::{SourceTree, platform};
    use super::*;
    use crate::test_utils::FnExecutor;

    #[test]
    fn non_linux_platform_skips_linux_package() {
        let tree = SourceTree::new();
        let platform = platform(OsFamily::MacOs, PackageKind::None);
        let executor = FnExecutor::new(|cmd, _| panic!("unexpected command {cmd}"));
        let outputs =
            build_packages(&tree.context(&platform), &executor, &MsiConfig::default())
                .expect("no-op");
        assert!(outputs.is_empty());
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn linux_platform_without_package_kind_fails() {
        let tree = SourceTree::new();
        let platform = platform(OsFamily::Linux, PackageKind::None);
        let executor = FnExecutor::new(|cmd, _| panic!("unexpected command {cmd}"));
        let err = build_packages(&tree.context(&platform), &executor, &MsiConfig::default())
            .expect_err("fails");
        assert!(matches!(err, ReleaseError::Packaging { .. }));
    }

    #[test]
    fn database_tools_inputs_layout() {
        let inputs = BuildInputs::database_tools(Utf8Path::new("/src"));
        assert_eq!(inputs.binary("mongodump"), "/src/bin/mongodump");
        assert_eq!(inputs.static_file("README.md"), "/src/README.md");
        assert_eq!(inputs.installer_file("deb", "control"), "/src/installer/deb/control");
        assert_eq!(inputs.binaries.len(), 8);
    }
}
