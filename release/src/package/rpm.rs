//! RPM package assembly.
//!
//! `rpmbuild` runs against a scoped top directory:
//!
//! ```text
//! <top>/
//!   SOURCES/mongodb-database-tools.tar.gz
//!   mongodb-database-tools.spec
//!   RPMS/...                       (written by rpmbuild)
//! ```

use super::archive::{ArchiveEntry, write_tarball};
use super::{
    PACKAGE_NAME, PackageContext, copy_file, create_dirs, render_template_file, scratch_dir,
    utf8_dir,
};
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::platform::{OsFamily, PackageKind};
use crate::template::{MetadataTemplate, Token};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;

/// File name of the RPM spec template under `installer/rpm`.
pub const SPEC_FILE_NAME: &str = "mongodb-database-tools.spec";

/// Render the RPM spec template for this build.
///
/// # Errors
///
/// Returns [`ReleaseError::Packaging`] if the template is missing, or
/// [`ReleaseError::Template`] if a placeholder is left unsubstituted.
pub fn render_spec(ctx: &PackageContext<'_>) -> Result<String> {
    let template = MetadataTemplate::new(SPEC_FILE_NAME)
        .with(Token::ToolsVersion, ctx.version.string_without_pre())
        .with(Token::ToolsRelease, ctx.version.rpm_release())
        .with(Token::Architecture, ctx.platform.arch());
    render_template_file(&ctx.inputs.installer_file("rpm", SPEC_FILE_NAME), &template)
}

/// Build `release.rpm`; a no-op returning `None` on non-RPM platforms.
///
/// # Errors
///
/// Returns an error if the source tarball or spec file cannot be written,
/// `rpmbuild` exits unsuccessfully, or its output cannot be found.
pub fn build_rpm(
    ctx: &PackageContext<'_>,
    executor: &dyn CommandExecutor,
) -> Result<Option<Utf8PathBuf>> {
    if ctx.platform.os() != OsFamily::Linux || ctx.platform.pkg() != PackageKind::Rpm {
        return Ok(None);
    }

    let top_dir = scratch_dir(ctx, "rpm_build")?;
    let top = utf8_dir(&top_dir)?;

    info!("tarring necessary files");
    let sources = top.join("SOURCES");
    create_dirs(&sources)?;
    write_tarball(
        &sources.join(format!("{PACKAGE_NAME}.tar.gz")),
        &source_entries(ctx),
    )?;

    info!("create spec file");
    let spec_path = top.join(SPEC_FILE_NAME);
    let spec = render_spec(ctx)?;
    std::fs::write(&spec_path, spec).map_err(ReleaseError::io(format!("write {spec_path}")))?;

    let define = format!("_topdir {top}");
    info!("running: rpmbuild --define \"{define}\" -bb {spec_path}");
    run_checked(
        executor,
        "rpmbuild",
        &["--define", &define, "-bb", spec_path.as_str()],
    )?;

    let built = find_built_rpm(ctx, &top)?;
    let output = ctx.output_file("rpm");
    copy_file(&built, &output)?;
    Ok(Some(output))
}

/// Entries of the source tarball: binaries under `usr/bin` and static
/// files under `usr/share/doc`, inside a `mongodb-database-tools/` root.
fn source_entries(ctx: &PackageContext<'_>) -> Vec<ArchiveEntry> {
    let docs = ctx.inputs.static_files.iter().map(|f| {
        ArchiveEntry::new(
            ctx.inputs.static_file(f),
            format!("{PACKAGE_NAME}/usr/share/doc/{PACKAGE_NAME}/{f}"),
        )
    });
    let bins = ctx.inputs.binaries.iter().map(|b| {
        ArchiveEntry::new(ctx.inputs.binary(b), format!("{PACKAGE_NAME}/usr/bin/{b}"))
    });
    docs.chain(bins).collect()
}

/// The file name `rpmbuild` gives the package:
/// `mongodb-database-tools-<version>-<release>.<arch>.rpm`.
#[must_use]
pub fn rpm_file_name(ctx: &PackageContext<'_>) -> String {
    format!(
        "{PACKAGE_NAME}-{}-{}.{}.rpm",
        ctx.version.string_without_pre(),
        ctx.version.rpm_release(),
        ctx.platform.arch()
    )
}

/// Locate the built package under `RPMS/`, with or without the per-arch
/// subdirectory.
fn find_built_rpm(ctx: &PackageContext<'_>, top: &Utf8Path) -> Result<Utf8PathBuf> {
    let name = rpm_file_name(ctx);
    let rpms = top.join("RPMS");
    [rpms.join(&name), rpms.join(ctx.platform.arch()).join(&name)]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| ReleaseError::Packaging {
            operation: "locate rpmbuild output".to_owned(),
            message: format!("{name} not found under {rpms}"),
        })
}
