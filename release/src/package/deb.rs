//! Debian package assembly.
//!
//! The staging tree is laid out as `dpkg -b` expects:
//!
//! ```text
//! <release-name>/
//!   DEBIAN/{control,md5sums,postinst,prerm}
//!   usr/bin/<binaries>
//!   usr/share/doc/mongodb-database-tools/<static files>
//! ```

use super::{
    PACKAGE_NAME, PackageContext, copy_file, create_dirs, hard_link, render_template_file,
    scratch_dir, utf8_dir,
};
use crate::checksum::{DigestAlgorithm, digest};
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::naming::release_name;
use crate::platform::{OsFamily, PackageKind};
use crate::template::{MetadataTemplate, Token};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;

/// Render the Debian `control` template for this build: the full version
/// and the Debian architecture label.
///
/// # Errors
///
/// Returns [`ReleaseError::Packaging`] if the template is missing, or
/// [`ReleaseError::Template`] if a placeholder is left unsubstituted.
pub fn render_control(ctx: &PackageContext<'_>) -> Result<String> {
    let template = MetadataTemplate::new("control")
        .with(Token::ToolsVersion, ctx.version.to_string())
        .with(Token::Architecture, ctx.platform.debian_arch());
    render_template_file(&ctx.inputs.installer_file("deb", "control"), &template)
}

/// Build `release.deb`; a no-op returning `None` on non-Debian platforms.
///
/// # Errors
///
/// Returns an error if staging fails, the control template is missing or
/// incomplete, or `dpkg` exits unsuccessfully.
pub fn build_deb(
    ctx: &PackageContext<'_>,
    executor: &dyn CommandExecutor,
) -> Result<Option<Utf8PathBuf>> {
    if ctx.platform.os() != OsFamily::Linux || ctx.platform.pkg() != PackageKind::Deb {
        return Ok(None);
    }

    let work = scratch_dir(ctx, "deb_build")?;
    let work_path = utf8_dir(&work)?;
    let name = release_name(ctx.platform, ctx.version);
    let staged = work_path.join(&name);

    info!("create deb directory tree");
    let md5sums = stage_files(ctx, &staged)?;
    write_control_dir(ctx, &staged, &md5sums)?;

    let deb = work_path.join(format!("{name}.deb"));
    info!("running: dpkg -D1 -b {staged} {deb}");
    run_checked(executor, "dpkg", &["-D1", "-b", staged.as_str(), deb.as_str()])?;

    let output = ctx.output_file("deb");
    copy_file(&deb, &output)?;
    Ok(Some(output))
}

/// Link binaries and static files into the tree, returning `md5sums`
/// lines in Binary-Set-then-static-files order.
fn stage_files(ctx: &PackageContext<'_>, staged: &Utf8Path) -> Result<Vec<String>> {
    let bin_dir = Utf8PathBuf::from("usr/bin");
    let doc_dir = Utf8PathBuf::from("usr/share/doc").join(PACKAGE_NAME);
    create_dirs(&staged.join(&bin_dir))?;
    create_dirs(&staged.join(&doc_dir))?;

    let shipped = ctx
        .inputs
        .binaries
        .iter()
        .map(|b| (ctx.inputs.binary(b), bin_dir.join(b)))
        .chain(
            ctx.inputs
                .static_files
                .iter()
                .map(|f| (ctx.inputs.static_file(f), doc_dir.join(f))),
        );

    let mut md5sums = Vec::new();
    for (src, relative) in shipped {
        hard_link(&src, &staged.join(&relative))?;
        let md5 = digest(src.as_std_path(), DigestAlgorithm::Md5)?;
        md5sums.push(format!("{md5}  {relative}"));
    }
    Ok(md5sums)
}

fn write_control_dir(
    ctx: &PackageContext<'_>,
    staged: &Utf8Path,
    md5sums: &[String],
) -> Result<()> {
    let control_dir = staged.join("DEBIAN");
    create_dirs(&control_dir)?;

    let control = render_control(ctx)?;
    write_file(&control_dir.join("control"), &control)?;

    let md5sums_path = control_dir.join("md5sums");
    let mut content = md5sums.join("\n");
    content.push('\n');
    write_file(&md5sums_path, &content)?;
    set_mode_0644(&md5sums_path)?;

    for script in ["postinst", "prerm"] {
        let template = ctx.inputs.installer_file("deb", script);
        if !template.is_file() {
            return Err(ReleaseError::Packaging {
                operation: format!("read template {template}"),
                message: "maintainer script is missing".to_owned(),
            });
        }
        hard_link(&template, &control_dir.join(script))?;
    }
    Ok(())
}

fn write_file(path: &Utf8Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(ReleaseError::io(format!("write {path}")))
}

#[cfg(unix)]
fn set_mode_0644(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
        .map_err(ReleaseError::io(format!("chmod {path}")))
}

#[cfg(not(unix))]
fn set_mode_0644(_path: &Utf8Path) -> Result<()> {
    Ok(())
}
