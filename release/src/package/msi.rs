//! Windows installer assembly with the WiX toolchain.

use super::{PackageContext, copy_file, create_dirs, hard_link, scratch_dir, utf8_dir};
use crate::config::MsiConfig;
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::platform::OsFamily;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::path::MAIN_SEPARATOR;

/// Upgrade code shared by every installer of the current major version.
pub const UPGRADE_CODE: &str = "f8a84cb5-a2a7-4392-bfb5-8f829b659960";

/// Major version the upgrade code belongs to.
const UPGRADE_CODE_VERSION_LABEL: &str = "100";

const PROJECT_NAME: &str = "MongoDB Tools";

/// Static files shipped in the installer. The license ships as
/// `LICENSE.rtf` among the WiX resources instead.
const MSI_STATIC_FILES: [&str; 2] = ["README.md", "THIRD-PARTY-NOTICES"];

const SASL_DLLS: [&str; 1] = ["libsasl.dll"];

/// WiX sources and resources under `installer/msi`.
pub const WIX_FILES: [&str; 11] = [
    "Banner_Tools.bmp",
    "BinaryFragment.wxs",
    "Dialog.bmp",
    "Dialog_Tools.bmp",
    "FeatureFragment.wxs",
    "Installer_Icon_16x16.ico",
    "Installer_Icon_32x32.ico",
    "LICENSE.rtf",
    "LicensingFragment.wxs",
    "Product.wxs",
    "UIFragment.wxs",
];

const WIX_SOURCES: [&str; 5] = [
    "Product",
    "FeatureFragment",
    "BinaryFragment",
    "LicensingFragment",
    "UIFragment",
];

/// Build `release.msi`; a no-op returning `None` on non-windows platforms.
///
/// # Errors
///
/// Returns [`ReleaseError::Configuration`] before doing any work when the
/// version's major component does not match the upgrade code, or an error
/// if staging fails or `candle`/`light` exit unsuccessfully.
pub fn build_msi(
    ctx: &PackageContext<'_>,
    executor: &dyn CommandExecutor,
    config: &MsiConfig,
) -> Result<Option<Utf8PathBuf>> {
    if ctx.platform.os() != OsFamily::Windows {
        return Ok(None);
    }

    let version_label = ctx.version.major.to_string();
    if version_label != UPGRADE_CODE_VERSION_LABEL {
        return Err(ReleaseError::Configuration {
            message: format!(
                "the MSI upgrade code must be updated for major version {version_label}; \
                 the current code belongs to {UPGRADE_CODE_VERSION_LABEL}"
            ),
        });
    }

    info!("building msi installer");
    let work_dir = scratch_dir(ctx, "msi_build")?;
    let work = utf8_dir(&work_dir)?;

    // The DLLs live on another filesystem, so they cannot be linked.
    for dll in SASL_DLLS {
        copy_file(&config.sasl_dir.join(dll), &work.join(dll))?;
    }
    for file in MSI_STATIC_FILES {
        hard_link(&ctx.inputs.static_file(file), &work.join(file))?;
    }
    for file in WIX_FILES {
        hard_link(&ctx.inputs.installer_file("msi", file), &work.join(file))?;
    }
    for bin in &ctx.inputs.binaries {
        hard_link(&ctx.inputs.binary(bin), &work.join(format!("{bin}.exe")))?;
    }

    // WiX requires directory arguments to end with a separator.
    let dir_arg = format!("{work}{MAIN_SEPARATOR}");
    let obj_dir = work.join("objs");
    create_dirs(&obj_dir)?;
    let obj_arg = format!("{obj_dir}{MAIN_SEPARATOR}");
    let wix_ui_ext = config.wix_dir.join("WixUIExtension.dll");
    let wix_version = ctx.version.string_without_pre();

    let mut candle_args = vec![
        "-wx".to_owned(),
        "-dProductId=*".to_owned(),
        "-dPlatform=x64".to_owned(),
        format!("-dUpgradeCode={UPGRADE_CODE}"),
        format!("-dVersion={wix_version}"),
        format!("-dVersionLabel={version_label}"),
        format!("-dProjectName={PROJECT_NAME}"),
        format!("-dSourceDir={dir_arg}"),
        format!("-dResourceDir={dir_arg}"),
        format!("-dSslDir={dir_arg}"),
        format!("-dBinaryDir={dir_arg}"),
        format!("-dTargetDir={obj_arg}"),
        "-dTargetExt=.msi".to_owned(),
        "-dTargetFileName=release".to_owned(),
        format!("-dOutDir={obj_arg}"),
        "-dConfiguration=Release".to_owned(),
        "-arch".to_owned(),
        "x64".to_owned(),
        "-out".to_owned(),
        obj_arg.clone(),
        "-ext".to_owned(),
        wix_ui_ext.to_string(),
    ];
    candle_args.extend(WIX_SOURCES.iter().map(|s| work.join(format!("{s}.wxs")).to_string()));
    run_tool(executor, &config.wix_dir.join("candle.exe"), &candle_args)?;

    let msi = work.join("release.msi");
    let mut light_args = vec![
        "-wx".to_owned(),
        "-cultures:en-us".to_owned(),
        "-out".to_owned(),
        msi.to_string(),
        "-ext".to_owned(),
        wix_ui_ext.to_string(),
    ];
    light_args.extend(
        WIX_SOURCES
            .iter()
            .map(|s| obj_dir.join(format!("{s}.wixobj")).to_string()),
    );
    run_tool(executor, &config.wix_dir.join("light.exe"), &light_args)?;

    let output = ctx.output_file("msi");
    copy_file(&msi, &output)?;
    Ok(Some(output))
}

fn run_tool(executor: &dyn CommandExecutor, tool: &Utf8Path, args: &[String]) -> Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    info!("running: {tool}");
    run_checked(executor, tool.as_str(), &args).map(|_| ())
}
