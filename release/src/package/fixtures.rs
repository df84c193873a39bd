//! Source trees for package assembly tests.

use super::msi::WIX_FILES;
use super::{BuildInputs, PackageContext};
use crate::platform::{OsFamily, PackageKind, Platform};
use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

pub(crate) const CONTROL_TEMPLATE: &str = "Package: mongodb-database-tools\n\
Version: @TOOLS_VERSION@\n\
Architecture: @ARCHITECTURE@\n\
Maintainer: MongoDB Packaging <packaging@mongodb.com>\n";

pub(crate) const SPEC_TEMPLATE: &str = "Name: mongodb-database-tools\n\
Version: @TOOLS_VERSION@\n\
Release: @TOOLS_RELEASE@\n\
BuildArch: @ARCHITECTURE@\n";

/// A platform with the given family and package kind.
pub(crate) fn platform(os: OsFamily, pkg: PackageKind) -> Platform {
    Platform::new("rhel70", "x86_64", "rhel70", os, pkg)
}

/// A complete source tree in a temporary directory.
pub(crate) struct SourceTree {
    _dir: TempDir,
    pub(crate) root: Utf8PathBuf,
    pub(crate) inputs: BuildInputs,
    pub(crate) output: Utf8PathBuf,
    pub(crate) version: Version,
}

impl SourceTree {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let inputs = BuildInputs::database_tools(&root);

        for bin in &inputs.binaries {
            write(&inputs.binaries_dir, bin, &format!("#!/bin/sh\necho {bin}\n"));
            make_executable(&inputs.binary(bin));
        }
        for file in &inputs.static_files {
            write(&root, file, &format!("{file} contents\n"));
        }
        let deb = inputs.installer_dir.join("deb");
        write(&deb, "control", CONTROL_TEMPLATE);
        write(&deb, "postinst", "#!/bin/sh\n");
        write(&deb, "prerm", "#!/bin/sh\n");
        write(
            &inputs.installer_dir.join("rpm"),
            "mongodb-database-tools.spec",
            SPEC_TEMPLATE,
        );
        for file in WIX_FILES {
            write(&inputs.installer_dir.join("msi"), file, file);
        }

        let output = root.join("out");
        fs::create_dir_all(&output).expect("output dir");
        Self {
            _dir: dir,
            root,
            inputs,
            output,
            version: Version::parse("100.3.1", "abcdef", true).expect("valid version"),
        }
    }

    pub(crate) fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn context<'a>(&'a self, platform: &'a Platform) -> PackageContext<'a> {
        PackageContext {
            inputs: &self.inputs,
            platform,
            version: &self.version,
            output_dir: &self.output,
        }
    }

    pub(crate) fn read_output(&self, name: &str) -> Vec<u8> {
        fs::read(self.output.join(name)).expect("output exists")
    }
}

fn write(dir: &Utf8Path, name: &str, contents: &str) {
    fs::create_dir_all(dir).expect("create dir");
    fs::write(dir.join(name), contents).expect("write file");
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) {}
