//! Distribution packages providing the shared libraries the tools link
//! against.

use super::PackageContext;
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::platform::{OsFamily, PackageKind};
use std::collections::BTreeSet;

/// Binary whose dynamic dependencies stand for the whole Binary Set.
const PROBE_BINARY: &str = "mongodump";

/// List, sorted and de-duplicated, the packages providing the libraries
/// `mongodump` links against. Returns an empty list on non-linux platforms.
///
/// # Errors
///
/// Returns [`ReleaseError::Packaging`] if `ldd` or the package query fails,
/// or if the linux platform has neither an RPM nor a DEB package kind.
pub fn list_deps(ctx: &PackageContext<'_>, executor: &dyn CommandExecutor) -> Result<Vec<String>> {
    if ctx.platform.os() != OsFamily::Linux {
        return Ok(Vec::new());
    }
    let pkg = ctx.platform.pkg();
    if !matches!(pkg, PackageKind::Rpm | PackageKind::Deb) {
        return Err(ReleaseError::Packaging {
            operation: "list dependencies".to_owned(),
            message: format!("linux platform {} is neither deb nor rpm based", ctx.platform.name()),
        });
    }

    let binary = ctx.inputs.binary(PROBE_BINARY);
    let ldd = run_checked(executor, "ldd", &[binary.as_str()])?;

    let mut deps = BTreeSet::new();
    for lib in library_paths(&ldd) {
        let provider = if pkg == PackageKind::Rpm {
            run_checked(executor, "rpm", &["-q", "--whatprovides", lib])?
        } else {
            let out = run_checked(executor, "dpkg", &["-S", lib])?;
            out.split(':').next().unwrap_or_default().trim().to_owned()
        };
        deps.insert(provider);
    }
    Ok(deps.into_iter().collect())
}

/// Resolved library paths from `ldd` output lines of the form
/// `libfoo.so.1 => /lib/libfoo.so.1 (0x...)`.
fn library_paths(ldd: &str) -> Vec<&str> {
    ldd.lines()
        .filter_map(|line| line.split_once("=>"))
        .map(|(_, rest)| rest.split('(').next().unwrap_or_default().trim())
        .filter(|path| !path.is_empty())
        .collect()
}
