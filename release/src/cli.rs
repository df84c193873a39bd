//! CLI argument definitions for the release tool.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Package and publish the MongoDB Database Tools.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "release")]
#[command(version, about)]
#[command(after_help = concat!(
    "SUBCOMMANDS:\n",
    "  build-archive    Build release.tgz (release.zip on windows)\n",
    "  build-packages   Build release.msi, release.rpm or release.deb\n",
    "  get-version      Print the resolved version\n",
    "  list-deps        Print the packages the binaries depend on\n",
    "  upload-release   Publish the sign-task artifacts of a revision\n\n",
    "The platform is read from EVG_VARIANT. The version is resolved from git\n",
    "at HEAD, or at REVISION when given.",
))]
pub struct Cli {
    /// Release step to run.
    #[arg(value_enum)]
    pub command: Command,

    /// Revision to resolve the version at [default: HEAD].
    pub revision: Option<String>,

    /// Source root holding `bin/`, `installer/` and `release.toml`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub source_root: Utf8PathBuf,
}

/// Release steps.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Build the platform archive.
    BuildArchive,
    /// Build the platform installer packages.
    BuildPackages,
    /// Print the resolved version.
    GetVersion,
    /// Print the distribution packages the binaries depend on.
    ListDeps,
    /// Reconcile sign tasks and publish their artifacts.
    UploadRelease,
}
