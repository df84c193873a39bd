//! External command execution.
//!
//! Every external tool the release process touches (`git`, `dpkg`,
//! `rpmbuild`, the WiX toolchain, `ldd`, `aws`) is invoked through
//! [`CommandExecutor`] so tests can substitute canned responses.

use crate::error::{ReleaseError, Result};
use log::debug;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tools_release::exec::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("git", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), tools_release::error::ReleaseError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        debug!("running: {cmd} {}", args.join(" "));
        Command::new(cmd)
            .args(args)
            .output()
            .map_err(ReleaseError::io(format!("spawn {cmd}")))
    }
}

/// Runs `cmd` and returns its trimmed stdout, failing with
/// [`ReleaseError::Packaging`] (carrying stderr) on a non-zero exit.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned or exits unsuccessfully.
pub fn run_checked(executor: &dyn CommandExecutor, cmd: &str, args: &[&str]) -> Result<String> {
    let output = executor.run(cmd, args)?;
    if !output.status.success() {
        return Err(ReleaseError::tool_failed(cmd, &output.stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}
