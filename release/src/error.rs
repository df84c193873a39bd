//! Error types for the release tool.
//!
//! Every variant names the operation that failed so that the entry point can
//! print a single, self-describing diagnostic line before exiting.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors detected while reconciling CI sign tasks against the platform
/// matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// A sign task names a build variant the platform matrix does not know.
    #[error("found sign task with unknown variant '{variant}'")]
    UnknownVariant {
        /// The unrecognised build variant.
        variant: String,
    },

    /// Two sign tasks build the same variant.
    #[error("found more than one sign task for variant '{variant}'")]
    DuplicateVariant {
        /// The repeated build variant.
        variant: String,
    },

    /// The number of sign tasks differs from the number of release platforms.
    #[error("found {found} sign tasks, but expected {expected} release platforms")]
    SignTaskCount {
        /// Number of sign tasks that survived filtering.
        found: usize,
        /// Size of the platform matrix.
        expected: usize,
    },

    /// A sign task produced the wrong number of artifacts.
    #[error("expected {expected} artifacts but found {found} for {variant}")]
    ArtifactCount {
        /// Build variant of the offending task.
        variant: String,
        /// Number of artifact extensions the platform expects.
        expected: usize,
        /// Number of artifacts the task reported.
        found: usize,
    },

    /// A sign task produced an artifact type the platform does not ship, or
    /// produced one type twice.
    #[error("unexpected artifact '{url}' for {variant}; expected extensions: {expected}")]
    UnexpectedExtension {
        /// Build variant of the offending task.
        variant: String,
        /// URL of the rejected artifact.
        url: String,
        /// Comma-separated list of accepted extensions.
        expected: String,
    },

    /// A previously validated sign task no longer maps to a platform.
    #[error("sign task '{task_id}' has no platform for variant '{variant}'")]
    MissingPlatform {
        /// Identifier of the task.
        task_id: String,
        /// Build variant of the task.
        variant: String,
    },
}

/// Errors that can occur while packaging or publishing a release.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Version metadata could not be obtained from source control.
    #[error("'get version' failed for revision {revision}: {reason}")]
    Resolution {
        /// The revision that was being resolved.
        revision: String,
        /// Description of the failure.
        reason: String,
    },

    /// The build platform could not be determined from the environment.
    #[error("'get platform' failed: {reason}")]
    PlatformDetection {
        /// Description of the failure.
        reason: String,
    },

    /// A file could not be read, written, linked, or copied.
    #[error("'{operation}' failed: {source}")]
    Io {
        /// Description of the operation.
        operation: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be written.
    #[error("writing archive {path} failed: {reason}")]
    ArchiveWrite {
        /// Final path of the archive.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A packaging step failed, including non-zero exits of external tools.
    #[error("'{operation}' failed: {message}")]
    Packaging {
        /// Description of the packaging step.
        operation: String,
        /// Description of the failure, carrying any captured stderr.
        message: String,
    },

    /// A metadata template still contains an unsubstituted token.
    #[error("template {template} has unresolved token {token}")]
    Template {
        /// Name of the template file.
        template: String,
        /// The leftover placeholder, including its `@` delimiters.
        token: String,
    },

    /// A release constant needs a manual update before this version can ship.
    #[error("configuration must be updated: {message}")]
    Configuration {
        /// What must be changed.
        message: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration at {path}: {reason}")]
    Config {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The CI task set does not match the platform matrix.
    #[error(transparent)]
    Reconciliation(#[from] ReconcileError),

    /// A download or CI API request failed.
    #[error("request to {url} failed: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// Uploading a file to object storage failed.
    #[error("uploading {file} to {destination} failed: {reason}")]
    Upload {
        /// Local file name.
        file: String,
        /// Bucket and prefix the file was headed for.
        destination: String,
        /// Description of the failure.
        reason: String,
    },
}

impl ReleaseError {
    /// Build a closure mapping an I/O error to [`ReleaseError::Io`] tagged
    /// with `operation`, for use with `map_err`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tools_release::error::ReleaseError;
    ///
    /// let result: Result<String, ReleaseError> =
    ///     std::fs::read_to_string("/definitely/missing")
    ///         .map_err(ReleaseError::io("read missing file"));
    /// let message = result.unwrap_err().to_string();
    /// assert!(message.starts_with("'read missing file' failed"));
    /// ```
    #[must_use]
    pub fn io(operation: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let operation = operation.into();
        move |source| Self::Io { operation, source }
    }

    /// Build a [`ReleaseError::Packaging`] for an external tool that exited
    /// unsuccessfully, carrying its trimmed stderr.
    #[must_use]
    pub fn tool_failed(tool: &str, stderr: &[u8]) -> Self {
        Self::Packaging {
            operation: format!("run {tool}"),
            message: format!(
                "exited unsuccessfully; stderr: {:?}",
                String::from_utf8_lossy(stderr).trim()
            ),
        }
    }
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_task_count_reports_both_numbers() {
        let err = ReconcileError::SignTaskCount {
            found: 11,
            expected: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("11"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn unknown_variant_names_the_variant() {
        let err = ReleaseError::from(ReconcileError::UnknownVariant {
            variant: "solaris".to_owned(),
        });
        assert!(err.to_string().contains("'solaris'"));
    }

    #[test]
    fn tool_failure_carries_stderr() {
        let err = ReleaseError::tool_failed("dpkg", b"  dpkg-deb: error: bad control\n");
        let msg = err.to_string();
        assert!(msg.contains("run dpkg"));
        assert!(msg.contains("dpkg-deb: error: bad control"));
    }

    #[test]
    fn io_error_preserves_source() {
        let err = ReleaseError::io("stat file")(std::io::Error::other("gone"));
        assert!(err.to_string().starts_with("'stat file' failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
