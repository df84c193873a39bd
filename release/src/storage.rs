//! Object-storage uploads.

use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use std::path::Path;

/// Trait for uploading a local file to object storage.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectStore {
    /// Upload `local_path` to `<bucket>/<prefix>/<file name>`, replacing
    /// any existing object.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Upload`] if the upload fails.
    fn upload_file(&self, bucket: &str, prefix: &str, local_path: &Path) -> Result<()>;
}

/// Uploads through the `aws` command-line tool.
pub struct AwsCliStore<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> AwsCliStore<'a> {
    /// Create a store running `aws` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }
}

/// Build the `s3://` URI for `name` under `bucket` and `prefix`.
///
/// # Examples
///
/// ```
/// use tools_release::storage::s3_uri;
///
/// assert_eq!(
///     s3_uri("downloads.mongodb.org", "/tools/db", "release.json"),
///     "s3://downloads.mongodb.org/tools/db/release.json"
/// );
/// ```
#[must_use]
pub fn s3_uri(bucket: &str, prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("s3://{bucket}/{name}")
    } else {
        format!("s3://{bucket}/{prefix}/{name}")
    }
}

impl ObjectStore for AwsCliStore<'_> {
    fn upload_file(&self, bucket: &str, prefix: &str, local_path: &Path) -> Result<()> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = s3_uri(bucket, prefix, &name);
        let upload_error = |reason: String| ReleaseError::Upload {
            file: name.clone(),
            destination: destination.clone(),
            reason,
        };

        let local = local_path.to_string_lossy();
        let output = self
            .executor
            .run("aws", &["s3", "cp", &local, &destination])
            .map_err(|e| upload_error(e.to_string()))?;
        if !output.status.success() {
            return Err(upload_error(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }
        Ok(())
    }
}
