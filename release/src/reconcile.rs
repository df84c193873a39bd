//! Reconciliation of CI sign tasks against the platform matrix.
//!
//! The reconciler performs every CI query and every consistency check before
//! returning, so a release that fails validation never reaches the upload
//! stage.

use crate::ci::{Artifact, CiClient, Task};
use crate::error::{ReconcileError, Result};
use crate::platform::{Platform, PlatformMatrix};
use log::info;
use std::collections::HashSet;

/// A sign task together with its platform and validated artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlatform<'m> {
    /// Platform the task built.
    pub platform: &'m Platform,
    /// The sign task.
    pub task: Task,
    /// Artifacts produced by the task, one per expected extension.
    pub artifacts: Vec<Artifact>,
}

/// Validates that the sign tasks of a revision cover the platform matrix
/// exactly.
pub struct Reconciler<'a> {
    ci: &'a dyn CiClient,
    matrix: &'a PlatformMatrix,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler querying `ci` and checking against `matrix`.
    #[must_use]
    pub fn new(ci: &'a dyn CiClient, matrix: &'a PlatformMatrix) -> Self {
        Self { ci, matrix }
    }

    /// Resolve the sign tasks of `commit`, in platform matrix order.
    ///
    /// # Errors
    ///
    /// Returns a [`ReconcileError`] (wrapped in
    /// [`crate::error::ReleaseError::Reconciliation`]) when a sign task has
    /// an unknown variant, two sign tasks share a variant, the number of
    /// sign tasks differs from the matrix size, or a task's artifacts do not match its platform's expected
    /// extensions. CI query failures are propagated unchanged.
    pub fn reconcile(&self, commit: &str) -> Result<Vec<ResolvedPlatform<'a>>> {
        let sign_tasks = self.sign_tasks(commit)?;

        let mut resolved = Vec::with_capacity(sign_tasks.len());
        for task in sign_tasks {
            info!("getting artifacts for {}", task.variant);
            let platform = self.matrix.by_variant(&task.variant).ok_or_else(|| {
                ReconcileError::MissingPlatform {
                    task_id: task.task_id.clone(),
                    variant: task.variant.clone(),
                }
            })?;
            let artifacts = self.ci.artifacts_for_task(&task.task_id)?;
            check_artifacts(platform, &artifacts)?;
            resolved.push(ResolvedPlatform {
                platform,
                task,
                artifacts,
            });
        }

        resolved.sort_by_key(|r| self.matrix.position(r.platform.variant()));
        Ok(resolved)
    }

    /// Fetch, filter and count the release sign tasks.
    ///
    /// Every variant must be known and appear once, so a count equal to the
    /// matrix size means the tasks cover the matrix exactly.
    fn sign_tasks(&self, commit: &str) -> Result<Vec<Task>> {
        let mut sign_tasks = Vec::new();
        let mut seen = HashSet::new();
        for task in self.ci.tasks_for_revision(commit)? {
            if !task.is_release_sign_task() {
                continue;
            }
            if self.matrix.by_variant(&task.variant).is_none() {
                return Err(ReconcileError::UnknownVariant {
                    variant: task.variant,
                }
                .into());
            }
            if !seen.insert(task.variant.clone()) {
                return Err(ReconcileError::DuplicateVariant {
                    variant: task.variant,
                }
                .into());
            }
            sign_tasks.push(task);
        }

        if sign_tasks.len() != self.matrix.len() {
            return Err(ReconcileError::SignTaskCount {
                found: sign_tasks.len(),
                expected: self.matrix.len(),
            }
            .into());
        }
        Ok(sign_tasks)
    }
}

/// Check that `artifacts` carry each of the platform's expected extensions
/// exactly once.
fn check_artifacts(
    platform: &Platform,
    artifacts: &[Artifact],
) -> std::result::Result<(), ReconcileError> {
    let expected = platform.artifact_extensions();
    if artifacts.len() != expected.len() {
        return Err(ReconcileError::ArtifactCount {
            variant: platform.variant().to_owned(),
            expected: expected.len(),
            found: artifacts.len(),
        });
    }

    let mut remaining: Vec<&str> = expected.iter().map(String::as_str).collect();
    for artifact in artifacts {
        let ext = artifact.extension().trim_start_matches('.');
        let Some(idx) = remaining.iter().position(|e| *e == ext) else {
            return Err(ReconcileError::UnexpectedExtension {
                variant: platform.variant().to_owned(),
                url: artifact.url.clone(),
                expected: expected.join(", "),
            });
        };
        remaining.swap_remove(idx);
    }
    Ok(())
}
