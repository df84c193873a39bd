//! Publishing of reconciled release artifacts and the version feed.
//!
//! Files are published under deterministic names that later runs overwrite,
//! so re-running a failed publish from scratch is safe. The feed is uploaded
//! last, after every artifact of every platform has been published.

use crate::checksum::checksums;
use crate::config::{FeedConfig, StorageConfig};
use crate::download::ArtifactFetcher;
use crate::error::{ReleaseError, Result};
use crate::feed::{JsonFeed, ToolsDownload, ToolsFile};
use crate::naming::{Channel, ReleaseFileName};
use crate::reconcile::{Reconciler, ResolvedPlatform};
use crate::storage::{ObjectStore, s3_uri};
use crate::version::Version;
use log::info;
use std::path::Path;
use tempfile::TempDir;

/// Summary of a completed publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// File names uploaded, in upload order.
    pub uploaded: Vec<String>,
    /// The feed, when one was published.
    pub feed: Option<JsonFeed>,
}

/// Uploads artifacts and the version feed.
pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
    fetcher: &'a dyn ArtifactFetcher,
    storage: &'a StorageConfig,
    feed: &'a FeedConfig,
}

impl<'a> Publisher<'a> {
    /// Create a publisher.
    #[must_use]
    pub fn new(
        store: &'a dyn ObjectStore,
        fetcher: &'a dyn ArtifactFetcher,
        storage: &'a StorageConfig,
        feed: &'a FeedConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            storage,
            feed,
        }
    }

    /// Publish every resolved artifact and, for stable versions, the feed.
    ///
    /// Unstable versions upload one file per artifact. Stable versions
    /// upload three (unstable, versioned, latest-stable) and then the feed.
    ///
    /// # Errors
    ///
    /// Returns the first download, checksum, copy or upload failure; nothing
    /// further is attempted after it.
    pub fn publish(
        &self,
        version: &Version,
        resolved: &[ResolvedPlatform<'_>],
    ) -> Result<PublishReport> {
        let staging = TempDir::new().map_err(ReleaseError::io("create staging directory"))?;
        let mut report = PublishReport::default();
        let mut downloads = Vec::with_capacity(resolved.len());

        for entry in resolved {
            let platform = entry.platform;
            let mut download = ToolsDownload::new(platform.name(), platform.arch());
            for artifact in &entry.artifacts {
                let ext = artifact.extension();
                let unstable = ReleaseFileName::new(platform, Channel::Unstable, ext).to_string();
                let unstable_path = staging.path().join(&unstable);

                info!("downloading {}", artifact.url);
                self.fetcher.fetch(&artifact.url, &unstable_path)?;
                self.upload(&unstable_path, &mut report)?;

                if !version.is_stable() {
                    continue;
                }

                let stable =
                    ReleaseFileName::new(platform, Channel::Stable(version), ext).to_string();
                let latest =
                    ReleaseFileName::new(platform, Channel::LatestStable, ext).to_string();
                let stable_path = staging.path().join(&stable);
                let latest_path = staging.path().join(&latest);
                copy(&unstable_path, &stable_path)?;
                copy(&unstable_path, &latest_path)?;

                let url = format!(
                    "{}/{stable}",
                    self.feed.download_base_url.trim_end_matches('/')
                );
                download.attach(ext, ToolsFile::new(url, checksums(&latest_path)?));

                self.upload(&stable_path, &mut report)?;
                self.upload(&latest_path, &mut report)?;
            }
            downloads.push(download);
        }

        if version.is_stable() {
            let feed = JsonFeed::single(version.string_without_pre(), downloads);
            let feed_path = staging.path().join(&self.feed.file_name);
            feed.write_to(&feed_path)?;
            self.upload(&feed_path, &mut report)?;
            report.feed = Some(feed);
        }

        Ok(report)
    }

    fn upload(&self, path: &Path, report: &mut PublishReport) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(
            "uploading to {}",
            s3_uri(&self.storage.bucket, &self.storage.prefix, &name)
        );
        self.store
            .upload_file(&self.storage.bucket, &self.storage.prefix, path)?;
        report.uploaded.push(name);
        Ok(())
    }
}

fn copy(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(ReleaseError::io(format!(
            "copy {} to {}",
            from.display(),
            to.display()
        )))
}

/// The `upload-release` flow: reconcile the sign tasks of the version's
/// commit, then publish.
///
/// Returns `Ok(None)` without touching the CI API or the store when
/// `is_patch_build` is set.
///
/// # Errors
///
/// Returns any reconciliation or publishing error.
pub fn upload_release(
    version: &Version,
    reconciler: &Reconciler<'_>,
    publisher: &Publisher<'_>,
    is_patch_build: bool,
) -> Result<Option<PublishReport>> {
    if is_patch_build {
        info!("current build is a patch; not uploading a release");
        return Ok(None);
    }
    let resolved = reconciler.reconcile(&version.commit)?;
    publisher.publish(version, &resolved).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::Task;
    use crate::download::MockArtifactFetcher;
    use crate::platform::{OsFamily, PackageKind, Platform, PlatformMatrix};
    use crate::storage::MockObjectStore;
    use crate::test_utils::{RecordingStore, StaticCi, StaticFetcher, sign_task};
    use rstest::{fixture, rstest};

    const TGZ_URL: &str = "https://ci/rhel70/release.tgz";
    const RPM_URL: &str = "https://ci/rhel70/release.rpm";

    #[fixture]
    fn platform() -> Platform {
        Platform::new("rhel70", "x86_64", "rhel70", OsFamily::Linux, PackageKind::Rpm)
    }

    fn resolved(platform: &Platform) -> Vec<ResolvedPlatform<'_>> {
        vec![ResolvedPlatform {
            platform,
            task: sign_task("rhel70"),
            artifacts: [TGZ_URL, RPM_URL]
                .iter()
                .map(|u| crate::ci::Artifact {
                    url: (*u).to_owned(),
                })
                .collect(),
        }]
    }

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with(TGZ_URL, b"tarball bytes")
            .with(RPM_URL, b"rpm bytes")
    }

    fn stable() -> Version {
        Version::parse("100.3.1", "abc", true).expect("valid version")
    }

    fn unstable() -> Version {
        Version::parse("100.3.1-2-gabc", "abc", false).expect("valid version")
    }

    #[rstest]
    fn unstable_publishes_one_file_per_artifact_and_no_feed(platform: Platform) {
        let store = RecordingStore::new();
        let fetcher = fetcher();
        let (storage, feed) = (StorageConfig::default(), FeedConfig::default());
        let report = Publisher::new(&store, &fetcher, &storage, &feed)
            .publish(&unstable(), &resolved(&platform))
            .expect("publishes");
        assert_eq!(
            store.names(),
            [
                "mongodb-database-tools-rhel70-x86_64-unstable.tgz",
                "mongodb-database-tools-rhel70-x86_64-unstable.rpm",
            ]
        );
        assert!(report.feed.is_none());
    }

    #[rstest]
    fn stable_publishes_three_files_per_artifact_then_feed(platform: Platform) {
        let store = RecordingStore::new();
        let fetcher = fetcher();
        let (storage, feed) = (StorageConfig::default(), FeedConfig::default());
        let report = Publisher::new(&store, &fetcher, &storage, &feed)
            .publish(&stable(), &resolved(&platform))
            .expect("publishes");

        let names = store.names();
        assert_eq!(names.len(), 7);
        assert_eq!(names.last().map(String::as_str), Some("release.json"));
        assert!(names.contains(&"mongodb-database-tools-rhel70-x86_64-100.3.1.rpm".to_owned()));
        assert!(names.contains(&"mongodb-database-tools-rhel70-x86_64-latest-stable.tgz".to_owned()));
        assert_eq!(report.uploaded, names);
        assert!(store.uploads().iter().all(|u| u.bucket == "downloads.mongodb.org"));
    }

    #[rstest]
    fn failed_download_aborts_before_upload(platform: Platform) {
        let mut fetcher = MockArtifactFetcher::new();
        fetcher.expect_fetch().returning(|url, _| {
            Err(ReleaseError::Network {
                url: url.to_owned(),
                reason: "connection reset".to_owned(),
            })
        });
        let mut store = MockObjectStore::new();
        store.expect_upload_file().never();
        let (storage, feed) = (StorageConfig::default(), FeedConfig::default());

        let err = Publisher::new(&store, &fetcher, &storage, &feed)
            .publish(&stable(), &resolved(&platform))
            .expect_err("fails");
        assert!(matches!(err, ReleaseError::Network { .. }));
    }

    #[rstest]
    fn failed_upload_stops_publishing(platform: Platform) {
        let store = RecordingStore::failing_on("mongodb-database-tools-rhel70-x86_64-100.3.1.tgz");
        let fetcher = fetcher();
        let (storage, feed) = (StorageConfig::default(), FeedConfig::default());
        let err = Publisher::new(&store, &fetcher, &storage, &feed)
            .publish(&stable(), &resolved(&platform))
            .expect_err("fails");
        assert!(matches!(err, ReleaseError::Upload { .. }));
        assert_eq!(
            store.names(),
            ["mongodb-database-tools-rhel70-x86_64-unstable.tgz"]
        );
    }

    #[test]
    fn patch_builds_skip_everything() {
        let matrix = PlatformMatrix::database_tools();
        let mut ci = crate::ci::MockCiClient::new();
        ci.expect_tasks_for_revision().never();
        let mut store = MockObjectStore::new();
        store.expect_upload_file().never();
        let fetcher = StaticFetcher::new();
        let (storage, feed) = (StorageConfig::default(), FeedConfig::default());

        let outcome = upload_release(
            &stable(),
            &Reconciler::new(&ci, &matrix),
            &Publisher::new(&store, &fetcher, &storage, &feed),
            true,
        )
        .expect("skips");
        assert!(outcome.is_none());
    }

    #[rstest]
    fn upload_release_reconciles_then_publishes(platform: Platform) {
        let matrix = PlatformMatrix::new(vec![platform]);
        let task: Task = sign_task("rhel70");
        let ci = StaticCi::new().with_task(task, &[TGZ_URL, RPM_URL]);
        let store = RecordingStore::new();
        let fetcher = fetcher();
        let (storage, feed) = (StorageConfig::default(), FeedConfig::default());

        let report = upload_release(
            &unstable(),
            &Reconciler::new(&ci, &matrix),
            &Publisher::new(&store, &fetcher, &storage, &feed),
            false,
        )
        .expect("publishes")
        .expect("not a patch build");
        assert_eq!(report.uploaded.len(), 2);
    }
}
