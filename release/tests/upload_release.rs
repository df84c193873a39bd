//! End-to-end tests for the `upload-release` flow.
//!
//! These tests drive reconciliation and publishing together through the
//! in-memory collaborators from `test_utils`, so no network or object store
//! is touched.

use rstest::{fixture, rstest};
use tools_release::checksum::checksums;
use tools_release::config::{FeedConfig, StorageConfig};
use tools_release::error::{ReconcileError, ReleaseError};
use tools_release::platform::{OsFamily, PackageKind, Platform, PlatformMatrix};
use tools_release::publish::{PublishReport, Publisher, upload_release};
use tools_release::reconcile::Reconciler;
use tools_release::test_utils::{RecordingStore, StaticCi, StaticFetcher, sign_task};
use tools_release::version::Version;

const RPM_URL: &str = "https://host/foo.rpm";
const RPM_BYTES: &[u8] = b"signed rpm payload";

fn linux_x64() -> Platform {
    Platform::new("linux", "x64", "linux-x64", OsFamily::Linux, PackageKind::Rpm)
        .with_extensions(&["rpm"])
}

#[fixture]
fn stable() -> Version {
    Version::parse("100.3.1", "abcdef", true).expect("valid version")
}

/// Run `upload_release` for `version` against `ci` and `matrix`, recording
/// uploads in `store`.
fn release(
    version: &Version,
    ci: &StaticCi,
    matrix: &PlatformMatrix,
    fetcher: &StaticFetcher,
    store: &RecordingStore,
) -> Result<Option<PublishReport>, ReleaseError> {
    let storage = StorageConfig::default();
    let feed = FeedConfig::default();
    let reconciler = Reconciler::new(ci, matrix);
    let publisher = Publisher::new(store, fetcher, &storage, &feed);
    upload_release(version, &reconciler, &publisher, false)
}

/// A matrix of `count` rpm-only linux platforms named `linux-<n>`.
fn rpm_matrix(count: usize) -> PlatformMatrix {
    PlatformMatrix::new(
        (0..count)
            .map(|n| {
                let name = format!("linux-{n}");
                Platform::new(&name, "x86_64", &name, OsFamily::Linux, PackageKind::Rpm)
                    .with_extensions(&["rpm"])
            })
            .collect(),
    )
}

fn rpm_ci(variants: impl IntoIterator<Item = String>) -> (StaticCi, StaticFetcher) {
    let mut ci = StaticCi::new();
    let mut fetcher = StaticFetcher::new();
    for variant in variants {
        let url = format!("https://host/{variant}/release.rpm");
        ci = ci.with_task(sign_task(&variant), &[&url]);
        fetcher = fetcher.with(&url, variant.as_bytes());
    }
    (ci, fetcher)
}

#[rstest]
fn stable_rpm_release_publishes_three_names_and_feed(stable: Version) {
    let matrix = PlatformMatrix::new(vec![linux_x64()]);
    let ci = StaticCi::new().with_task(sign_task("linux-x64"), &[RPM_URL]);
    let fetcher = StaticFetcher::new().with(RPM_URL, RPM_BYTES);
    let store = RecordingStore::new();

    let report = release(&stable, &ci, &matrix, &fetcher, &store)
        .expect("publishes")
        .expect("not a patch build");

    assert_eq!(
        store.names(),
        [
            "mongodb-database-tools-linux-x64-unstable.rpm",
            "mongodb-database-tools-linux-x64-100.3.1.rpm",
            "mongodb-database-tools-linux-x64-latest-stable.rpm",
            "release.json",
        ]
    );
    assert_eq!(report.uploaded, store.names());

    let feed = report.feed.expect("stable releases publish a feed");
    assert_eq!(feed.versions.len(), 1);
    assert_eq!(feed.versions[0].version, "100.3.1");
    let download = &feed.versions[0].downloads[0];
    assert_eq!(download.name, "linux");
    assert_eq!(download.arch, "x64");
    assert!(download.archive.is_none());
    let package = download.package.as_ref().expect("package entry");
    assert_eq!(
        package.url,
        "https://fastdl.mongodb.org/tools/db/mongodb-database-tools-linux-x64-100.3.1.rpm"
    );
}

#[rstest]
fn feed_checksums_match_latest_stable_upload(stable: Version) {
    let matrix = PlatformMatrix::new(vec![linux_x64()]);
    let ci = StaticCi::new().with_task(sign_task("linux-x64"), &[RPM_URL]);
    let fetcher = StaticFetcher::new().with(RPM_URL, RPM_BYTES);
    let store = RecordingStore::new();

    let report = release(&stable, &ci, &matrix, &fetcher, &store)
        .expect("publishes")
        .expect("not a patch build");

    let latest = store
        .uploads()
        .into_iter()
        .find(|u| u.name.ends_with("latest-stable.rpm"))
        .expect("latest-stable upload");
    let dir = tempfile::tempdir().expect("temp dir");
    let copy = dir.path().join(&latest.name);
    std::fs::write(&copy, &latest.contents).expect("write copy");
    let expected = checksums(&copy).expect("checksums");

    let feed = report.feed.expect("feed");
    let package = feed.versions[0].downloads[0]
        .package
        .clone()
        .expect("package entry");
    assert_eq!(package.md5, expected.md5);
    assert_eq!(package.sha1, expected.sha1);
    assert_eq!(package.sha256, expected.sha256);

    let feed_upload = store.uploads().pop().expect("feed upload");
    let published: serde_json::Value =
        serde_json::from_slice(&feed_upload.contents).expect("feed is JSON");
    assert_eq!(
        published["versions"][0]["downloads"][0]["package"]["sha256"],
        expected.sha256.as_str()
    );
}

#[test]
fn unstable_release_uploads_one_file_per_artifact() {
    let version = Version::parse("100.3.1-12-gabc1234", "abc1234", false).expect("valid");
    let matrix = rpm_matrix(3);
    let (ci, fetcher) = rpm_ci((0..3).map(|n| format!("linux-{n}")));
    let store = RecordingStore::new();

    let report = release(&version, &ci, &matrix, &fetcher, &store)
        .expect("publishes")
        .expect("not a patch build");

    assert_eq!(store.names().len(), 3);
    assert!(store.names().iter().all(|n| n.ends_with("-unstable.rpm")));
    assert!(report.feed.is_none());
}

#[rstest]
fn missing_sign_task_fails_before_any_upload(stable: Version) {
    let matrix = rpm_matrix(12);
    let (ci, fetcher) = rpm_ci((0..11).map(|n| format!("linux-{n}")));
    let store = RecordingStore::new();

    let err = release(&stable, &ci, &matrix, &fetcher, &store).expect_err("fails");

    assert!(matches!(
        err,
        ReleaseError::Reconciliation(ReconcileError::SignTaskCount {
            found: 11,
            expected: 12
        })
    ));
    assert!(store.uploads().is_empty());
}

#[rstest]
fn unknown_variant_fails_before_any_upload(stable: Version) {
    let matrix = rpm_matrix(2);
    let (ci, fetcher) = rpm_ci(["linux-0".to_owned(), "solaris".to_owned()]);
    let store = RecordingStore::new();

    let err = release(&stable, &ci, &matrix, &fetcher, &store).expect_err("fails");

    assert!(matches!(
        err,
        ReleaseError::Reconciliation(ReconcileError::UnknownVariant { ref variant })
            if variant == "solaris"
    ));
    assert!(store.uploads().is_empty());
}

#[rstest]
fn duplicate_sign_task_fails_before_any_upload(stable: Version) {
    let matrix = rpm_matrix(2);
    let (ci, fetcher) = rpm_ci(["linux-0", "linux-0"].map(str::to_owned));
    let store = RecordingStore::new();

    let err = release(&stable, &ci, &matrix, &fetcher, &store).expect_err("fails");

    assert!(matches!(
        err,
        ReleaseError::Reconciliation(ReconcileError::DuplicateVariant { ref variant })
            if variant == "linux-0"
    ));
    assert!(store.uploads().is_empty());
}

#[rstest]
fn republishing_overwrites_the_same_names(stable: Version) {
    let matrix = rpm_matrix(2);
    let (ci, fetcher) = rpm_ci((0..2).map(|n| format!("linux-{n}")));
    let store = RecordingStore::new();

    release(&stable, &ci, &matrix, &fetcher, &store).expect("first run");
    let first = store.uploads();
    release(&stable, &ci, &matrix, &fetcher, &store).expect("second run");
    let all = store.uploads();

    assert_eq!(all.len(), first.len() * 2);
    assert_eq!(&all[first.len()..], first.as_slice());
}

#[rstest]
fn feed_lists_platforms_in_matrix_order(stable: Version) {
    let matrix = rpm_matrix(3);
    let (ci, fetcher) = rpm_ci(["linux-2", "linux-0", "linux-1"].map(str::to_owned));
    let store = RecordingStore::new();

    let report = release(&stable, &ci, &matrix, &fetcher, &store)
        .expect("publishes")
        .expect("not a patch build");

    let names: Vec<String> = report.feed.expect("feed").versions[0]
        .downloads
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(names, ["linux-0", "linux-1", "linux-2"]);
}

#[rstest]
fn patch_builds_publish_nothing(stable: Version) {
    let matrix = rpm_matrix(1);
    let (ci, fetcher) = rpm_ci(["linux-0".to_owned()]);
    let store = RecordingStore::new();
    let storage = StorageConfig::default();
    let feed = FeedConfig::default();
    let reconciler = Reconciler::new(&ci, &matrix);
    let publisher = Publisher::new(&store, &fetcher, &storage, &feed);

    let report = upload_release(&stable, &reconciler, &publisher, true).expect("skipped");

    assert!(report.is_none());
    assert!(store.uploads().is_empty());
}
