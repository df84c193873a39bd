//! Release version resolution from source control.
//!
//! A [`Version`] is resolved once per invocation and every artifact name,
//! package field, and feed entry derives from it.

use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use std::fmt;

/// A release version: semantic version, optional pre-release tag, and the
/// commit it was resolved from.
///
/// A version is stable exactly when it has no pre-release tag.
///
/// # Examples
///
/// ```
/// use tools_release::version::Version;
///
/// let v = Version::parse("100.3.1", "abcdef", true).expect("valid describe output");
/// assert!(v.is_stable());
/// assert_eq!(v.to_string(), "100.3.1");
/// assert_eq!(v.rpm_release(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Major version component.
    pub major: u64,
    /// Minor version component.
    pub minor: u64,
    /// Patch version component.
    pub patch: u64,
    /// Pre-release tag, e.g. `12-gabc1234`; absent for tagged releases.
    pub pre: Option<String>,
    /// Full commit hash the version was resolved from.
    pub commit: String,
}

impl Version {
    /// Parse `git describe` output into a version.
    ///
    /// `exact_tag` records whether the revision is itself an annotated tag;
    /// when it is, any describe suffix is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Resolution`] if the describe output is not
    /// `M.m.p` optionally followed by `-<suffix>`, or if the revision is not
    /// an exact tag yet the describe output has no suffix.
    pub fn parse(describe: &str, commit: &str, exact_tag: bool) -> Result<Self> {
        let malformed = |reason: String| ReleaseError::Resolution {
            revision: commit.to_owned(),
            reason,
        };

        let trimmed = describe.trim();
        let unprefixed = trimmed
            .strip_prefix('r')
            .or_else(|| trimmed.strip_prefix('v'))
            .unwrap_or(trimmed);
        let (core, suffix) = match unprefixed.split_once('-') {
            Some((core, suffix)) => (core, Some(suffix)),
            None => (unprefixed, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(malformed(format!(
                "describe output '{trimmed}' is not a three-part version"
            )));
        };
        let number = |part: &str| {
            part.parse::<u64>().map_err(|e| {
                malformed(format!("invalid version component '{part}' in '{trimmed}': {e}"))
            })
        };

        let pre = if exact_tag {
            None
        } else {
            match suffix {
                Some(s) if !s.is_empty() => Some(s.to_owned()),
                _ => {
                    return Err(malformed(format!(
                        "'{trimmed}' has no pre-release suffix but is not an exact tag"
                    )));
                }
            }
        };

        Ok(Self {
            major: number(major)?,
            minor: number(minor)?,
            patch: number(patch)?,
            pre,
            commit: commit.to_owned(),
        })
    }

    /// Whether this is a stable (tagged) release.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.pre.is_none()
    }

    /// The `M.m.p` form with no pre-release tag.
    #[must_use]
    pub fn string_without_pre(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// The RPM `Release` field: `1` when stable, otherwise `0.<pre>` with
    /// every `-` replaced by `.`.
    #[must_use]
    pub fn rpm_release(&self) -> String {
        match &self.pre {
            None => "1".to_owned(),
            Some(pre) => format!("0.{}", pre.replace('-', ".")),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// Resolves versions by asking `git` about a revision.
pub struct VersionResolver<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver running `git` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Resolve the version of the working copy's `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Resolution`] if git metadata is unavailable
    /// or malformed.
    pub fn resolve_current(&self) -> Result<Version> {
        self.resolve_at("HEAD")
    }

    /// Resolve the version at `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Resolution`] if git metadata is unavailable
    /// or malformed.
    pub fn resolve_at(&self, revision: &str) -> Result<Version> {
        let unavailable = |err: ReleaseError| ReleaseError::Resolution {
            revision: revision.to_owned(),
            reason: err.to_string(),
        };

        let describe = run_checked(self.executor, "git", &["describe", revision])
            .map_err(unavailable)?;
        let commit = run_checked(self.executor, "git", &["rev-parse", revision])
            .map_err(unavailable)?;
        let exact_tag = self.is_tagged_release(revision);

        Version::parse(&describe, &commit, exact_tag)
    }

    /// Whether `revision` is exactly an annotated tag.
    fn is_tagged_release(&self, revision: &str) -> bool {
        self.executor
            .run("git", &["describe", "--exact", revision])
            .is_ok_and(|o| o.status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        ExpectedCall, StubExecutor, failure_output, output_with_stdout,
    };
    use rstest::rstest;

    #[rstest]
    #[case::plain("100.3.1", true, "100.3.1", true)]
    #[case::r_prefix("r100.3.1", true, "100.3.1", true)]
    #[case::untagged("100.3.1-12-gabc1234", false, "100.3.1-12-gabc1234", false)]
    #[case::tagged_with_suffix_ignored("100.3.1-12-gabc1234", true, "100.3.1", true)]
    fn parse_describe_output(
        #[case] describe: &str,
        #[case] exact: bool,
        #[case] display: &str,
        #[case] stable: bool,
    ) {
        let v = Version::parse(describe, "abcdef", exact).expect("parses");
        assert_eq!(v.to_string(), display);
        assert_eq!(v.is_stable(), stable);
        assert_eq!(v.commit, "abcdef");
    }

    #[rstest]
    #[case::two_parts("100.3", true)]
    #[case::non_numeric("100.x.1", true)]
    #[case::empty("", true)]
    #[case::untagged_without_suffix("100.3.1", false)]
    fn parse_rejects_malformed(#[case] describe: &str, #[case] exact: bool) {
        let err = Version::parse(describe, "abcdef", exact).expect_err("rejected");
        assert!(matches!(err, ReleaseError::Resolution { .. }));
    }

    #[test]
    fn rpm_release_replaces_dashes() {
        let v = Version::parse("100.3.1-12-gabc1234", "abcdef", false).expect("parses");
        assert_eq!(v.rpm_release(), "0.12.gabc1234");
        assert_eq!(v.string_without_pre(), "100.3.1");
    }

    #[test]
    fn resolve_current_queries_head() {
        let executor = StubExecutor::new(vec![
            ExpectedCall {
                cmd: "git",
                args: vec!["describe", "HEAD"],
                result: Ok(output_with_stdout("100.3.1\n")),
            },
            ExpectedCall {
                cmd: "git",
                args: vec!["rev-parse", "HEAD"],
                result: Ok(output_with_stdout("abcdef0123\n")),
            },
            ExpectedCall {
                cmd: "git",
                args: vec!["describe", "--exact", "HEAD"],
                result: Ok(output_with_stdout("100.3.1\n")),
            },
        ]);

        let v = VersionResolver::new(&executor)
            .resolve_current()
            .expect("resolves");
        assert!(v.is_stable());
        assert_eq!(v.commit, "abcdef0123");
        executor.assert_finished();
    }

    #[test]
    fn resolve_at_untagged_revision_is_unstable() {
        let executor = StubExecutor::new(vec![
            ExpectedCall {
                cmd: "git",
                args: vec!["describe", "deadbeef"],
                result: Ok(output_with_stdout("100.3.1-4-gdeadbee\n")),
            },
            ExpectedCall {
                cmd: "git",
                args: vec!["rev-parse", "deadbeef"],
                result: Ok(output_with_stdout("deadbeef42\n")),
            },
            ExpectedCall {
                cmd: "git",
                args: vec!["describe", "--exact", "deadbeef"],
                result: Ok(failure_output("fatal: no tag exactly matches")),
            },
        ]);

        let v = VersionResolver::new(&executor)
            .resolve_at("deadbeef")
            .expect("resolves");
        assert!(!v.is_stable());
        assert_eq!(v.pre.as_deref(), Some("4-gdeadbee"));
        assert_eq!(v.commit, "deadbeef42");
    }

    #[test]
    fn resolve_fails_without_git_metadata() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "git",
            args: vec!["describe", "HEAD"],
            result: Ok(failure_output("fatal: No names found")),
        }]);
        let err = VersionResolver::new(&executor)
            .resolve_current()
            .expect_err("fails");
        assert!(err.to_string().contains("No names found"));
    }
}
