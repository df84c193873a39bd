//! CI task queries.
//!
//! The release flow asks the CI system which tasks ran for a revision and
//! which files each sign task produced. [`CiClient`] is the seam; the
//! production adapter talks to the Evergreen REST v2 API.

use crate::config::EvergreenConfig;
use crate::error::{ReleaseError, Result};
use crate::http::{agent, map_ureq_error};
use log::debug;
use serde::Deserialize;

/// Environment variable holding the Evergreen API user.
pub const USER_ENV: &str = "EVG_USER";
/// Environment variable holding the Evergreen API key.
pub const KEY_ENV: &str = "EVG_KEY";
/// Environment variable set to `true` when the current build is a patch.
pub const IS_PATCH_ENV: &str = "EVG_IS_PATCH";

/// Requesters that mark a task as belonging to a patch build.
const PATCH_REQUESTERS: [&str; 2] = ["patch_request", "github_pull_request"];

/// A CI task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique task identifier.
    pub task_id: String,
    /// Build variant the task ran on.
    pub variant: String,
    /// Display name, e.g. `sign`.
    pub display_name: String,
    /// Whether the task belongs to a patch build.
    pub is_patch: bool,
}

impl Task {
    /// Whether this is a non-patch task named `sign`.
    #[must_use]
    pub fn is_release_sign_task(&self) -> bool {
        self.display_name == "sign" && !self.is_patch
    }
}

/// A file produced by a CI task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    /// Download URL.
    pub url: String,
}

impl Artifact {
    /// Extension of the URL path including the leading dot, e.g. `.tgz`.
    ///
    /// Returns an empty string when the last path segment has no dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use tools_release::ci::Artifact;
    ///
    /// let a = Artifact { url: "https://ci.example/files/release.tgz?x=1".to_owned() };
    /// assert_eq!(a.extension(), ".tgz");
    /// ```
    #[must_use]
    pub fn extension(&self) -> &str {
        let path = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let segment = path.rsplit('/').next().unwrap_or_default();
        segment.rfind('.').map_or("", |idx| &segment[idx..])
    }
}

/// Trait for querying CI tasks and their artifacts.
#[cfg_attr(test, mockall::automock)]
pub trait CiClient {
    /// List every task that ran for `commit`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Network`] if the API cannot be queried.
    fn tasks_for_revision(&self, commit: &str) -> Result<Vec<Task>>;

    /// List the artifacts produced by `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Network`] if the API cannot be queried.
    fn artifacts_for_task(&self, task_id: &str) -> Result<Vec<Artifact>>;
}

/// Read whether the current CI build is a patch build.
#[must_use]
pub fn current_build_is_patch() -> bool {
    std::env::var(IS_PATCH_ENV).is_ok_and(|v| v == "true")
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    task_id: String,
    build_variant: String,
    display_name: String,
    #[serde(default)]
    requester: String,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            is_patch: PATCH_REQUESTERS.contains(&record.requester.as_str()),
            task_id: record.task_id,
            variant: record.build_variant,
            display_name: record.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskDetail {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// Evergreen REST v2 client.
#[derive(Debug, Clone)]
pub struct EvergreenClient {
    api_base: String,
    project: String,
    user: String,
    key: String,
}

impl EvergreenClient {
    /// Create a client with explicit credentials.
    #[must_use]
    pub fn new(config: &EvergreenConfig, user: &str, key: &str) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            project: config.project.clone(),
            user: user.to_owned(),
            key: key.to_owned(),
        }
    }

    /// Create a client with credentials read from [`USER_ENV`] and
    /// [`KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if either variable is unset.
    pub fn from_env(config: &EvergreenConfig) -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name).map_err(|_| ReleaseError::Configuration {
                message: format!("{name} must be set to query the Evergreen API"),
            })
        };
        Ok(Self::new(config, &read(USER_ENV)?, &read(KEY_ENV)?))
    }

    fn get(&self, url: &str) -> Result<(String, Option<String>)> {
        debug!("GET {url}");
        let response = agent()
            .get(url)
            .header("Api-User", &self.user)
            .header("Api-Key", &self.key)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let next = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| map_ureq_error(url, &e))?;
        Ok((body, next))
    }
}

impl CiClient for EvergreenClient {
    fn tasks_for_revision(&self, commit: &str) -> Result<Vec<Task>> {
        let mut url = Some(format!(
            "{}/rest/v2/projects/{}/revisions/{commit}/tasks",
            self.api_base, self.project
        ));
        let mut tasks = Vec::new();
        while let Some(current) = url {
            let (body, next) = self.get(&current)?;
            let page: Vec<TaskRecord> = parse_json(&current, &body)?;
            tasks.extend(page.into_iter().map(Task::from));
            url = next;
        }
        Ok(tasks)
    }

    fn artifacts_for_task(&self, task_id: &str) -> Result<Vec<Artifact>> {
        let url = format!("{}/rest/v2/tasks/{task_id}", self.api_base);
        let (body, _) = self.get(&url)?;
        let detail: TaskDetail = parse_json(&url, &body)?;
        Ok(detail.artifacts)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ReleaseError::Network {
        url: url.to_owned(),
        reason: format!("invalid response body: {e}"),
    })
}

/// Extract the `rel="next"` target from an HTTP `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().replace(' ', "") == "rel=\"next\"");
        is_next.then(|| {
            target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_owned()
        })
    })
}
