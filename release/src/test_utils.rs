//! In-memory collaborators shared by unit and integration tests.

use crate::ci::{Artifact, CiClient, Task};
use crate::download::ArtifactFetcher;
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::storage::ObjectStore;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    output_with_stdout("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "git").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` that expects an exact,
/// ordered sequence of invocations.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args.as_slice(), args);

        call.result
    }
}

/// A `CommandExecutor` that delegates to a closure and records every call.
///
/// Useful when arguments contain temporary paths a test cannot predict.
pub struct FnExecutor<F>
where
    F: Fn(&str, &[&str]) -> Result<Output>,
{
    handler: F,
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl<F> FnExecutor<F>
where
    F: Fn(&str, &[&str]) -> Result<Output>,
{
    /// Wrap `handler` as an executor.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Return the commands run so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl<F> CommandExecutor for FnExecutor<F>
where
    F: Fn(&str, &[&str]) -> Result<Output>,
{
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        self.calls.borrow_mut().push((
            cmd.to_owned(),
            args.iter().map(|a| (*a).to_owned()).collect(),
        ));
        (self.handler)(cmd, args)
    }
}

/// A single upload captured by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Destination bucket.
    pub bucket: String,
    /// Destination prefix.
    pub prefix: String,
    /// File name of the uploaded file.
    pub name: String,
    /// Bytes of the file at upload time.
    pub contents: Vec<u8>,
}

/// An `ObjectStore` that keeps every upload in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingStore {
    uploads: RefCell<Vec<RecordedUpload>>,
    fail_on: Option<String>,
}

impl RecordingStore {
    /// Create a store that accepts every upload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects the upload of `name`.
    #[must_use]
    pub fn failing_on(name: &str) -> Self {
        Self {
            uploads: RefCell::new(Vec::new()),
            fail_on: Some(name.to_owned()),
        }
    }

    /// Return every upload so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.borrow().clone()
    }

    /// Return the uploaded file names, in upload order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.uploads.borrow().iter().map(|u| u.name.clone()).collect()
    }
}

impl ObjectStore for RecordingStore {
    fn upload_file(&self, bucket: &str, prefix: &str, local_path: &Path) -> Result<()> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(ReleaseError::Upload {
                file: name,
                destination: format!("{bucket}{prefix}"),
                reason: "injected failure".to_owned(),
            });
        }
        let contents =
            std::fs::read(local_path).map_err(ReleaseError::io("read upload source"))?;
        self.uploads.borrow_mut().push(RecordedUpload {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
            name,
            contents,
        });
        Ok(())
    }
}

/// An `ArtifactFetcher` serving canned bytes keyed by URL.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    files: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `contents` for `url`.
    #[must_use]
    pub fn with(mut self, url: &str, contents: &[u8]) -> Self {
        self.files.insert(url.to_owned(), contents.to_vec());
        self
    }
}

impl ArtifactFetcher for StaticFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let contents = self.files.get(url).ok_or_else(|| ReleaseError::Network {
            url: url.to_owned(),
            reason: "HTTP status 404".to_owned(),
        })?;
        std::fs::write(dest, contents).map_err(ReleaseError::io("write release file"))
    }
}

/// A `CiClient` answering from a fixed task list and artifact map.
#[derive(Debug, Default)]
pub struct StaticCi {
    tasks: Vec<Task>,
    artifacts: HashMap<String, Vec<Artifact>>,
}

impl StaticCi {
    /// Create a client with no tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task and the artifact URLs it produced.
    #[must_use]
    pub fn with_task(mut self, task: Task, urls: &[&str]) -> Self {
        let artifacts = urls
            .iter()
            .map(|url| Artifact {
                url: (*url).to_owned(),
            })
            .collect();
        self.artifacts.insert(task.task_id.clone(), artifacts);
        self.tasks.push(task);
        self
    }
}

impl CiClient for StaticCi {
    fn tasks_for_revision(&self, _commit: &str) -> Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn artifacts_for_task(&self, task_id: &str) -> Result<Vec<Artifact>> {
        Ok(self.artifacts.get(task_id).cloned().unwrap_or_default())
    }
}

/// Build a non-patch sign task for `variant`.
#[must_use]
pub fn sign_task(variant: &str) -> Task {
    Task {
        task_id: format!("mongo_tools_{variant}_sign"),
        variant: variant.to_owned(),
        display_name: "sign".to_owned(),
        is_patch: false,
    }
}
