//! MongoDB Database Tools release library.
//!
//! This crate provides the steps that turn a built source tree into
//! published release artefacts: version resolution from git, archive and
//! installer packaging, sign-task reconciliation against the CI API, and
//! upload of the artefacts together with a JSON download feed. It is used by
//! the `release` CLI binary and can be driven programmatically in tests.
//!
//! # Modules
//!
//! - [`checksum`] - MD5, SHA-1 and SHA-256 file digests
//! - [`ci`] - Evergreen task and artefact queries
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `release.toml` configuration
//! - [`download`] - Artefact downloads
//! - [`error`] - Semantic error types
//! - [`exec`] - External command execution
//! - [`feed`] - JSON download feed
//! - [`naming`] - Published file names
//! - [`package`] - Archive, deb, rpm and msi assembly
//! - [`platform`] - Platform matrix and detection
//! - [`publish`] - Upload orchestration
//! - [`reconcile`] - Sign-task reconciliation
//! - [`storage`] - Object storage uploads
//! - [`template`] - Installer metadata templates
//! - [`version`] - Version resolution from git

pub mod checksum;
pub mod ci;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod exec;
pub mod feed;
mod http;
pub mod naming;
pub mod package;
pub mod platform;
pub mod publish;
pub mod reconcile;
pub mod storage;
pub mod template;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
