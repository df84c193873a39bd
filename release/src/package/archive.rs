//! Gzip tarball and zip archive creation.
//!
//! Archives are written to a temporary file in the destination directory
//! and renamed into place once complete, so an interrupted build never
//! leaves a truncated archive under its final name.

use super::PackageContext;
use crate::error::{ReleaseError, Result};
use crate::naming::release_name;
use crate::platform::OsFamily;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::info;
use std::fs::{File, Metadata};
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// A file to add to an archive: its source path and its name inside the
/// archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File on disk.
    pub source: Utf8PathBuf,
    /// Path inside the archive, `/`-separated.
    pub name: String,
}

impl ArchiveEntry {
    /// Pair a source path with an archive name.
    #[must_use]
    pub fn new(source: Utf8PathBuf, name: String) -> Self {
        Self { source, name }
    }
}

/// Build `release.zip` on windows or `release.tgz` elsewhere.
///
/// Entries are the static files under `<release-name>/` followed by the
/// binaries under `<release-name>/bin/` (with `.exe` appended in zips).
///
/// # Errors
///
/// Returns [`ReleaseError::ArchiveWrite`] if any source file cannot be read
/// or the archive cannot be written.
pub fn build_archive(ctx: &PackageContext<'_>) -> Result<Utf8PathBuf> {
    let root = release_name(ctx.platform, ctx.version);
    let windows = ctx.platform.os() == OsFamily::Windows;
    let exe_suffix = if windows { ".exe" } else { "" };

    let mut entries: Vec<ArchiveEntry> = ctx
        .inputs
        .static_files
        .iter()
        .map(|f| ArchiveEntry::new(ctx.inputs.static_file(f), format!("{root}/{f}")))
        .collect();
    entries.extend(ctx.inputs.binaries.iter().map(|b| {
        ArchiveEntry::new(ctx.inputs.binary(b), format!("{root}/bin/{b}{exe_suffix}"))
    }));

    if windows {
        let path = ctx.output_file("zip");
        info!("building zip archive {path}");
        write_zip(&path, &entries)?;
        Ok(path)
    } else {
        let path = ctx.output_file("tgz");
        info!("building tarball archive {path}");
        write_tarball(&path, &entries)?;
        Ok(path)
    }
}

/// Write a gzip-compressed tarball at `path`.
///
/// Entries keep their source permission bits and carry a zero timestamp.
///
/// # Errors
///
/// Returns [`ReleaseError::ArchiveWrite`] on any read or write failure.
pub fn write_tarball(path: &Utf8Path, entries: &[ArchiveEntry]) -> Result<()> {
    write_atomically(path, |tmp| {
        let mut builder = tar::Builder::new(GzEncoder::new(tmp, Compression::default()));
        for entry in entries {
            let (mut file, metadata) = open_source(&entry.source)?;
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(metadata.len());
            header.set_mode(file_mode(&metadata));
            header.set_mtime(0);
            builder
                .append_data(&mut header, &entry.name, &mut file)
                .map_err(|e| describe(&entry.name, &e))?;
        }
        builder
            .into_inner()
            .and_then(GzEncoder::finish)
            .map_err(|e| format!("finish archive: {e}"))
    })
}

/// Write a zip archive at `path` with every entry Deflate-compressed.
///
/// # Errors
///
/// Returns [`ReleaseError::ArchiveWrite`] on any read or write failure.
pub fn write_zip(path: &Utf8Path, entries: &[ArchiveEntry]) -> Result<()> {
    write_atomically(path, |tmp| {
        let mut zip = zip::ZipWriter::new(tmp);
        for entry in entries {
            let (mut file, metadata) = open_source(&entry.source)?;
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .last_modified_time(zip::DateTime::default())
                .unix_permissions(file_mode(&metadata));
            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| describe(&entry.name, &e))?;
            io::copy(&mut file, &mut zip).map_err(|e| describe(&entry.name, &e))?;
        }
        zip.finish().map_err(|e| format!("finish archive: {e}"))
    })
}

/// Create a temporary file next to `path`, let `write` fill it, and rename
/// it to `path` on success.
fn write_atomically<F>(path: &Utf8Path, write: F) -> Result<()>
where
    F: FnOnce(NamedTempFile) -> std::result::Result<NamedTempFile, String>,
{
    let failed = |reason: String| ReleaseError::ArchiveWrite {
        path: path.to_owned(),
        reason,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".release")
        .tempfile_in(dir)
        .map_err(|e| failed(format!("create temporary file: {e}")))?;
    let mut tmp = write(tmp).map_err(failed)?;
    tmp.flush()
        .map_err(|e| failed(format!("flush archive: {e}")))?;
    tmp.persist(path)
        .map_err(|e| failed(format!("rename into place: {}", e.error)))?;
    Ok(())
}

fn open_source(path: &Utf8Path) -> std::result::Result<(File, Metadata), String> {
    let file = File::open(path).map_err(|e| format!("open {path}: {e}"))?;
    let metadata = file.metadata().map_err(|e| format!("stat {path}: {e}"))?;
    Ok((file, metadata))
}

fn describe(name: &str, err: &dyn std::fmt::Display) -> String {
    format!("add {name}: {err}")
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
