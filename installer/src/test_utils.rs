//! Shared test utilities for the installer crate.

use crate::artefact::download::{ArtefactDownloader, DownloadError};
use crate::manifest::install_entry::InstallEntry;
use crate::manifest::{Manifest, ManifestMetadata, ManifestRecipe, ManifestSource};
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::cell::Cell;
use std::io::{Cursor, Write};
use std::path::Path;

/// A file to place in a test archive.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveFile<'a> {
    /// Path of the entry inside the archive.
    pub path: &'a str,
    /// File contents.
    pub contents: &'a [u8],
    /// Unix permission bits.
    pub mode: u32,
}

/// Build an uncompressed tarball containing `files`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[must_use]
pub fn tar_bytes(files: &[ArchiveFile<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for file in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(file.contents.len() as u64);
        header.set_mode(file.mode);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, file.path, file.contents)
            .expect("append tar entry");
    }
    builder.into_inner().expect("finish tar")
}

/// Build a `.tar.gz` archive containing `files`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[must_use]
pub fn tar_gz_archive(files: &[ArchiveFile<'_>]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&tar_bytes(files))
        .expect("write gzip stream");
    encoder.finish().expect("finish gzip")
}

/// Build a `.tar.zst` archive containing `files`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[must_use]
pub fn tar_zst_archive(files: &[ArchiveFile<'_>]) -> Vec<u8> {
    zstd::encode_all(Cursor::new(tar_bytes(files)), 0).expect("zstd encode")
}

/// Build a `.zip` archive containing `files`.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[must_use]
pub fn zip_archive(files: &[ArchiveFile<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for file in files {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(file.mode);
        writer.start_file(file.path, options).expect("start zip entry");
        writer.write_all(file.contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Return the lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Build a manifest for `name` served from `url`.
///
/// `test` is the smoke-test command; pass an empty slice for none.
///
/// # Panics
///
/// Panics if any of the supplied values fail validation.
#[must_use]
pub fn sample_manifest(
    url: &str,
    sha256: &str,
    entries: Vec<InstallEntry>,
    test: &[&str],
) -> Manifest {
    let source = ManifestSource {
        url: url.try_into().expect("valid test URL"),
        sha256: sha256.try_into().expect("valid test digest"),
    };
    let recipe = ManifestRecipe::new(entries, test.iter().map(|s| (*s).to_owned()).collect())
        .expect("valid test recipe");
    Manifest::new(
        "agent".try_into().expect("valid test name"),
        ManifestMetadata::default(),
        source,
        recipe,
    )
}

/// How a [`StubDownloader`] responds.
#[derive(Debug, Clone)]
enum StubResponse {
    Body(Vec<u8>),
    NotFound,
}

/// An [`ArtefactDownloader`] that serves a fixed response without network
/// access and counts how often it is called.
#[derive(Debug)]
pub struct StubDownloader {
    response: StubResponse,
    calls: Cell<usize>,
}

impl StubDownloader {
    /// Serve `body` for every request.
    #[must_use]
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            response: StubResponse::Body(body),
            calls: Cell::new(0),
        }
    }

    /// Answer every request with HTTP 404.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            response: StubResponse::NotFound,
            calls: Cell::new(0),
        }
    }

    /// Number of download requests received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArtefactDownloader for StubDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.calls.set(self.calls.get() + 1);
        match &self.response {
            StubResponse::Body(body) => std::fs::write(dest, body).map_err(DownloadError::Io),
            StubResponse::NotFound => Err(DownloadError::NotFound {
                url: url.to_owned(),
            }),
        }
    }
}

/// Write an executable shell script at `path` (Unix only).
///
/// # Panics
///
/// Panics if the script cannot be written or made executable.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create script directory");
    }
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("make script executable");
}
