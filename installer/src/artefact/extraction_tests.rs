//! Unit tests for archive extraction.

use super::*;
use crate::test_utils::{ArchiveFile, tar_bytes, tar_gz_archive, tar_zst_archive, zip_archive};
use rstest::rstest;

const AGENT: ArchiveFile<'static> = ArchiveFile {
    path: "agent",
    contents: b"#!/bin/sh\necho agent 1.0.0\n",
    mode: 0o755,
};

const README: ArchiveFile<'static> = ArchiveFile {
    path: "docs/README.md",
    contents: b"agent docs",
    mode: 0o644,
};

fn extract_bytes(name: &str, bytes: &[u8]) -> (tempfile::TempDir, Result<Vec<PathBuf>, ExtractionError>) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let archive_path = temp_dir.path().join(name);
    fs::write(&archive_path, bytes).expect("write archive");
    let dest_dir = temp_dir.path().join("out");
    fs::create_dir_all(&dest_dir).expect("create dest");
    let result = ArchiveExtractor.extract(&archive_path, &dest_dir);
    (temp_dir, result)
}

#[rstest]
#[case::tar_gz("agent-1.0.0.tar.gz", tar_gz_archive(&[AGENT, README]))]
#[case::tgz("agent-1.0.0.tgz", tar_gz_archive(&[AGENT, README]))]
#[case::tar_zst("agent-1.0.0.tar.zst", tar_zst_archive(&[AGENT, README]))]
#[case::tar("agent-1.0.0.tar", tar_bytes(&[AGENT, README]))]
#[case::zip("agent-1.0.0.zip", zip_archive(&[AGENT, README]))]
fn extracts_every_supported_format(#[case] name: &str, #[case] bytes: Vec<u8>) {
    let (temp_dir, result) = extract_bytes(name, &bytes);
    let files = result.expect("extract");
    assert_eq!(
        files,
        vec![PathBuf::from("agent"), PathBuf::from("docs/README.md")]
    );
    let out = temp_dir.path().join("out");
    assert_eq!(
        fs::read(out.join("agent")).expect("read agent"),
        AGENT.contents
    );
    assert!(out.join("docs/README.md").is_file());
}

#[cfg(unix)]
#[rstest]
#[case::tar_gz("agent.tar.gz", tar_gz_archive(&[AGENT, README]))]
#[case::zip("agent.zip", zip_archive(&[AGENT, README]))]
fn preserves_executable_bits(#[case] name: &str, #[case] bytes: Vec<u8>) {
    use std::os::unix::fs::PermissionsExt;

    let (temp_dir, result) = extract_bytes(name, &bytes);
    result.expect("extract");
    let out = temp_dir.path().join("out");
    let agent_mode = fs::metadata(out.join("agent")).expect("stat").permissions().mode();
    let readme_mode = fs::metadata(out.join("docs/README.md"))
        .expect("stat")
        .permissions()
        .mode();
    assert_eq!(agent_mode & 0o777, 0o755);
    assert_eq!(readme_mode & 0o111, 0);
}

#[test]
fn detects_format_from_content_when_name_is_opaque() {
    let (_temp_dir, result) = extract_bytes("download", &tar_gz_archive(&[AGENT]));
    assert_eq!(result.expect("extract"), vec![PathBuf::from("agent")]);
}

#[test]
fn strips_leading_current_dir_components() {
    let dotted = ArchiveFile {
        path: "./agent",
        ..AGENT
    };
    let (_temp_dir, result) = extract_bytes("agent.tar.gz", &tar_gz_archive(&[dotted]));
    assert_eq!(result.expect("extract"), vec![PathBuf::from("agent")]);
}

#[test]
fn rejects_unrecognised_format() {
    let (_temp_dir, result) = extract_bytes("agent.bin", b"definitely not an archive");
    assert!(matches!(
        result,
        Err(ExtractionError::UnrecognisedFormat { .. })
    ));
}

#[test]
fn corrupt_gzip_stream_is_an_error() {
    let (_temp_dir, result) = extract_bytes("agent.tar.gz", &[0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad]);
    assert!(result.is_err());
}

#[test]
fn extract_empty_archive() {
    let (_temp_dir, result) = extract_bytes("empty.tar.gz", &tar_gz_archive(&[]));
    assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
}

#[test]
fn rejects_zip_entry_escaping_destination() {
    let evil = ArchiveFile {
        path: "../escape.txt",
        contents: b"escaped",
        mode: 0o644,
    };
    let (temp_dir, result) = extract_bytes("evil.zip", &zip_archive(&[evil]));
    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    assert!(!temp_dir.path().join("escape.txt").exists());
}

fn tar_with_link(entry_type: tar::EntryType, target: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(0);
    header.set_mode(0o777);
    builder
        .append_link(&mut header, "agent", target)
        .expect("append link entry");
    builder.into_inner().expect("finish tar")
}

fn zip_with_symlink(target: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .add_symlink("agent", target, zip::write::SimpleFileOptions::default())
        .expect("add zip symlink");
    writer.finish().expect("finish zip").into_inner()
}

#[rstest]
#[case::tar_symlink("agent.tar", tar_with_link(tar::EntryType::Symlink, "/etc/passwd"), "Symlink")]
#[case::tar_hardlink("agent.tar", tar_with_link(tar::EntryType::Link, "/etc/passwd"), "Link")]
#[case::zip_symlink("agent.zip", zip_with_symlink("/etc/passwd"), "Symlink")]
fn rejects_link_entries(#[case] name: &str, #[case] bytes: Vec<u8>, #[case] expected_kind: &str) {
    let (temp_dir, result) = extract_bytes(name, &bytes);
    match result {
        Err(ExtractionError::UnsupportedEntry { path, kind }) => {
            assert_eq!(path, "agent");
            assert_eq!(kind, expected_kind);
        }
        other => panic!("expected UnsupportedEntry, got {other:?}"),
    }
    let written = fs::read_dir(temp_dir.path().join("out"))
        .expect("read dest")
        .count();
    assert_eq!(written, 0, "nothing should be extracted");
}

#[rstest]
#[case::parent_dir("../escape.txt")]
#[case::nested_parent("foo/../../escape.txt")]
#[case::absolute("/etc/passwd")]
fn rejects_path_traversal(#[case] bad_path: &str) {
    let path = PathBuf::from(bad_path);
    let result = validate_entry_path(&path);
    assert!(
        matches!(result, Err(ExtractionError::PathTraversal { .. })),
        "expected PathTraversal for {bad_path}"
    );
}

#[test]
fn accepts_normal_paths() {
    let path = PathBuf::from("agent-1.0.0/bin/agent");
    assert!(validate_entry_path(&path).is_ok());
}

#[rstest]
#[case::tar_gz("a.TAR.GZ", Some(ArchiveFormat::TarGz))]
#[case::tzst("a.tzst", Some(ArchiveFormat::TarZst))]
#[case::tar("a.tar", Some(ArchiveFormat::Tar))]
#[case::zip("a.zip", Some(ArchiveFormat::Zip))]
#[case::gz_only("a.gz", None)]
fn format_from_file_name(#[case] name: &str, #[case] expected: Option<ArchiveFormat>) {
    assert_eq!(ArchiveFormat::from_file_name(name), expected);
}

#[test]
fn format_from_magic_recognises_ustar() {
    let bytes = tar_bytes(&[AGENT]);
    assert_eq!(ArchiveFormat::from_magic(&bytes), Some(ArchiveFormat::Tar));
    assert_eq!(ArchiveFormat::from_magic(b"plain text"), None);
}
