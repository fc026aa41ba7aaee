//! keg installer library.
//!
//! This crate provides the core functionality for fetching, verifying, and
//! installing packages described by formula manifests. It is used by the
//! `keg` CLI binary and can be consumed programmatically for testing or
//! custom installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Download, checksum verification, and archive extraction
//! - [`cli`] - Command-line argument definitions
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types and exit-code classes
//! - [`install`] - The download, verify, extract, and commit pipeline
//! - [`manifest`] - Formula manifest schema, validation, and TOML loading
//! - [`output`] - Progress lines and result formatting
//! - [`prefix`] - Install prefix resolution
//! - [`smoke`] - Post-install smoke test execution
//! - [`stager`] - All-or-nothing staging of files under the prefix

pub mod artefact;
pub mod cli;
pub mod dirs;
pub mod error;
pub mod install;
pub mod manifest;
pub mod output;
pub mod prefix;
pub mod smoke;
pub mod stager;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
