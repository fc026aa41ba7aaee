//! Artefact retrieval and unpacking.
//!
//! # Sub-modules
//!
//! - [`download`] - Artefact download trait and HTTP implementation.
//! - [`extraction`] - Archive extraction with path traversal protection.
//! - [`verification`] - SHA-256 computation and digest comparison.

pub mod download;
pub mod extraction;
pub mod verification;
