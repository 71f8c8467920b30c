// rig-core/src/interfaces/mod.rs
// ============================================================================
// Module: RIG Interfaces
// Description: Build-system-agnostic extractor contract.
// Purpose: Define the surface every per-ecosystem extractor implements.
// Dependencies: crate::runtime::graph, thiserror
// ============================================================================

//! ## Overview
//! An extractor takes a repository root and returns a fully populated,
//! hydrated graph. Implementations must satisfy four clauses: every produced
//! node carries at least one evidence record; every dependency reference
//! points at a node the extractor also registered; every external package
//! reference carries a registered package manager; and failure raises a typed
//! extraction error rather than returning a partial graph.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use thiserror::Error;

use crate::runtime::graph::Rig;

// ============================================================================
// SECTION: Extractor Contract
// ============================================================================

/// Interface-level extraction failure.
///
/// Per-build-system extractors define richer error types and convert into
/// this contract error at the boundary.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Build system configuration failed.
    #[error("configure failed: {0}")]
    Configure(String),
    /// Build system introspection data was missing or malformed.
    #[error("introspection failed: {0}")]
    Introspection(String),
    /// A build file could not be read or parsed.
    #[error("build file parse failed: {0}")]
    Parse(String),
    /// A helper subprocess failed or timed out.
    #[error("subprocess failed: {0}")]
    Subprocess(String),
    /// The produced graph violated a model invariant (extractor bug).
    #[error("model violation: {0}")]
    Model(String),
}

/// Build-system-specific graph extractor.
pub trait Extractor {
    /// Returns the build system name this extractor handles.
    fn build_system(&self) -> &str;

    /// Extracts a fully populated, hydrated graph from a repository root.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] on any failure; no partial graph is
    /// returned.
    fn extract(&self, repo_root: &Path) -> Result<Rig, ExtractorError>;
}
