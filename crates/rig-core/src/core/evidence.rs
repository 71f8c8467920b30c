// rig-core/src/core/evidence.rs
// ============================================================================
// Module: RIG Evidence Model
// Description: Source-location evidence records backing every graph fact.
// Purpose: Point each extracted fact back to the build file that asserted it.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Every node in the graph carries at least one evidence record naming the
//! build-system source location that justified it. A record holds an ordered
//! list of `file:line` references, a build-system call stack (ordered leaf
//! first), or both. A record with neither is rejected at construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::identifiers::EvidenceId;

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Pointer back to the source location that justified a recorded fact.
///
/// # Invariants
/// - At least one of `line` and `call_stack` is non-empty.
/// - References use the `path:line` form with paths relative to the
///   repository root where possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Evidence identifier.
    pub id: EvidenceId,
    /// Ordered `path:line` references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,
    /// Build-system call stack references, ordered leaf first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_stack: Vec<String>,
}

impl Evidence {
    /// Creates an evidence record from line references and/or a call stack.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidEvidence`] when both reference lists are
    /// empty.
    pub fn new(
        id: EvidenceId,
        line: Vec<String>,
        call_stack: Vec<String>,
    ) -> Result<Self, ModelError> {
        if line.is_empty() && call_stack.is_empty() {
            return Err(ModelError::InvalidEvidence(
                "evidence requires at least one line reference or call stack entry".to_string(),
            ));
        }
        Ok(Self { id, line, call_stack })
    }

    /// Creates an evidence record from line references only.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidEvidence`] when `line` is empty.
    pub fn from_lines(id: EvidenceId, line: Vec<String>) -> Result<Self, ModelError> {
        Self::new(id, line, Vec::new())
    }

    /// Returns the first reference of the record, preferring line references.
    ///
    /// Used as the stable anchor for content-derived evidence keys.
    #[must_use]
    pub fn first_reference(&self) -> Option<&str> {
        self.line.first().or_else(|| self.call_stack.first()).map(String::as_str)
    }
}
