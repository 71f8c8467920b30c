// rig-core/src/core/error.rs
// ============================================================================
// Module: RIG Model Errors
// Description: Construction-time and registration-time fault types.
// Purpose: Distinguish extractor programming faults from recoverable states.
// Dependencies: crate::core::identifiers, thiserror
// ============================================================================

//! ## Overview
//! Model errors are programming faults: they are raised by constructors and
//! engine registration helpers, are never caught internally, and indicate a
//! bug in the producing extractor rather than bad repository input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::NodeRef;
use crate::core::identifiers::PackageId;

// ============================================================================
// SECTION: Model Errors
// ============================================================================

/// Entity construction faults.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Evidence carried neither line references nor a call stack.
    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),
    /// Component was missing a required field.
    #[error("invalid component: {0}")]
    InvalidComponent(String),
}

/// Graph registration and hydration faults.
#[derive(Debug, Error)]
pub enum RigError {
    /// An edge referenced a node that is not registered under its kind.
    #[error("unknown dependency {} '{}'", .0.kind, .0.id)]
    UnknownDependency(NodeRef),
    /// A node referenced an evidence id absent from the evidence map.
    #[error("unknown evidence '{0}'")]
    UnknownEvidence(EvidenceId),
    /// A component referenced an external package absent from the package map.
    #[error("unknown external package '{0}'")]
    UnknownPackage(PackageId),
    /// An external package referenced an unregistered package manager.
    #[error("unknown package manager '{0}'")]
    UnknownPackageManager(PackageId),
    /// A test referenced an executable of a kind other than component/runner.
    #[error("test executable must be a component or runner, got {} '{}'", .0.kind, .0.id)]
    InvalidTestExecutable(NodeRef),
    /// An id-set entry resolved to no registered node of any kind.
    #[error("id '{0}' does not resolve to a registered node")]
    UnresolvedId(NodeId),
}
