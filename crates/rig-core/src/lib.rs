// rig-core/src/lib.rs
// ============================================================================
// Module: RIG Core Library
// Description: Public API surface for the Repository Intelligence Graph core.
// Purpose: Expose the data model, graph engine, validator, and comparators.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! `rig-core` holds the canonical, build-system-agnostic model of what a
//! repository builds, tests, and depends on, together with the engine that
//! assembles graphs, the validator that diagnoses them, and the
//! normalization/compare/compaction machinery downstream consumers rely on.
//! Per-ecosystem extractors and the SQLite store live in sibling crates and
//! integrate through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::Extractor;
pub use interfaces::ExtractorError;
pub use runtime::Category;
pub use runtime::CompactError;
pub use runtime::CompareError;
pub use runtime::CompareOutcome;
pub use runtime::Diagnostic;
pub use runtime::ExportError;
pub use runtime::NormalizeError;
pub use runtime::Rig;
pub use runtime::RigExport;
pub use runtime::Severity;
pub use runtime::compact;
pub use runtime::compare;
pub use runtime::expand;
pub use runtime::export;
pub use runtime::export_json_pretty;
pub use runtime::export_value;
pub use runtime::normalize;
pub use runtime::validate;
