// rig-core/src/runtime/compare.rs
// ============================================================================
// Module: RIG Semantic Compare
// Description: Order-insensitive, id-insensitive graph comparison.
// Purpose: Decide whether two graphs describe the same repository facts.
// Dependencies: crate::runtime::{export, graph, normalize}, serde_json, similar
// ============================================================================

//! ## Overview
//! Comparison normalizes both graphs to stable content-derived ids, emits
//! their canonical exports, recursively sorts every collection, and checks
//! structural equality. Differing graphs yield a unified diff of the two
//! pretty-printed documents. Auto-generated counter ids and collection
//! ordering therefore never cause false differences.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use similar::TextDiff;
use thiserror::Error;

use crate::runtime::export::ExportError;
use crate::runtime::export::export_value;
use crate::runtime::graph::Rig;
use crate::runtime::normalize::NormalizeError;
use crate::runtime::normalize::normalize;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while comparing graphs.
#[derive(Debug, Error)]
pub enum CompareError {
    /// Stable-key normalization failed.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    /// Canonical export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// JSON rendering failed.
    #[error("failed to render comparison json: {0}")]
    Render(String),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of a semantic comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOutcome {
    /// The graphs are semantically identical.
    Identical,
    /// The graphs differ; the payload is a unified diff of the two
    /// normalized, sorted canonical documents.
    Different(String),
}

impl CompareOutcome {
    /// Returns true for [`CompareOutcome::Identical`].
    #[must_use]
    pub const fn is_identical(&self) -> bool {
        matches!(self, Self::Identical)
    }
}

// ============================================================================
// SECTION: Compare
// ============================================================================

/// Compares two graphs semantically.
///
/// # Errors
///
/// Returns [`CompareError`] when normalization or JSON rendering fails.
pub fn compare(left: &Rig, right: &Rig) -> Result<CompareOutcome, CompareError> {
    let left_sorted = sorted_canonical_value(left)?;
    let right_sorted = sorted_canonical_value(right)?;
    if left_sorted == right_sorted {
        return Ok(CompareOutcome::Identical);
    }
    let left_pretty = serde_json::to_string_pretty(&left_sorted)
        .map_err(|err| CompareError::Render(err.to_string()))?;
    let right_pretty = serde_json::to_string_pretty(&right_sorted)
        .map_err(|err| CompareError::Render(err.to_string()))?;
    let diff = TextDiff::from_lines(&left_pretty, &right_pretty)
        .unified_diff()
        .context_radius(3)
        .header("self", "other")
        .to_string();
    Ok(CompareOutcome::Different(diff))
}

/// Normalizes, exports, and sorts one graph into a comparable JSON value.
fn sorted_canonical_value(rig: &Rig) -> Result<Value, CompareError> {
    let normalized = normalize(rig)?;
    let value = export_value(&normalized)?;
    Ok(sort_value(value))
}

// ============================================================================
// SECTION: Recursive Sorting
// ============================================================================

/// Recursively sorts a JSON value for order-insensitive comparison.
///
/// Object keys are already sorted by the JSON map representation. Arrays are
/// sorted by each item's `name` field when every item is an object carrying
/// one, and by canonical JSON rendering otherwise.
#[must_use]
pub fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(key, child)| (key, sort_value(child))).collect())
        }
        Value::Array(items) => {
            let mut sorted: Vec<Value> = items.into_iter().map(sort_value).collect();
            let by_name = !sorted.is_empty()
                && sorted.iter().all(|item| {
                    item.as_object().is_some_and(|object| object.get("name").is_some())
                });
            if by_name {
                sorted.sort_by_key(|item| {
                    item.get("name")
                        .and_then(Value::as_str)
                        .map(ToString::to_string)
                        .unwrap_or_default()
                });
            } else {
                sorted.sort_by_key(|item| serde_json::to_string(item).unwrap_or_default());
            }
            Value::Array(sorted)
        }
        other => other,
    }
}
