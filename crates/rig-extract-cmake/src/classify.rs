// rig-extract-cmake/src/classify.rs
// ============================================================================
// Module: Target Classification
// Description: CMake target to graph node category mapping.
// Purpose: Decide component/runner/aggregator per target type and metadata.
// Dependencies: crate::{file_api, lists_parser}, rig-core
// ============================================================================

//! ## Overview
//! Classification follows the target type first: compiled artifact types are
//! components; `UTILITY` targets split into runners (a COMMAND, no
//! artifact), aggregators (DEPENDS only), and jar components (`add_jar`);
//! interface libraries and anything unrecognized are skipped. Languages are
//! canonicalized to the lowercase compile-language label.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rig_core::ComponentType;
use rig_core::Evidence;
use rig_core::EvidenceId;

use crate::file_api::BacktraceGraph;
use crate::file_api::Target;
use crate::lists_parser::CMakeListsParser;

// ============================================================================
// SECTION: Category
// ============================================================================

/// Graph node category of one CMake target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCategory {
    /// Buildable component of the given type.
    Component(ComponentType),
    /// Command-running utility target.
    Runner,
    /// Grouping-only utility target.
    Aggregator,
    /// Not a graph node (interface library, unsupported type, empty utility).
    Skip,
}

/// Classifies a target by its File API type and CMakeLists metadata.
#[must_use]
pub fn classify_target(target: &Target, lists: &CMakeListsParser) -> TargetCategory {
    match target.target_type.as_str() {
        "EXECUTABLE" => TargetCategory::Component(ComponentType::Executable),
        "STATIC_LIBRARY" | "OBJECT_LIBRARY" => {
            TargetCategory::Component(ComponentType::StaticLibrary)
        }
        "SHARED_LIBRARY" | "MODULE_LIBRARY" => {
            TargetCategory::Component(ComponentType::SharedLibrary)
        }
        "UTILITY" => classify_utility(target, lists),
        _ => TargetCategory::Skip,
    }
}

/// Splits `UTILITY` targets into runner, aggregator, jar component, or skip.
fn classify_utility(target: &Target, lists: &CMakeListsParser) -> TargetCategory {
    let Some(record) = lists.custom_target(&target.name) else {
        return TargetCategory::Skip;
    };
    if record.is_jar {
        return TargetCategory::Component(ComponentType::PackageLibrary);
    }
    let has_artifact = !target.artifacts.is_empty();
    if record.has_commands && !has_artifact {
        return TargetCategory::Runner;
    }
    if record.has_depends && !record.has_commands && !has_artifact {
        return TargetCategory::Aggregator;
    }
    TargetCategory::Skip
}

// ============================================================================
// SECTION: Language
// ============================================================================

/// Canonicalizes a File API compile language to the lowercase label.
#[must_use]
pub fn canonical_language(raw: &str) -> String {
    raw.to_lowercase()
}

/// Determines a component's programming language from its compile groups,
/// link step, or jar flag, in that order.
#[must_use]
pub fn component_language(target: &Target, category: TargetCategory) -> String {
    if matches!(category, TargetCategory::Component(ComponentType::PackageLibrary)) {
        return "java".to_string();
    }
    if let Some(group) = target.compile_groups.first() {
        return canonical_language(&group.language);
    }
    if let Some(language) = target.link.as_ref().and_then(|link| link.language.as_deref()) {
        return canonical_language(language);
    }
    "unknown".to_string()
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Builds a target's evidence from its File API backtrace.
///
/// The leaf reference becomes the line entry; when the defining call was
/// reached through includes or functions, the full parent chain (leaf first)
/// becomes the call stack. Returns `None` when the target has no usable
/// backtrace.
#[must_use]
pub fn backtrace_evidence(target: &Target, id: EvidenceId) -> Option<Evidence> {
    let graph = target.backtrace_graph.as_ref()?;
    let chain = backtrace_chain(graph, target.backtrace?);
    let leaf = chain.first()?.clone();
    let call_stack = if chain.len() > 1 { chain } else { Vec::new() };
    Evidence::new(id, vec![leaf], call_stack).ok()
}

/// Walks a backtrace node's parent chain into `file:line` references,
/// leaf first.
fn backtrace_chain(graph: &BacktraceGraph, start: usize) -> Vec<String> {
    let mut references = Vec::new();
    let mut cursor = Some(start);
    let mut guard = 0usize;
    while let Some(index) = cursor {
        let Some(node) = graph.nodes.get(index) else {
            break;
        };
        if let (Some(file_index), Some(line)) = (node.file, node.line)
            && let Some(file) = graph.files.get(file_index)
        {
            references.push(format!("{file}:{line}"));
        }
        cursor = node.parent;
        guard += 1;
        if guard > graph.nodes.len() {
            break;
        }
    }
    references
}
