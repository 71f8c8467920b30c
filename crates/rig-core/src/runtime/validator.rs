// rig-core/src/runtime/validator.rs
// ============================================================================
// Module: RIG Validator
// Description: Cross-entity consistency checks producing diagnostics.
// Purpose: Report graph defects without mutating or rejecting the graph.
// Dependencies: crate::core, crate::runtime::graph
// ============================================================================

//! ## Overview
//! The validator consumes a hydrated graph and returns an ordered diagnostic
//! list; an empty list means clean. Diagnostics are values, never errors:
//! extraction bugs surface here as `Error`-severity entries and the caller
//! decides what to do with them. The validator never mutates the graph.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::NodeKind;
use crate::runtime::graph::Rig;

// ============================================================================
// SECTION: Diagnostic Model
// ============================================================================

/// Severity of a validation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Graph is unusable or an extractor contract was broken.
    Error,
    /// Suspicious but usable.
    Warning,
    /// Informational only.
    Info,
}

/// Closed set of diagnostic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A component source file does not exist on disk.
    MissingSourceFile,
    /// A dependency references a node name that does not exist.
    BrokenDependency,
    /// A node has no dependencies (informational).
    NoDependencies,
    /// The dependency graph contains a cycle.
    CircularDependency,
    /// Two nodes share one identifier.
    DuplicateNodeId,
    /// A test has no executable reference.
    MissingTestExecutable,
    /// A test's executable reference is not registered.
    TestExecutableComponentNotFound,
    /// A test executable reference has an impossible kind.
    TestComponentOrMismatch,
    /// A node carries no evidence.
    MissingEvidence,
}

impl Category {
    /// Returns the stable label for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingSourceFile => "missing_source_file",
            Self::BrokenDependency => "broken_dependency",
            Self::NoDependencies => "no_dependencies",
            Self::CircularDependency => "circular_dependency",
            Self::DuplicateNodeId => "duplicate_node_id",
            Self::MissingTestExecutable => "missing_test_executable",
            Self::TestExecutableComponentNotFound => "test_executable_component_not_found",
            Self::TestComponentOrMismatch => "test_component_or_mismatch",
            Self::MissingEvidence => "missing_evidence",
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Finding severity.
    pub severity: Severity,
    /// Finding category.
    pub category: Category,
    /// Human-readable message.
    pub message: String,
    /// Name of the offending node, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Offending file path, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Offending line number, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Suggested remediation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with only the required fields set.
    #[must_use]
    pub fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            node_name: None,
            file_path: None,
            line_number: None,
            suggestion: None,
        }
    }

    /// Sets the offending node name.
    #[must_use]
    pub fn with_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Sets the offending file path.
    #[must_use]
    pub fn with_file(mut self, file_path: PathBuf) -> Self {
        self.file_path = Some(file_path);
        self
    }

    /// Sets the suggested remediation.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ============================================================================
// SECTION: Validation Entry Point
// ============================================================================

/// Validates a hydrated graph and returns all findings in check order.
#[must_use]
pub fn validate(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    diagnostics.extend(check_missing_source_files(rig));
    diagnostics.extend(check_broken_dependencies(rig));
    diagnostics.extend(check_circular_dependencies(rig));
    diagnostics.extend(check_duplicate_node_ids(rig));
    diagnostics.extend(check_test_wiring(rig));
    diagnostics.extend(check_evidence_presence(rig));
    diagnostics
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Checks that every component source file resolves under the repository
/// root and exists on disk.
fn check_missing_source_files(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let Some(repository) = rig.repository() else {
        return diagnostics;
    };
    for component in rig.components() {
        for source_file in &component.source_files {
            let full_path = if source_file.is_absolute() {
                source_file.clone()
            } else {
                repository.root_path.join(source_file)
            };
            if !full_path.exists() {
                diagnostics.push(
                    Diagnostic::new(
                        Severity::Error,
                        Category::MissingSourceFile,
                        format!("Source file does not exist: {}", source_file.display()),
                    )
                    .with_node(component.name.clone())
                    .with_file(source_file.clone())
                    .with_suggestion(
                        "Check if the file path is correct or if the file was moved or deleted",
                    ),
                );
            }
        }
    }
    diagnostics
}

/// Checks that every dependency resolves to a known node name.
fn check_broken_dependencies(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let known_names: BTreeSet<&str> = rig.all_nodes().iter().map(|node| node.name()).collect();
    for node in rig.all_nodes() {
        for dep in node.depends_on() {
            let resolves = rig
                .node_by_id(&dep.id)
                .map(|target| known_names.contains(target.name()))
                .unwrap_or(false);
            if !resolves {
                diagnostics.push(
                    Diagnostic::new(
                        Severity::Error,
                        Category::BrokenDependency,
                        format!("Dependency '{}' does not exist", dep.id),
                    )
                    .with_node(node.name().to_string())
                    .with_suggestion(
                        "Check if the dependency name is correct or if the target was removed",
                    ),
                );
            }
        }
    }
    diagnostics
}

/// Detects dependency cycles with a DFS over the name-level graph, reporting
/// one cycle per connected component and continuing.
fn check_circular_dependencies(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in rig.all_nodes() {
        let deps = node
            .depends_on()
            .iter()
            .filter_map(|dep| rig.node_by_id(&dep.id).map(|target| target.name()))
            .collect();
        graph.insert(node.name(), deps);
    }

    let mut visited: BTreeSet<&str> = BTreeSet::new();
    for start in graph.keys().copied().collect::<Vec<_>>() {
        if visited.contains(start) {
            continue;
        }
        let mut rec_stack: BTreeSet<&str> = BTreeSet::new();
        if has_cycle(start, &graph, &mut visited, &mut rec_stack) {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Error,
                    Category::CircularDependency,
                    format!("Circular dependency detected involving node '{start}'"),
                )
                .with_node(start.to_string())
                .with_suggestion("Review the dependency chain to break the circular reference"),
            );
        }
    }
    diagnostics
}

/// DFS with recursion-stack coloring; true when a back edge is found.
fn has_cycle<'a>(
    name: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    visited: &mut BTreeSet<&'a str>,
    rec_stack: &mut BTreeSet<&'a str>,
) -> bool {
    visited.insert(name);
    rec_stack.insert(name);
    for neighbor in graph.get(name).into_iter().flatten() {
        if !visited.contains(neighbor) {
            if has_cycle(neighbor, graph, visited, rec_stack) {
                return true;
            }
        } else if rec_stack.contains(neighbor) {
            return true;
        }
    }
    rec_stack.remove(name);
    false
}

/// Checks identifier uniqueness across all four node maps.
///
/// The maps themselves cannot hold duplicate keys, so the only observable
/// duplication is one id registered under two different kinds.
fn check_duplicate_node_ids(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in rig.all_nodes() {
        *counts.entry(node.id().as_str()).or_insert(0) += 1;
    }
    for test in rig.tests() {
        *counts.entry(test.id.as_str()).or_insert(0) += 1;
    }
    for (id, count) in counts {
        if count > 1 {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Error,
                    Category::DuplicateNodeId,
                    format!("Node id '{id}' is used by {count} different nodes"),
                )
                .with_node(id.to_string())
                .with_suggestion("Ensure all node ids are unique across the entire graph"),
            );
        }
    }
    diagnostics
}

/// Checks that every test has an executable reference registered under the
/// matching node map.
fn check_test_wiring(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for test in rig.tests() {
        let Some(executable) = &test.test_executable else {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Error,
                    Category::MissingTestExecutable,
                    format!("Test '{}' has no test executable component defined", test.name),
                )
                .with_node(test.name.clone())
                .with_suggestion("Each test should have an associated test executable component"),
            );
            continue;
        };
        let (present, kind_ok) = match executable.kind {
            NodeKind::Component => (rig.component(&executable.id).is_some(), true),
            NodeKind::Runner => (rig.runner(&executable.id).is_some(), true),
            NodeKind::Aggregator | NodeKind::Test => (false, false),
        };
        if !kind_ok {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Error,
                    Category::TestComponentOrMismatch,
                    format!(
                        "Test '{}' executable reference has kind '{}', expected component or \
                         runner",
                        test.name, executable.kind
                    ),
                )
                .with_node(test.name.clone()),
            );
        } else if !present {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Error,
                    Category::TestExecutableComponentNotFound,
                    format!(
                        "Test '{}' references a test executable component that does not exist",
                        test.name
                    ),
                )
                .with_node(test.name.clone())
                .with_suggestion(
                    "Ensure the test executable component is correctly added to the graph",
                ),
            );
        }
    }
    diagnostics
}

/// Checks that every node (tests included) carries at least one evidence
/// record.
fn check_evidence_presence(rig: &Rig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut report = |name: &str| {
        diagnostics.push(
            Diagnostic::new(
                Severity::Error,
                Category::MissingEvidence,
                format!("Node '{name}' has no evidence information"),
            )
            .with_node(name.to_string())
            .with_suggestion("All nodes should have evidence indicating where they are defined"),
        );
    };
    for node in rig.all_nodes() {
        if node.evidence().is_empty() && node.evidence_ids().is_empty() {
            report(node.name());
        }
    }
    for test in rig.tests() {
        if test.evidence.is_empty() && test.evidence_ids.is_empty() {
            report(&test.name);
        }
    }
    diagnostics
}
