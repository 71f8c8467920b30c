// rig-core/src/runtime/export.rs
// ============================================================================
// Module: RIG Canonical JSON Export
// Description: Flat JSON document for comparison and downstream consumers.
// Purpose: Emit graph facts with id references only and null fields elided.
// Dependencies: crate::core, crate::runtime::graph, serde, serde_json
// ============================================================================

//! ## Overview
//! The canonical export is a flat document: repository and build facts plus
//! one array per entity kind. Object-valued cross references are omitted;
//! only the parallel `*_ids` collections are emitted, so the export is stable
//! across hydration states and suitable for semantic comparison.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ComponentType;
use crate::core::EvidenceId;
use crate::core::NodeId;
use crate::core::PackageId;
use crate::runtime::graph::Rig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while emitting the canonical export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// JSON serialization failed.
    #[error("failed to serialize export: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Export Document
// ============================================================================

/// Flat canonical view of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigExport {
    /// Repository facts.
    pub repo: RepoExport,
    /// Build system facts.
    pub build: BuildExport,
    /// Component entries.
    pub components: Vec<ComponentExport>,
    /// Aggregator entries.
    pub aggregators: Vec<AggregatorExport>,
    /// Runner entries.
    pub runners: Vec<RunnerExport>,
    /// Test entries.
    pub tests: Vec<TestExport>,
    /// External package entries.
    pub external_packages: Vec<ExternalPackageExport>,
    /// Package manager entries.
    pub package_managers: Vec<PackageManagerExport>,
    /// Evidence entries.
    pub evidence: Vec<EvidenceExport>,
}

/// Repository facts in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoExport {
    /// Repository name, `Unknown` when unset.
    pub name: String,
    /// Repository root path, `Unknown` when unset.
    pub root: String,
}

/// Build system facts in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildExport {
    /// Build system name, `Unknown` when unset.
    pub system: String,
    /// Configured build type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<String>,
    /// Configure command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configure_cmd: Option<String>,
    /// Test command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_cmd: Option<String>,
}

/// Component entry in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentExport {
    /// Component id.
    pub id: NodeId,
    /// Artifact name.
    pub name: String,
    /// Component type label.
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Programming language.
    pub programming_language: String,
    /// Canonical output path.
    pub relative_path: PathBuf,
    /// Additional artifact locations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<PathBuf>,
    /// Source files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<PathBuf>,
    /// Dependency ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
    /// External package ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub external_packages_ids: BTreeSet<PackageId>,
}

/// Aggregator entry in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorExport {
    /// Aggregator id.
    pub id: NodeId,
    /// Target name.
    pub name: String,
    /// Dependency ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
}

/// Runner entry in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerExport {
    /// Runner id.
    pub id: NodeId,
    /// Command name.
    pub name: String,
    /// Command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    /// Argument node ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub args_nodes_ids: BTreeSet<NodeId>,
    /// Dependency ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
}

/// Test entry in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExport {
    /// Test id.
    pub id: NodeId,
    /// Test name.
    pub name: String,
    /// Test framework tag.
    pub test_framework: String,
    /// Executable reference id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_executable_component_id: Option<NodeId>,
    /// Transitive component closure ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub test_components_ids: BTreeSet<NodeId>,
    /// Subject-under-test component ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub components_being_tested_ids: BTreeSet<NodeId>,
    /// Test source files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<PathBuf>,
    /// Dependency ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
}

/// External package entry in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPackageExport {
    /// Package id.
    pub id: PackageId,
    /// Package name.
    pub name: String,
    /// Owning package manager id.
    pub package_manager_id: PackageId,
}

/// Package manager entry in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerExport {
    /// Package manager id.
    pub id: PackageId,
    /// Manager name.
    pub name: String,
    /// Canonical package name.
    pub package_name: String,
}

/// Evidence entry in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceExport {
    /// Evidence id.
    pub id: EvidenceId,
    /// Line references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,
    /// Call stack references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_stack: Vec<String>,
}

// ============================================================================
// SECTION: Export Construction
// ============================================================================

/// Builds the canonical flat export of a graph.
#[must_use]
pub fn export(rig: &Rig) -> RigExport {
    let repo = rig.repository().map_or_else(
        || RepoExport { name: "Unknown".to_string(), root: "Unknown".to_string() },
        |info| RepoExport {
            name: info.name.clone(),
            root: info.root_path.display().to_string(),
        },
    );
    let build = rig.build_system().map_or_else(
        || BuildExport {
            system: "Unknown".to_string(),
            build_type: None,
            configure_cmd: rig.repository().and_then(|info| info.configure_command.clone()),
            test_cmd: rig.repository().and_then(|info| info.test_command.clone()),
        },
        |info| BuildExport {
            system: info.name.clone(),
            build_type: info.build_type.clone(),
            configure_cmd: rig.repository().and_then(|r| r.configure_command.clone()),
            test_cmd: rig.repository().and_then(|r| r.test_command.clone()),
        },
    );

    let components = rig
        .components()
        .map(|component| ComponentExport {
            id: component.id.clone(),
            name: component.name.clone(),
            component_type: component.component_type,
            programming_language: component.programming_language.clone(),
            relative_path: component.relative_path.clone(),
            locations: component.locations.clone(),
            source_files: component.source_files.clone(),
            depends_on_ids: component.depends_on_ids.clone(),
            evidence_ids: component.evidence_ids.clone(),
            external_packages_ids: component.external_packages_ids.clone(),
        })
        .collect();

    let aggregators = rig
        .aggregators()
        .map(|aggregator| AggregatorExport {
            id: aggregator.id.clone(),
            name: aggregator.name.clone(),
            depends_on_ids: aggregator.depends_on_ids.clone(),
            evidence_ids: aggregator.evidence_ids.clone(),
        })
        .collect();

    let runners = rig
        .runners()
        .map(|runner| RunnerExport {
            id: runner.id.clone(),
            name: runner.name.clone(),
            arguments: runner.arguments.clone(),
            args_nodes_ids: runner.args_nodes_ids.clone(),
            depends_on_ids: runner.depends_on_ids.clone(),
            evidence_ids: runner.evidence_ids.clone(),
        })
        .collect();

    let tests = rig
        .tests()
        .map(|test| TestExport {
            id: test.id.clone(),
            name: test.name.clone(),
            test_framework: test.test_framework.clone(),
            test_executable_component_id: test
                .test_executable
                .as_ref()
                .map(|executable| executable.id.clone()),
            test_components_ids: test.test_components_ids.clone(),
            components_being_tested_ids: test.components_being_tested_ids.clone(),
            source_files: test.source_files.clone(),
            depends_on_ids: test.depends_on_ids.clone(),
            evidence_ids: test.evidence_ids.clone(),
        })
        .collect();

    let external_packages = rig
        .external_packages()
        .map(|package| ExternalPackageExport {
            id: package.id.clone(),
            name: package.name.clone(),
            package_manager_id: package.package_manager_id.clone(),
        })
        .collect();

    let package_managers = rig
        .package_managers()
        .map(|manager| PackageManagerExport {
            id: manager.id.clone(),
            name: manager.name.clone(),
            package_name: manager.package_name.clone(),
        })
        .collect();

    let evidence = rig
        .evidence_records()
        .map(|record| EvidenceExport {
            id: record.id.clone(),
            line: record.line.clone(),
            call_stack: record.call_stack.clone(),
        })
        .collect();

    RigExport {
        repo,
        build,
        components,
        aggregators,
        runners,
        tests,
        external_packages,
        package_managers,
        evidence,
    }
}

/// Serializes the canonical export to a JSON value.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] when serialization fails.
pub fn export_value(rig: &Rig) -> Result<serde_json::Value, ExportError> {
    serde_json::to_value(export(rig)).map_err(|err| ExportError::Serialize(err.to_string()))
}

/// Serializes the canonical export to pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] when serialization fails.
pub fn export_json_pretty(rig: &Rig) -> Result<String, ExportError> {
    serde_json::to_string_pretty(&export(rig)).map_err(|err| ExportError::Serialize(err.to_string()))
}
