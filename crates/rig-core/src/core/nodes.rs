// rig-core/src/core/nodes.rs
// ============================================================================
// Module: RIG Node Model
// Description: Components, aggregators, runners, and test definitions.
// Purpose: Typed graph nodes with parallel edge-list/id-set bookkeeping.
// Dependencies: crate::core::{error, evidence, identifiers, package}, serde
// ============================================================================

//! ## Overview
//! The four node kinds of the Repository Intelligence Graph. Nodes live in
//! the graph's kind-specific maps; edges between nodes are typed references
//! ([`NodeRef`]) stored as an ordered list plus a parallel id set. Evidence
//! and external packages are value objects carried on the node with the
//! graph-level maps as the single source of truth.
//!
//! All edge mutations route through the `push_*` helpers so the list and its
//! id index stay in lockstep; hydration and propagation rely on that rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::evidence::Evidence;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::NodeId;
use crate::core::identifiers::NodeKind;
use crate::core::identifiers::NodeRef;
use crate::core::identifiers::PackageId;
use crate::core::package::ExternalPackage;

// ============================================================================
// SECTION: Component Types
// ============================================================================

/// Kind of artifact a component builds.
///
/// # Invariants
/// - Variants are stable for serialization and stable-key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// Executable program.
    Executable,
    /// Shared (dynamic) library.
    SharedLibrary,
    /// Static library.
    StaticLibrary,
    /// Packaged library artifact (e.g. a JAR).
    PackageLibrary,
    /// Virtual machine image or bytecode artifact.
    Vm,
    /// Interpreted entry point with no compiled artifact.
    Interpreted,
}

impl ComponentType {
    /// Returns the stable label for this component type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executable => "executable",
            Self::SharedLibrary => "shared_library",
            Self::StaticLibrary => "static_library",
            Self::PackageLibrary => "package_library",
            Self::Vm => "vm",
            Self::Interpreted => "interpreted",
        }
    }

    /// Parses a stable label back into a component type.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "executable" => Some(Self::Executable),
            "shared_library" => Some(Self::SharedLibrary),
            "static_library" => Some(Self::StaticLibrary),
            "package_library" => Some(Self::PackageLibrary),
            "vm" => Some(Self::Vm),
            "interpreted" => Some(Self::Interpreted),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Node Trait
// ============================================================================

/// Uniform access to the fields shared by every graph node.
pub trait RigNode {
    /// Returns the node identifier.
    fn id(&self) -> &NodeId;
    /// Returns the node name.
    fn name(&self) -> &str;
    /// Returns the node kind.
    fn kind(&self) -> NodeKind;
    /// Returns the ordered dependency edge list.
    fn depends_on(&self) -> &[NodeRef];
    /// Returns the dependency id index.
    fn depends_on_ids(&self) -> &BTreeSet<NodeId>;
    /// Returns the evidence records carried on the node.
    fn evidence(&self) -> &[Evidence];
    /// Returns the evidence id index.
    fn evidence_ids(&self) -> &BTreeSet<EvidenceId>;
    /// Appends a dependency edge, keeping the id index in lockstep.
    fn push_dependency(&mut self, dep: NodeRef);
    /// Appends an evidence record, keeping the id index in lockstep.
    fn push_evidence(&mut self, evidence: Evidence);
    /// Records an evidence id without a carried value (used by loading).
    fn insert_evidence_id(&mut self, id: EvidenceId);
    /// Records a dependency id without a carried edge (used by loading).
    fn insert_dependency_id(&mut self, id: NodeId);
}

/// Implements [`RigNode`] for a node struct with the standard field names.
macro_rules! impl_rig_node {
    ($ty:ty, $kind:expr) => {
        impl RigNode for $ty {
            fn id(&self) -> &NodeId {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn kind(&self) -> NodeKind {
                $kind
            }

            fn depends_on(&self) -> &[NodeRef] {
                &self.depends_on
            }

            fn depends_on_ids(&self) -> &BTreeSet<NodeId> {
                &self.depends_on_ids
            }

            fn evidence(&self) -> &[Evidence] {
                &self.evidence
            }

            fn evidence_ids(&self) -> &BTreeSet<EvidenceId> {
                &self.evidence_ids
            }

            fn push_dependency(&mut self, dep: NodeRef) {
                self.depends_on_ids.insert(dep.id.clone());
                self.depends_on.push(dep);
            }

            fn push_evidence(&mut self, evidence: Evidence) {
                self.evidence_ids.insert(evidence.id.clone());
                self.evidence.push(evidence);
            }

            fn insert_evidence_id(&mut self, id: EvidenceId) {
                self.evidence_ids.insert(id);
            }

            fn insert_dependency_id(&mut self, id: NodeId) {
                self.depends_on_ids.insert(id);
            }
        }
    };
}

// ============================================================================
// SECTION: Component
// ============================================================================

/// Buildable unit producing an artifact file.
///
/// # Invariants
/// - `programming_language` is lowercase and non-empty.
/// - `relative_path` and `source_files` are relative to the repository root
///   where the build system allows it.
/// - `depends_on`/`depends_on_ids`, `evidence`/`evidence_ids`, and
///   `external_packages`/`external_packages_ids` stay in lockstep after
///   registration and after hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Node identifier.
    pub id: NodeId,
    /// Artifact file name.
    pub name: String,
    /// Kind of artifact built.
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Programming language, lowercased.
    pub programming_language: String,
    /// Canonical output path relative to the repository root.
    pub relative_path: PathBuf,
    /// Additional artifact locations (after copy or install steps).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<PathBuf>,
    /// Source files relative to the repository root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<PathBuf>,
    /// Ordered dependency edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<NodeRef>,
    /// Dependency id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence records for this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Evidence id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
    /// External package dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_packages: Vec<ExternalPackage>,
    /// External package id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub external_packages_ids: BTreeSet<PackageId>,
}

impl Component {
    /// Creates a component with empty edge sets.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidComponent`] when `name` or
    /// `programming_language` is empty.
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        component_type: ComponentType,
        programming_language: impl Into<String>,
        relative_path: PathBuf,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::InvalidComponent("component name is empty".to_string()));
        }
        let programming_language = programming_language.into().to_lowercase();
        if programming_language.is_empty() {
            return Err(ModelError::InvalidComponent(format!(
                "component '{name}' has no programming language"
            )));
        }
        Ok(Self {
            id,
            name,
            component_type,
            programming_language,
            relative_path,
            locations: Vec::new(),
            source_files: Vec::new(),
            depends_on: Vec::new(),
            depends_on_ids: BTreeSet::new(),
            evidence: Vec::new(),
            evidence_ids: BTreeSet::new(),
            external_packages: Vec::new(),
            external_packages_ids: BTreeSet::new(),
        })
    }

    /// Appends an external package, keeping the id index in lockstep.
    pub fn push_external_package(&mut self, package: ExternalPackage) {
        self.external_packages_ids.insert(package.id.clone());
        self.external_packages.push(package);
    }
}

impl_rig_node!(Component, NodeKind::Component);

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Virtual target grouping other nodes without producing an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregator {
    /// Node identifier.
    pub id: NodeId,
    /// Target name.
    pub name: String,
    /// Ordered dependency edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<NodeRef>,
    /// Dependency id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence records for this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Evidence id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
}

impl Aggregator {
    /// Creates an aggregator with empty edge sets.
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            depends_on: Vec::new(),
            depends_on_ids: BTreeSet::new(),
            evidence: Vec::new(),
            evidence_ids: BTreeSet::new(),
        }
    }
}

impl_rig_node!(Aggregator, NodeKind::Aggregator);

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Target whose value is executing a command.
///
/// # Invariants
/// - `args_nodes`/`args_nodes_ids` stay in lockstep; entries are nodes
///   referenced symbolically by `arguments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    /// Node identifier.
    pub id: NodeId,
    /// Command name.
    pub name: String,
    /// Ordered command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    /// Nodes referenced symbolically by the arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args_nodes: Vec<NodeRef>,
    /// Argument-node id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub args_nodes_ids: BTreeSet<NodeId>,
    /// Ordered dependency edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<NodeRef>,
    /// Dependency id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence records for this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Evidence id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
}

impl Runner {
    /// Creates a runner with the given arguments and empty edge sets.
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            arguments,
            args_nodes: Vec::new(),
            args_nodes_ids: BTreeSet::new(),
            depends_on: Vec::new(),
            depends_on_ids: BTreeSet::new(),
            evidence: Vec::new(),
            evidence_ids: BTreeSet::new(),
        }
    }

    /// Appends an argument node, keeping the id index in lockstep.
    pub fn push_args_node(&mut self, node: NodeRef) {
        self.args_nodes_ids.insert(node.id.clone());
        self.args_nodes.push(node);
    }
}

impl_rig_node!(Runner, NodeKind::Runner);

// ============================================================================
// SECTION: Test Definition
// ============================================================================

/// Registered test binding a name and framework to an executable.
///
/// # Invariants
/// - `test_executable`, when present, references a component or a runner.
/// - `test_components_ids` is the transitive build closure needed to run the
///   test; `components_being_tested_ids` is the subject under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Node identifier.
    pub id: NodeId,
    /// Test name.
    pub name: String,
    /// Test framework tag (free form, e.g. `CTest`).
    pub test_framework: String,
    /// Component or runner that executes the test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_executable: Option<NodeRef>,
    /// Component ids in the transitive closure needed to run the test.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub test_components_ids: BTreeSet<NodeId>,
    /// Component ids under test.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub components_being_tested_ids: BTreeSet<NodeId>,
    /// Source files the test is built from or driven by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<PathBuf>,
    /// Ordered dependency edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<NodeRef>,
    /// Dependency id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_ids: BTreeSet<NodeId>,
    /// Evidence records for this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Evidence id index.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub evidence_ids: BTreeSet<EvidenceId>,
}

impl TestDefinition {
    /// Creates a test definition with empty edge sets.
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>, test_framework: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            test_framework: test_framework.into(),
            test_executable: None,
            test_components_ids: BTreeSet::new(),
            components_being_tested_ids: BTreeSet::new(),
            source_files: Vec::new(),
            depends_on: Vec::new(),
            depends_on_ids: BTreeSet::new(),
            evidence: Vec::new(),
            evidence_ids: BTreeSet::new(),
        }
    }
}

impl_rig_node!(TestDefinition, NodeKind::Test);
