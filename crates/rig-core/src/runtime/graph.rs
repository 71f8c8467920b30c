// rig-core/src/runtime/graph.rs
// ============================================================================
// Module: RIG Graph Engine
// Description: Registration, id propagation, hydration, and lookups.
// Purpose: Provide the only legal way to populate a Repository Intelligence Graph.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The graph is an arena: the four node maps own every node, the evidence and
//! package maps own every shared record, and cross-node edges are typed id
//! references. Registration runs cycle-safe id propagation over each added
//! node's evidence and dependency edges; loading populates id sets first and
//! calls [`Rig::hydrate_all`] to rebuild the object lists. The engine is
//! single-threaded: extraction mutates it sequentially and readers may share
//! it only once writers are done.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::BuildSystemInfo;
use crate::core::Evidence;
use crate::core::EvidenceId;
use crate::core::NodeId;
use crate::core::NodeKind;
use crate::core::NodeRef;
use crate::core::PackageId;
use crate::core::RepositoryInfo;
use crate::core::RigError;
use crate::core::nodes::Aggregator;
use crate::core::nodes::Component;
use crate::core::nodes::ComponentType;
use crate::core::nodes::RigNode;
use crate::core::nodes::Runner;
use crate::core::nodes::TestDefinition;
use crate::core::package::ExternalPackage;
use crate::core::package::PackageManager;

// ============================================================================
// SECTION: Graph
// ============================================================================

/// Repository Intelligence Graph: canonical build-system-agnostic facts.
///
/// # Invariants
/// - Node ids are unique across all four node maps.
/// - Every edge list and its parallel id set agree after registration and
///   after hydration.
/// - Every dependency reference resolves to a registered node once the
///   producing extractor has finished.
#[derive(Debug, Default, Clone)]
pub struct Rig {
    /// Repository-level facts.
    pub(crate) repository: Option<RepositoryInfo>,
    /// Build-system-level facts.
    pub(crate) build_system: Option<BuildSystemInfo>,
    /// Components by id.
    pub(crate) components: BTreeMap<NodeId, Component>,
    /// Aggregators by id.
    pub(crate) aggregators: BTreeMap<NodeId, Aggregator>,
    /// Runners by id.
    pub(crate) runners: BTreeMap<NodeId, Runner>,
    /// Tests by id.
    pub(crate) tests: BTreeMap<NodeId, TestDefinition>,
    /// Evidence records by id (single source of truth).
    pub(crate) evidence: BTreeMap<EvidenceId, Evidence>,
    /// Package managers by id.
    pub(crate) package_managers: BTreeMap<PackageId, PackageManager>,
    /// External packages by id.
    pub(crate) external_packages: BTreeMap<PackageId, ExternalPackage>,
}

impl Rig {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Singleton facts
    // ------------------------------------------------------------------

    /// Replaces the repository info slot.
    pub fn set_repository_info(&mut self, info: RepositoryInfo) {
        self.repository = Some(info);
    }

    /// Replaces the build system info slot.
    pub fn set_build_system_info(&mut self, info: BuildSystemInfo) {
        self.build_system = Some(info);
    }

    /// Returns the repository info, if set.
    #[must_use]
    pub fn repository(&self) -> Option<&RepositoryInfo> {
        self.repository.as_ref()
    }

    /// Returns the build system info, if set.
    #[must_use]
    pub fn build_system(&self) -> Option<&BuildSystemInfo> {
        self.build_system.as_ref()
    }

    // ------------------------------------------------------------------
    // Shared record registration
    // ------------------------------------------------------------------

    /// Registers an evidence record (idempotent by id).
    pub fn register_evidence(&mut self, evidence: Evidence) {
        self.evidence.entry(evidence.id.clone()).or_insert(evidence);
    }

    /// Registers a package manager (idempotent by id).
    pub fn register_package_manager(&mut self, manager: PackageManager) {
        self.package_managers.entry(manager.id.clone()).or_insert(manager);
    }

    /// Registers an external package (idempotent by id).
    ///
    /// # Errors
    ///
    /// Returns [`RigError::UnknownPackageManager`] when the package's manager
    /// is not registered.
    pub fn register_external_package(&mut self, package: ExternalPackage) -> Result<(), RigError> {
        if !self.package_managers.contains_key(&package.package_manager_id) {
            return Err(RigError::UnknownPackageManager(package.package_manager_id));
        }
        self.external_packages.entry(package.id.clone()).or_insert(package);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Node registration
    // ------------------------------------------------------------------

    /// Adds a component (idempotent by id).
    ///
    /// Registers the component's external packages, then runs id
    /// propagation over its evidence and dependency closure.
    ///
    /// # Errors
    ///
    /// Returns [`RigError`] when an external package names an unregistered
    /// manager or a dependency reference does not resolve.
    pub fn add_component(&mut self, component: Component) -> Result<(), RigError> {
        if self.components.contains_key(&component.id) {
            return Ok(());
        }
        for package in &component.external_packages {
            if !self.package_managers.contains_key(&package.package_manager_id) {
                return Err(RigError::UnknownPackageManager(package.package_manager_id.clone()));
            }
        }
        let id = component.id.clone();
        for package in component.external_packages.clone() {
            self.external_packages.entry(package.id.clone()).or_insert(package);
        }
        self.components.insert(id.clone(), component);
        self.propagate_ids(NodeRef::component(id))
    }

    /// Adds an aggregator (idempotent by id), then runs id propagation.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::UnknownDependency`] when a dependency reference
    /// does not resolve.
    pub fn add_aggregator(&mut self, aggregator: Aggregator) -> Result<(), RigError> {
        if self.aggregators.contains_key(&aggregator.id) {
            return Ok(());
        }
        let id = aggregator.id.clone();
        self.aggregators.insert(id.clone(), aggregator);
        self.propagate_ids(NodeRef::aggregator(id))
    }

    /// Adds a runner (idempotent by id), then runs id propagation.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::UnknownDependency`] when a dependency or argument
    /// node reference does not resolve.
    pub fn add_runner(&mut self, runner: Runner) -> Result<(), RigError> {
        if self.runners.contains_key(&runner.id) {
            return Ok(());
        }
        let id = runner.id.clone();
        self.runners.insert(id.clone(), runner);
        self.propagate_ids(NodeRef::runner(id))
    }

    /// Adds a test definition (idempotent by id), then runs id propagation.
    ///
    /// The test's executable reference and component sets must already be
    /// registered; registration fails closed otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::InvalidTestExecutable`] when the executable
    /// reference is neither a component nor a runner, and
    /// [`RigError::UnknownDependency`] when any referenced node is not
    /// registered.
    pub fn add_test(&mut self, test: TestDefinition) -> Result<(), RigError> {
        if self.tests.contains_key(&test.id) {
            return Ok(());
        }
        if let Some(executable) = &test.test_executable {
            match executable.kind {
                NodeKind::Component if self.components.contains_key(&executable.id) => {}
                NodeKind::Runner if self.runners.contains_key(&executable.id) => {}
                NodeKind::Component | NodeKind::Runner => {
                    return Err(RigError::UnknownDependency(executable.clone()));
                }
                NodeKind::Aggregator | NodeKind::Test => {
                    return Err(RigError::InvalidTestExecutable(executable.clone()));
                }
            }
        }
        for component_id in test.test_components_ids.iter().chain(&test.components_being_tested_ids)
        {
            if !self.components.contains_key(component_id) {
                return Err(RigError::UnknownDependency(NodeRef::component(component_id.clone())));
            }
        }
        let id = test.id.clone();
        self.tests.insert(id.clone(), test);
        self.propagate_ids(NodeRef::test(id))
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Returns a component by id.
    #[must_use]
    pub fn component(&self, id: &NodeId) -> Option<&Component> {
        self.components.get(id)
    }

    /// Returns an aggregator by id.
    #[must_use]
    pub fn aggregator(&self, id: &NodeId) -> Option<&Aggregator> {
        self.aggregators.get(id)
    }

    /// Returns a runner by id.
    #[must_use]
    pub fn runner(&self, id: &NodeId) -> Option<&Runner> {
        self.runners.get(id)
    }

    /// Returns a test by id.
    #[must_use]
    pub fn test(&self, id: &NodeId) -> Option<&TestDefinition> {
        self.tests.get(id)
    }

    /// Returns any node by id, first match across the maps in the stable
    /// order components, aggregators, runners, tests.
    #[must_use]
    pub fn node_by_id(&self, id: &NodeId) -> Option<&dyn RigNode> {
        if let Some(node) = self.components.get(id) {
            return Some(node);
        }
        if let Some(node) = self.aggregators.get(id) {
            return Some(node);
        }
        if let Some(node) = self.runners.get(id) {
            return Some(node);
        }
        self.tests.get(id).map(|node| node as &dyn RigNode)
    }

    /// Returns the first build node (component, aggregator, or runner) with
    /// the given name.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&dyn RigNode> {
        self.all_nodes().into_iter().find(|node| node.name() == name)
    }

    /// Returns all build nodes in the stable order components, aggregators,
    /// runners. Tests are not build nodes and are excluded.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<&dyn RigNode> {
        let mut nodes: Vec<&dyn RigNode> = Vec::new();
        nodes.extend(self.components.values().map(|node| node as &dyn RigNode));
        nodes.extend(self.aggregators.values().map(|node| node as &dyn RigNode));
        nodes.extend(self.runners.values().map(|node| node as &dyn RigNode));
        nodes
    }

    /// Iterates components in id order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Iterates aggregators in id order.
    pub fn aggregators(&self) -> impl Iterator<Item = &Aggregator> {
        self.aggregators.values()
    }

    /// Iterates runners in id order.
    pub fn runners(&self) -> impl Iterator<Item = &Runner> {
        self.runners.values()
    }

    /// Iterates tests in id order.
    pub fn tests(&self) -> impl Iterator<Item = &TestDefinition> {
        self.tests.values()
    }

    /// Iterates evidence records in id order.
    pub fn evidence_records(&self) -> impl Iterator<Item = &Evidence> {
        self.evidence.values()
    }

    /// Returns an evidence record by id.
    #[must_use]
    pub fn evidence(&self, id: &EvidenceId) -> Option<&Evidence> {
        self.evidence.get(id)
    }

    /// Iterates package managers in id order.
    pub fn package_managers(&self) -> impl Iterator<Item = &PackageManager> {
        self.package_managers.values()
    }

    /// Returns a package manager by id.
    #[must_use]
    pub fn package_manager(&self, id: &PackageId) -> Option<&PackageManager> {
        self.package_managers.get(id)
    }

    /// Iterates external packages in id order.
    pub fn external_packages(&self) -> impl Iterator<Item = &ExternalPackage> {
        self.external_packages.values()
    }

    /// Returns an external package by id.
    #[must_use]
    pub fn external_package(&self, id: &PackageId) -> Option<&ExternalPackage> {
        self.external_packages.get(id)
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Counts components grouped by component type.
    #[must_use]
    pub fn component_count_by_type(&self) -> BTreeMap<ComponentType, usize> {
        let mut counts = BTreeMap::new();
        for component in self.components.values() {
            *counts.entry(component.component_type).or_insert(0) += 1;
        }
        counts
    }

    /// Counts components grouped by programming language.
    #[must_use]
    pub fn component_count_by_language(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for component in self.components.values() {
            *counts.entry(component.programming_language.clone()).or_insert(0) += 1;
        }
        counts
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Checks that a typed reference resolves to a registered node of the
    /// referenced kind.
    fn resolve_ref(&self, node_ref: &NodeRef) -> Result<(), RigError> {
        let present = match node_ref.kind {
            NodeKind::Component => self.components.contains_key(&node_ref.id),
            NodeKind::Aggregator => self.aggregators.contains_key(&node_ref.id),
            NodeKind::Runner => self.runners.contains_key(&node_ref.id),
            NodeKind::Test => self.tests.contains_key(&node_ref.id),
        };
        if present { Ok(()) } else { Err(RigError::UnknownDependency(node_ref.clone())) }
    }

    /// Walks the closure over evidence and dependency edges from a root,
    /// registering evidence records and keeping id indexes in lockstep.
    ///
    /// The walk is iterative with a visited set, bounding work at
    /// O(nodes + edges) and tolerating dependency cycles.
    fn propagate_ids(&mut self, root: NodeRef) -> Result<(), RigError> {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut queue: Vec<NodeRef> = vec![root];
        while let Some(current) = queue.pop() {
            if !visited.insert(current.id.clone()) {
                continue;
            }
            self.resolve_ref(&current)?;
            let (evidence_values, edges) = self.snapshot_node(&current);
            for record in evidence_values {
                self.evidence.entry(record.id.clone()).or_insert(record);
            }
            for edge in &edges {
                self.resolve_ref(edge)?;
            }
            self.sync_node_ids(&current);
            queue.extend(edges);
        }
        Ok(())
    }

    /// Clones a node's evidence values and outgoing edges for propagation.
    ///
    /// Runner argument nodes count as outgoing edges alongside dependencies.
    fn snapshot_node(&self, node_ref: &NodeRef) -> (Vec<Evidence>, Vec<NodeRef>) {
        match node_ref.kind {
            NodeKind::Component => self.components.get(&node_ref.id).map_or_else(
                || (Vec::new(), Vec::new()),
                |node| (node.evidence.clone(), node.depends_on.clone()),
            ),
            NodeKind::Aggregator => self.aggregators.get(&node_ref.id).map_or_else(
                || (Vec::new(), Vec::new()),
                |node| (node.evidence.clone(), node.depends_on.clone()),
            ),
            NodeKind::Runner => self.runners.get(&node_ref.id).map_or_else(
                || (Vec::new(), Vec::new()),
                |node| {
                    let mut edges = node.depends_on.clone();
                    edges.extend(node.args_nodes.iter().cloned());
                    (node.evidence.clone(), edges)
                },
            ),
            NodeKind::Test => self.tests.get(&node_ref.id).map_or_else(
                || (Vec::new(), Vec::new()),
                |node| {
                    let mut edges = node.depends_on.clone();
                    edges.extend(node.test_executable.iter().cloned());
                    (node.evidence.clone(), edges)
                },
            ),
        }
    }

    /// Rebuilds a node's id indexes from its object lists.
    fn sync_node_ids(&mut self, node_ref: &NodeRef) {
        match node_ref.kind {
            NodeKind::Component => {
                if let Some(node) = self.components.get_mut(&node_ref.id) {
                    sync_common_ids(node);
                    for package in &node.external_packages {
                        node.external_packages_ids.insert(package.id.clone());
                    }
                }
            }
            NodeKind::Aggregator => {
                if let Some(node) = self.aggregators.get_mut(&node_ref.id) {
                    sync_common_ids(node);
                }
            }
            NodeKind::Runner => {
                if let Some(node) = self.runners.get_mut(&node_ref.id) {
                    sync_common_ids(node);
                    let arg_ids: Vec<NodeId> =
                        node.args_nodes.iter().map(|edge| edge.id.clone()).collect();
                    node.args_nodes_ids.extend(arg_ids);
                }
            }
            NodeKind::Test => {
                if let Some(node) = self.tests.get_mut(&node_ref.id) {
                    sync_common_ids(node);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Hydration
    // ------------------------------------------------------------------

    /// Rebuilds every object list from its id set after a load.
    ///
    /// Hydration is idempotent: entries already present in a list are kept,
    /// missing ones are appended in id order, and the list/set invariant
    /// holds afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RigError`] when an id set references an evidence record,
    /// node, or package that is not registered.
    pub fn hydrate_all(&mut self) -> Result<(), RigError> {
        let mut kind_index: BTreeMap<NodeId, NodeKind> = BTreeMap::new();
        for id in self.components.keys() {
            kind_index.insert(id.clone(), NodeKind::Component);
        }
        for id in self.aggregators.keys() {
            kind_index.insert(id.clone(), NodeKind::Aggregator);
        }
        for id in self.runners.keys() {
            kind_index.insert(id.clone(), NodeKind::Runner);
        }
        for id in self.tests.keys() {
            kind_index.insert(id.clone(), NodeKind::Test);
        }

        let evidence = &self.evidence;
        let external_packages = &self.external_packages;

        for node in self.components.values_mut() {
            hydrate_common(node, evidence, &kind_index)?;
            for package_id in node.external_packages_ids.clone() {
                if node.external_packages.iter().any(|package| package.id == package_id) {
                    continue;
                }
                let package = external_packages
                    .get(&package_id)
                    .ok_or_else(|| RigError::UnknownPackage(package_id.clone()))?;
                node.external_packages.push(package.clone());
            }
        }
        for node in self.aggregators.values_mut() {
            hydrate_common(node, evidence, &kind_index)?;
        }
        for node in self.runners.values_mut() {
            hydrate_common(node, evidence, &kind_index)?;
            for arg_id in node.args_nodes_ids.clone() {
                if node.args_nodes.iter().any(|edge| edge.id == arg_id) {
                    continue;
                }
                let kind = kind_index
                    .get(&arg_id)
                    .copied()
                    .ok_or_else(|| RigError::UnresolvedId(arg_id.clone()))?;
                node.args_nodes.push(NodeRef::new(kind, arg_id));
            }
        }
        for node in self.tests.values_mut() {
            hydrate_common(node, evidence, &kind_index)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Hydration Helpers
// ============================================================================

/// Fills a node's evidence and dependency lists from their id sets.
fn hydrate_common<N: RigNode + EdgeListAccess>(
    node: &mut N,
    evidence: &BTreeMap<EvidenceId, Evidence>,
    kind_index: &BTreeMap<NodeId, NodeKind>,
) -> Result<(), RigError> {
    for evidence_id in node.evidence_ids().clone() {
        if node.evidence().iter().any(|record| record.id == evidence_id) {
            continue;
        }
        let record = evidence
            .get(&evidence_id)
            .ok_or_else(|| RigError::UnknownEvidence(evidence_id.clone()))?;
        node.evidence_list_mut().push(record.clone());
    }
    for dep_id in node.depends_on_ids().clone() {
        if node.depends_on().iter().any(|edge| edge.id == dep_id) {
            continue;
        }
        let kind = kind_index
            .get(&dep_id)
            .copied()
            .ok_or_else(|| RigError::UnresolvedId(dep_id.clone()))?;
        node.depends_on_list_mut().push(NodeRef::new(kind, dep_id));
    }
    Ok(())
}

/// Rebuilds the common id indexes (evidence, dependencies) from lists.
fn sync_common_ids<N: RigNode + EdgeListAccess>(node: &mut N) {
    let evidence_ids: Vec<EvidenceId> =
        node.evidence().iter().map(|record| record.id.clone()).collect();
    for id in evidence_ids {
        node.insert_evidence_id(id);
    }
    let dep_ids: Vec<NodeId> = node.depends_on().iter().map(|edge| edge.id.clone()).collect();
    for id in dep_ids {
        node.insert_dependency_id(id);
    }
}

/// Mutable access to the common edge lists, used only by hydration.
pub(crate) trait EdgeListAccess {
    /// Returns the evidence list for appending hydrated records.
    fn evidence_list_mut(&mut self) -> &mut Vec<Evidence>;
    /// Returns the dependency list for appending hydrated edges.
    fn depends_on_list_mut(&mut self) -> &mut Vec<NodeRef>;
}

/// Implements [`EdgeListAccess`] for a node struct with standard fields.
macro_rules! impl_edge_list_access {
    ($ty:ty) => {
        impl EdgeListAccess for $ty {
            fn evidence_list_mut(&mut self) -> &mut Vec<Evidence> {
                &mut self.evidence
            }

            fn depends_on_list_mut(&mut self) -> &mut Vec<NodeRef> {
                &mut self.depends_on
            }
        }
    };
}

impl_edge_list_access!(Component);
impl_edge_list_access!(Aggregator);
impl_edge_list_access!(Runner);
impl_edge_list_access!(TestDefinition);
