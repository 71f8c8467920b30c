// rig-core/src/runtime/normalize.rs
// ============================================================================
// Module: RIG Stable-Key Normalization
// Description: Content-derived identifiers replacing extraction counters.
// Purpose: Make independently extracted graphs comparable by id.
// Dependencies: crate::core, crate::runtime::graph, thiserror
// ============================================================================

//! ## Overview
//! Extraction assigns counter-based identifiers (`comp-1`, `evidence-3`) that
//! differ between runs over the same repository. Normalization deep-copies a
//! graph and re-keys every id-bearing entity and every id reference with a
//! stable key derived from entity content, so two independent extractions of
//! the same repository normalize to identical graphs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::Evidence;
use crate::core::EvidenceId;
use crate::core::NodeId;
use crate::core::NodeRef;
use crate::core::PackageId;
use crate::core::nodes::Aggregator;
use crate::core::nodes::Component;
use crate::core::nodes::Runner;
use crate::core::nodes::TestDefinition;
use crate::core::package::ExternalPackage;
use crate::core::package::PackageManager;
use crate::runtime::graph::Rig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised during normalization.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Two distinct entities derived the same stable key.
    ///
    /// Colliding inputs violate id uniqueness upstream; normalization rejects
    /// them instead of silently merging or disambiguating.
    #[error("stable key collision: '{0}'")]
    StableKeyCollision(String),
}

// ============================================================================
// SECTION: Stable Keys
// ============================================================================

/// Stable key for a component: `name:type:language`.
#[must_use]
pub fn component_key(component: &Component) -> String {
    format!(
        "{}:{}:{}",
        component.name,
        component.component_type.as_str(),
        component.programming_language
    )
}

/// Stable key for an aggregator: `name:aggregator`.
#[must_use]
pub fn aggregator_key(aggregator: &Aggregator) -> String {
    format!("{}:aggregator", aggregator.name)
}

/// Stable key for a runner: `name:runner`.
#[must_use]
pub fn runner_key(runner: &Runner) -> String {
    format!("{}:runner", runner.name)
}

/// Stable key for a test: `name:test:framework`.
#[must_use]
pub fn test_key(test: &TestDefinition) -> String {
    format!("{}:test:{}", test.name, test.test_framework)
}

/// Stable key for evidence: `evidence:first-reference` (or `unknown`).
#[must_use]
pub fn evidence_key(evidence: &Evidence) -> String {
    format!("evidence:{}", evidence.first_reference().unwrap_or("unknown"))
}

/// Stable key for a package manager: `pm:name:package_name`.
#[must_use]
pub fn package_manager_key(manager: &PackageManager) -> String {
    format!("pm:{}:{}", manager.name, manager.package_name)
}

/// Stable key for an external package: `pkg:name:pm_name`.
///
/// The owning manager is resolved through the graph; an unresolved manager
/// contributes the literal `unknown`.
#[must_use]
pub fn external_package_key(rig: &Rig, package: &ExternalPackage) -> String {
    let manager_name = rig
        .package_manager(&package.package_manager_id)
        .map_or("unknown", |manager| manager.name.as_str());
    format!("pkg:{}:{manager_name}", package.name)
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Id remapping tables built over one graph.
#[derive(Debug, Default)]
struct KeyMaps {
    /// Evidence old id to stable key.
    evidence: BTreeMap<EvidenceId, EvidenceId>,
    /// Package manager old id to stable key.
    managers: BTreeMap<PackageId, PackageId>,
    /// External package old id to stable key.
    packages: BTreeMap<PackageId, PackageId>,
    /// Node old id to stable key, all four kinds combined.
    nodes: BTreeMap<NodeId, NodeId>,
}

/// Returns a normalized deep copy of the graph with content-derived ids.
///
/// Normalization is idempotent: stable keys derive from fields that
/// normalization never changes, so a second pass maps every id to itself.
///
/// # Errors
///
/// Returns [`NormalizeError::StableKeyCollision`] when two distinct entities
/// of one kind derive the same stable key.
pub fn normalize(rig: &Rig) -> Result<Rig, NormalizeError> {
    let maps = build_key_maps(rig)?;

    let mut normalized = Rig::new();
    normalized.repository = rig.repository.clone();
    normalized.build_system = rig.build_system.clone();

    for record in rig.evidence_records() {
        let mut copy = record.clone();
        copy.id = maps.evidence.get(&record.id).cloned().unwrap_or_else(|| record.id.clone());
        normalized.evidence.insert(copy.id.clone(), copy);
    }

    for manager in rig.package_managers() {
        let mut copy = manager.clone();
        copy.id = maps.managers.get(&manager.id).cloned().unwrap_or_else(|| manager.id.clone());
        normalized.package_managers.insert(copy.id.clone(), copy);
    }

    for package in rig.external_packages() {
        let mut copy = package.clone();
        copy.id = maps.packages.get(&package.id).cloned().unwrap_or_else(|| package.id.clone());
        copy.package_manager_id = remap_package(&maps.managers, &package.package_manager_id);
        normalized.external_packages.insert(copy.id.clone(), copy);
    }

    for component in rig.components() {
        let mut copy = component.clone();
        copy.id = remap_node(&maps.nodes, &component.id);
        remap_common(&maps, &mut copy.depends_on, &mut copy.depends_on_ids, &mut copy.evidence, &mut copy.evidence_ids);
        copy.external_packages_ids = component
            .external_packages_ids
            .iter()
            .map(|id| remap_package(&maps.packages, id))
            .collect();
        for package in &mut copy.external_packages {
            package.id = remap_package(&maps.packages, &package.id);
            package.package_manager_id = remap_package(&maps.managers, &package.package_manager_id);
        }
        normalized.components.insert(copy.id.clone(), copy);
    }

    for aggregator in rig.aggregators() {
        let mut copy = aggregator.clone();
        copy.id = remap_node(&maps.nodes, &aggregator.id);
        remap_common(&maps, &mut copy.depends_on, &mut copy.depends_on_ids, &mut copy.evidence, &mut copy.evidence_ids);
        normalized.aggregators.insert(copy.id.clone(), copy);
    }

    for runner in rig.runners() {
        let mut copy = runner.clone();
        copy.id = remap_node(&maps.nodes, &runner.id);
        remap_common(&maps, &mut copy.depends_on, &mut copy.depends_on_ids, &mut copy.evidence, &mut copy.evidence_ids);
        for edge in &mut copy.args_nodes {
            edge.id = remap_node(&maps.nodes, &edge.id);
        }
        copy.args_nodes_ids =
            runner.args_nodes_ids.iter().map(|id| remap_node(&maps.nodes, id)).collect();
        normalized.runners.insert(copy.id.clone(), copy);
    }

    for test in rig.tests() {
        let mut copy = test.clone();
        copy.id = remap_node(&maps.nodes, &test.id);
        remap_common(&maps, &mut copy.depends_on, &mut copy.depends_on_ids, &mut copy.evidence, &mut copy.evidence_ids);
        if let Some(executable) = &mut copy.test_executable {
            executable.id = remap_node(&maps.nodes, &executable.id);
        }
        copy.test_components_ids =
            test.test_components_ids.iter().map(|id| remap_node(&maps.nodes, id)).collect();
        copy.components_being_tested_ids = test
            .components_being_tested_ids
            .iter()
            .map(|id| remap_node(&maps.nodes, id))
            .collect();
        normalized.tests.insert(copy.id.clone(), copy);
    }

    Ok(normalized)
}

/// Builds the old-id to stable-key tables, rejecting collisions.
fn build_key_maps(rig: &Rig) -> Result<KeyMaps, NormalizeError> {
    let mut maps = KeyMaps::default();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for record in rig.evidence_records() {
        let key = evidence_key(record);
        maps.evidence.insert(record.id.clone(), EvidenceId::new(key));
    }
    for manager in rig.package_managers() {
        let key = package_manager_key(manager);
        check_collision(&mut seen, &key)?;
        maps.managers.insert(manager.id.clone(), PackageId::new(key));
    }
    for package in rig.external_packages() {
        let key = external_package_key(rig, package);
        check_collision(&mut seen, &key)?;
        maps.packages.insert(package.id.clone(), PackageId::new(key));
    }
    for component in rig.components() {
        let key = component_key(component);
        check_collision(&mut seen, &key)?;
        maps.nodes.insert(component.id.clone(), NodeId::new(key));
    }
    for aggregator in rig.aggregators() {
        let key = aggregator_key(aggregator);
        check_collision(&mut seen, &key)?;
        maps.nodes.insert(aggregator.id.clone(), NodeId::new(key));
    }
    for runner in rig.runners() {
        let key = runner_key(runner);
        check_collision(&mut seen, &key)?;
        maps.nodes.insert(runner.id.clone(), NodeId::new(key));
    }
    for test in rig.tests() {
        let key = test_key(test);
        check_collision(&mut seen, &key)?;
        maps.nodes.insert(test.id.clone(), NodeId::new(key));
    }
    Ok(maps)
}

/// Records a stable key, rejecting duplicates.
///
/// Identical evidence keys are allowed: two evidence records anchored at one
/// reference are semantically the same record and merge by key.
fn check_collision(seen: &mut BTreeSet<String>, key: &str) -> Result<(), NormalizeError> {
    if !seen.insert(key.to_string()) {
        return Err(NormalizeError::StableKeyCollision(key.to_string()));
    }
    Ok(())
}

/// Remaps a node id, keeping unknown ids unchanged.
fn remap_node(nodes: &BTreeMap<NodeId, NodeId>, id: &NodeId) -> NodeId {
    nodes.get(id).cloned().unwrap_or_else(|| id.clone())
}

/// Remaps a package id, keeping unknown ids unchanged.
fn remap_package(packages: &BTreeMap<PackageId, PackageId>, id: &PackageId) -> PackageId {
    packages.get(id).cloned().unwrap_or_else(|| id.clone())
}

/// Remaps the shared edge fields of a node copy in place.
fn remap_common(
    maps: &KeyMaps,
    depends_on: &mut [NodeRef],
    depends_on_ids: &mut BTreeSet<NodeId>,
    evidence: &mut [Evidence],
    evidence_ids: &mut BTreeSet<EvidenceId>,
) {
    for edge in depends_on.iter_mut() {
        edge.id = remap_node(&maps.nodes, &edge.id);
    }
    *depends_on_ids = depends_on_ids.iter().map(|id| remap_node(&maps.nodes, id)).collect();
    for record in evidence.iter_mut() {
        record.id = maps.evidence.get(&record.id).cloned().unwrap_or_else(|| record.id.clone());
    }
    *evidence_ids = evidence_ids
        .iter()
        .map(|id| maps.evidence.get(id).cloned().unwrap_or_else(|| id.clone()))
        .collect();
}
