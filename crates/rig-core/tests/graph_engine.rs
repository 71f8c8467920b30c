// crates/rig-core/tests/graph_engine.rs
// ============================================================================
// Module: Graph Engine Unit Tests
// Description: Registration, propagation, hydration, and lookup behavior.
// Purpose: Validate the engine invariants after every public operation.
// ============================================================================

//! ## Overview
//! Unit-level tests for the graph engine:
//! - Idempotent registration by id
//! - Id propagation over evidence and dependency edges
//! - Fail-closed rejection of unresolved references
//! - Hydration rebuilding object lists from id sets
//! - Stable lookup and iteration order

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::PathBuf;

use rig_core::Aggregator;
use rig_core::Component;
use rig_core::ComponentType;
use rig_core::Evidence;
use rig_core::EvidenceId;
use rig_core::ExternalPackage;
use rig_core::NodeId;
use rig_core::NodeKind;
use rig_core::NodeRef;
use rig_core::PackageId;
use rig_core::PackageManager;
use rig_core::Rig;
use rig_core::RigError;
use rig_core::RigNode;
use rig_core::Runner;
use rig_core::TestDefinition;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn evidence(id: &str, reference: &str) -> Evidence {
    Evidence::from_lines(EvidenceId::new(id), vec![reference.to_string()]).expect("evidence")
}

fn component(id: &str, name: &str) -> Component {
    let mut component = Component::new(
        NodeId::new(id),
        name,
        ComponentType::Executable,
        "cxx",
        PathBuf::from(name),
    )
    .expect("component");
    component.push_evidence(evidence(&format!("evidence-{id}"), "CMakeLists.txt:1"));
    component
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn evidence_without_line_or_call_stack_is_rejected() {
    let err = Evidence::new(EvidenceId::new("evidence-1"), Vec::new(), Vec::new())
        .expect_err("empty evidence");
    assert!(matches!(err, rig_core::ModelError::InvalidEvidence(_)));
}

#[test]
fn evidence_with_only_a_call_stack_is_accepted() {
    let record = Evidence::new(
        EvidenceId::new("evidence-1"),
        Vec::new(),
        vec!["CMakeLists.txt:5".to_string(), "cmake/macros.cmake:12".to_string()],
    )
    .expect("call-stack evidence");
    assert_eq!(record.first_reference(), Some("CMakeLists.txt:5"));
}

#[test]
fn component_without_language_is_rejected() {
    let err = Component::new(
        NodeId::new("comp-1"),
        "hello",
        ComponentType::Executable,
        "",
        PathBuf::from("hello"),
    )
    .expect_err("missing language");
    assert!(matches!(err, rig_core::ModelError::InvalidComponent(_)));
}

#[test]
fn component_language_is_lowercased() {
    let component = Component::new(
        NodeId::new("comp-1"),
        "hello",
        ComponentType::Executable,
        "CXX",
        PathBuf::from("hello"),
    )
    .expect("component");
    assert_eq!(component.programming_language, "cxx");
}

// ============================================================================
// SECTION: Registration
// ============================================================================

#[test]
fn add_component_registers_evidence_in_map() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello")).expect("add");

    assert_eq!(rig.components().count(), 1);
    assert_eq!(rig.evidence_records().count(), 1);
    let stored = rig.component(&NodeId::new("comp-1")).expect("component");
    assert_eq!(stored.evidence_ids.len(), 1);
    assert!(stored.evidence_ids.contains(&EvidenceId::new("evidence-comp-1")));
}

#[test]
fn add_component_is_idempotent_by_id() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello")).expect("first add");
    let mut replacement = component("comp-1", "other-name");
    replacement.programming_language = "c".to_string();
    rig.add_component(replacement).expect("second add is a no-op");

    let stored = rig.component(&NodeId::new("comp-1")).expect("component");
    assert_eq!(stored.name, "hello");
    assert_eq!(stored.programming_language, "cxx");
}

#[test]
fn add_component_rejects_unregistered_dependency() {
    let mut rig = Rig::new();
    let mut hello = component("comp-1", "hello");
    hello.push_dependency(NodeRef::component("comp-99"));

    let err = rig.add_component(hello).expect_err("unresolved dependency");
    assert!(matches!(err, RigError::UnknownDependency(_)));
}

#[test]
fn dependencies_registered_first_are_accepted() {
    let mut rig = Rig::new();
    let mut utils = component("comp-1", "utils");
    utils.component_type = ComponentType::StaticLibrary;
    rig.add_component(utils).expect("utils");

    let mut hello = component("comp-2", "hello");
    hello.push_dependency(NodeRef::component("comp-1"));
    rig.add_component(hello).expect("hello");

    let stored = rig.component(&NodeId::new("comp-2")).expect("hello");
    assert_eq!(stored.depends_on.len(), 1);
    assert!(stored.depends_on_ids.contains(&NodeId::new("comp-1")));
}

#[test]
fn add_component_registers_external_packages() {
    let mut rig = Rig::new();
    rig.register_package_manager(PackageManager::new(PackageId::new("pkg-1"), "cmake", "Boost"));

    let mut hello = component("comp-1", "hello");
    hello.push_external_package(ExternalPackage::new(
        PackageId::new("pkg-2"),
        "Boost::system",
        PackageId::new("pkg-1"),
    ));
    rig.add_component(hello).expect("add");

    assert_eq!(rig.external_packages().count(), 1);
    let stored = rig.component(&NodeId::new("comp-1")).expect("component");
    assert!(stored.external_packages_ids.contains(&PackageId::new("pkg-2")));
}

#[test]
fn external_package_with_unknown_manager_is_rejected() {
    let mut rig = Rig::new();
    let mut hello = component("comp-1", "hello");
    hello.push_external_package(ExternalPackage::new(
        PackageId::new("pkg-2"),
        "Boost::system",
        PackageId::new("pkg-404"),
    ));
    let err = rig.add_component(hello).expect_err("unknown manager");
    assert!(matches!(err, RigError::UnknownPackageManager(_)));
}

// ============================================================================
// SECTION: Tests and Runners
// ============================================================================

#[test]
fn add_test_requires_registered_executable() {
    let mut rig = Rig::new();
    let mut test = TestDefinition::new(NodeId::new("test-1"), "test_hello", "CTest");
    test.test_executable = Some(NodeRef::component("comp-1"));
    test.push_evidence(evidence("evidence-1", "CMakeLists.txt:9"));

    let err = rig.add_test(test).expect_err("executable not registered");
    assert!(matches!(err, RigError::UnknownDependency(_)));
}

#[test]
fn add_test_rejects_aggregator_executable() {
    let mut rig = Rig::new();
    let mut aggregator = Aggregator::new(NodeId::new("agg-1"), "all_tests");
    aggregator.push_evidence(evidence("evidence-1", "CMakeLists.txt:3"));
    rig.add_aggregator(aggregator).expect("aggregator");

    let mut test = TestDefinition::new(NodeId::new("test-1"), "test_hello", "CTest");
    test.test_executable = Some(NodeRef::aggregator("agg-1"));
    test.push_evidence(evidence("evidence-2", "CMakeLists.txt:9"));

    let err = rig.add_test(test).expect_err("aggregator is not an executable");
    assert!(matches!(err, RigError::InvalidTestExecutable(_)));
}

#[test]
fn add_test_accepts_runner_executable_and_component_sets() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello")).expect("component");

    let mut runner = Runner::new(
        NodeId::new("runner-1"),
        "python3",
        vec!["scripts/run.py".to_string()],
    );
    runner.push_args_node(NodeRef::component("comp-1"));
    runner.push_evidence(evidence("evidence-2", "CMakeLists.txt:12"));
    rig.add_runner(runner).expect("runner");

    let mut test = TestDefinition::new(NodeId::new("test-1"), "integrate", "CTest");
    test.test_executable = Some(NodeRef::runner("runner-1"));
    test.test_components_ids.insert(NodeId::new("comp-1"));
    test.push_evidence(evidence("evidence-3", "CMakeLists.txt:12"));
    rig.add_test(test).expect("test");

    let stored = rig.test(&NodeId::new("test-1")).expect("test");
    assert_eq!(stored.test_executable.as_ref().map(|e| e.kind), Some(NodeKind::Runner));
}

// ============================================================================
// SECTION: Hydration
// ============================================================================

#[test]
fn hydrate_fills_object_lists_from_id_sets() {
    let mut rig = Rig::new();
    rig.register_evidence(evidence("evidence-1", "CMakeLists.txt:1"));
    rig.register_evidence(evidence("evidence-2", "CMakeLists.txt:2"));

    let mut utils = Component::new(
        NodeId::new("comp-1"),
        "utils",
        ComponentType::StaticLibrary,
        "cxx",
        PathBuf::from("libutils.a"),
    )
    .expect("utils");
    utils.insert_evidence_id(EvidenceId::new("evidence-1"));
    rig.add_component(utils).expect("utils");

    let mut hello = Component::new(
        NodeId::new("comp-2"),
        "hello",
        ComponentType::Executable,
        "cxx",
        PathBuf::from("hello"),
    )
    .expect("hello");
    hello.insert_evidence_id(EvidenceId::new("evidence-2"));
    hello.insert_dependency_id(NodeId::new("comp-1"));
    rig.add_component(hello).expect("hello");

    rig.hydrate_all().expect("hydrate");

    let hello = rig.component(&NodeId::new("comp-2")).expect("hello");
    assert_eq!(hello.evidence.len(), 1);
    assert_eq!(hello.depends_on.len(), 1);
    assert_eq!(hello.depends_on[0].kind, NodeKind::Component);

    // List/set lockstep after hydration.
    let list_ids: Vec<&NodeId> = hello.depends_on.iter().map(|edge| &edge.id).collect();
    assert!(hello.depends_on_ids.iter().all(|id| list_ids.contains(&id)));
}

#[test]
fn hydrate_is_idempotent() {
    let mut rig = Rig::new();
    let mut utils = component("comp-1", "utils");
    utils.component_type = ComponentType::StaticLibrary;
    rig.add_component(utils).expect("utils");
    let mut hello = component("comp-2", "hello");
    hello.push_dependency(NodeRef::component("comp-1"));
    rig.add_component(hello).expect("hello");

    rig.hydrate_all().expect("first hydrate");
    rig.hydrate_all().expect("second hydrate");

    let hello = rig.component(&NodeId::new("comp-2")).expect("hello");
    assert_eq!(hello.depends_on.len(), 1);
    assert_eq!(hello.evidence.len(), 1);
}

#[test]
fn hydrate_fails_on_dangling_evidence_id() {
    let mut rig = Rig::new();
    let mut hello = component("comp-1", "hello");
    hello.insert_evidence_id(EvidenceId::new("evidence-404"));
    rig.add_component(hello).expect("add");

    let err = rig.hydrate_all().expect_err("dangling evidence id");
    assert!(matches!(err, RigError::UnknownEvidence(_)));
}

// ============================================================================
// SECTION: Lookups and Statistics
// ============================================================================

#[test]
fn all_nodes_is_components_then_aggregators_then_runners() {
    let mut rig = Rig::new();
    let mut runner = Runner::new(NodeId::new("runner-1"), "run_tool", Vec::new());
    runner.push_evidence(evidence("evidence-1", "CMakeLists.txt:4"));
    rig.add_runner(runner).expect("runner");
    let mut aggregator = Aggregator::new(NodeId::new("agg-1"), "all_jars");
    aggregator.push_evidence(evidence("evidence-2", "CMakeLists.txt:5"));
    rig.add_aggregator(aggregator).expect("aggregator");
    rig.add_component(component("comp-1", "hello")).expect("component");

    let kinds: Vec<NodeKind> = rig.all_nodes().iter().map(|node| node.kind()).collect();
    assert_eq!(kinds, vec![NodeKind::Component, NodeKind::Aggregator, NodeKind::Runner]);
}

#[test]
fn node_by_name_finds_build_nodes() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello")).expect("component");
    assert!(rig.node_by_name("hello").is_some());
    assert!(rig.node_by_name("absent").is_none());
}

#[test]
fn component_counts_group_by_type_and_language() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello")).expect("hello");
    let mut lib = component("comp-2", "utils");
    lib.component_type = ComponentType::StaticLibrary;
    lib.programming_language = "c".to_string();
    rig.add_component(lib).expect("utils");

    let by_type = rig.component_count_by_type();
    assert_eq!(by_type.get(&ComponentType::Executable), Some(&1));
    assert_eq!(by_type.get(&ComponentType::StaticLibrary), Some(&1));
    let by_language = rig.component_count_by_language();
    assert_eq!(by_language.get("cxx"), Some(&1));
    assert_eq!(by_language.get("c"), Some(&1));
}
