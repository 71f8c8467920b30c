// crates/rig-core/tests/normalize_keys.rs
// ============================================================================
// Module: Normalization Unit Tests
// Description: Stable-key derivation and graph-wide id remapping.
// Purpose: Validate content-derived identifiers and idempotence.
// ============================================================================

//! ## Overview
//! Unit-level tests for stable-key normalization:
//! - Key formats per entity kind
//! - Id references remapped alongside entity ids
//! - Idempotence (normalizing twice changes nothing)
//! - Collision rejection for same-kind duplicates

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
use rig_core::NodeId;
use rig_core::NodeRef;
use rig_core::NormalizeError;
use rig_core::Rig;
use rig_core::RigNode;
use rig_core::TestDefinition;
use rig_core::normalize;
use rig_core::runtime::normalize::component_key;
use rig_core::runtime::normalize::evidence_key;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn evidence(id: &str, reference: &str) -> Evidence {
    Evidence::from_lines(EvidenceId::new(id), vec![reference.to_string()]).expect("evidence")
}

fn component(id: &str, name: &str, component_type: ComponentType) -> Component {
    let mut component =
        Component::new(NodeId::new(id), name, component_type, "cxx", PathBuf::from(name))
            .expect("component");
    component.push_evidence(evidence(&format!("evidence-{id}"), "CMakeLists.txt:5"));
    component
}

// ============================================================================
// SECTION: Key Formats
// ============================================================================

#[test]
fn component_key_is_name_type_language() {
    let hello = component("comp-7", "hello", ComponentType::Executable);
    assert_eq!(component_key(&hello), "hello:executable:cxx");
}

#[test]
fn evidence_key_uses_first_reference_or_unknown() {
    let record = evidence("evidence-3", "CMakeLists.txt:5");
    assert_eq!(evidence_key(&record), "evidence:CMakeLists.txt:5");
}

#[test]
fn normalized_ids_are_stable_keys() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-42", "hello", ComponentType::Executable)).expect("add");

    let normalized = normalize(&rig).expect("normalize");
    let stored = normalized.component(&NodeId::new("hello:executable:cxx")).expect("component");
    assert_eq!(stored.id.as_str(), "hello:executable:cxx");
    assert!(stored.evidence_ids.contains(&EvidenceId::new("evidence:CMakeLists.txt:5")));
}

// ============================================================================
// SECTION: Reference Remapping
// ============================================================================

#[test]
fn dependency_references_are_remapped() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "utils", ComponentType::StaticLibrary)).expect("utils");
    let mut hello = component("comp-2", "hello", ComponentType::Executable);
    hello.push_dependency(NodeRef::component("comp-1"));
    rig.add_component(hello).expect("hello");

    let normalized = normalize(&rig).expect("normalize");
    let hello = normalized.component(&NodeId::new("hello:executable:cxx")).expect("hello");
    assert!(hello.depends_on_ids.contains(&NodeId::new("utils:static_library:cxx")));
    assert_eq!(hello.depends_on[0].id.as_str(), "utils:static_library:cxx");
}

#[test]
fn test_executable_reference_is_remapped() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello", ComponentType::Executable)).expect("hello");
    let mut test = TestDefinition::new(NodeId::new("test-1"), "test_hello", "CTest");
    test.test_executable = Some(NodeRef::component("comp-1"));
    test.test_components_ids.insert(NodeId::new("comp-1"));
    test.push_evidence(evidence("evidence-t", "CMakeLists.txt:9"));
    rig.add_test(test).expect("test");

    let normalized = normalize(&rig).expect("normalize");
    let test = normalized.test(&NodeId::new("test_hello:test:CTest")).expect("test");
    assert_eq!(
        test.test_executable.as_ref().map(|e| e.id.as_str()),
        Some("hello:executable:cxx")
    );
    assert!(test.test_components_ids.contains(&NodeId::new("hello:executable:cxx")));
}

#[test]
fn original_graph_is_unchanged_by_normalization() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-9", "hello", ComponentType::Executable)).expect("add");
    let _ = normalize(&rig).expect("normalize");
    assert!(rig.component(&NodeId::new("comp-9")).is_some());
}

// ============================================================================
// SECTION: Idempotence and Collisions
// ============================================================================

#[test]
fn normalize_is_idempotent() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "utils", ComponentType::StaticLibrary)).expect("utils");
    let mut hello = component("comp-2", "hello", ComponentType::Executable);
    hello.push_dependency(NodeRef::component("comp-1"));
    rig.add_component(hello).expect("hello");

    let once = normalize(&rig).expect("first");
    let twice = normalize(&once).expect("second");
    let once_ids: Vec<&str> = once.components().map(|c| c.id.as_str()).collect();
    let twice_ids: Vec<&str> = twice.components().map(|c| c.id.as_str()).collect();
    assert_eq!(once_ids, twice_ids);
}

#[test]
fn same_name_different_type_has_distinct_keys() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello", ComponentType::Executable)).expect("exe");
    rig.add_component(component("comp-2", "hello", ComponentType::SharedLibrary)).expect("lib");

    let normalized = normalize(&rig).expect("normalize");
    assert!(normalized.component(&NodeId::new("hello:executable:cxx")).is_some());
    assert!(normalized.component(&NodeId::new("hello:shared_library:cxx")).is_some());
}

#[test]
fn colliding_aggregator_names_are_rejected() {
    let mut rig = Rig::new();
    let mut first = Aggregator::new(NodeId::new("agg-1"), "all_jars");
    first.push_evidence(evidence("evidence-1", "CMakeLists.txt:2"));
    rig.add_aggregator(first).expect("first");
    let mut second = Aggregator::new(NodeId::new("agg-2"), "all_jars");
    second.push_evidence(evidence("evidence-2", "CMakeLists.txt:8"));
    rig.add_aggregator(second).expect("second");

    let err = normalize(&rig).expect_err("collision");
    assert!(matches!(err, NormalizeError::StableKeyCollision(_)));
}
