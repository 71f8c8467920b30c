// crates/rig-core/tests/validator_checks.rs
// ============================================================================
// Module: Validator Unit Tests
// Description: Diagnostic coverage for every validator check.
// Purpose: Validate severities, categories, and non-mutation.
// ============================================================================

//! ## Overview
//! Unit-level tests for the validator:
//! - Clean graphs yield an empty diagnostic list
//! - Missing source files on disk are errors
//! - Self-cycles are reported as circular dependencies
//! - Tests without executables and nodes without evidence are errors

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

use rig_core::Category;
use rig_core::Component;
use rig_core::ComponentType;
use rig_core::Evidence;
use rig_core::EvidenceId;
use rig_core::NodeId;
use rig_core::NodeRef;
use rig_core::RepositoryInfo;
use rig_core::Rig;
use rig_core::RigNode;
use rig_core::Severity;
use rig_core::TestDefinition;
use rig_core::validate;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn evidence(id: &str) -> Evidence {
    Evidence::from_lines(EvidenceId::new(id), vec!["CMakeLists.txt:1".to_string()])
        .expect("evidence")
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
    component.push_evidence(evidence(&format!("evidence-{id}")));
    component
}

fn categories(diagnostics: &[rig_core::Diagnostic]) -> Vec<Category> {
    diagnostics.iter().map(|diagnostic| diagnostic.category).collect()
}

// ============================================================================
// SECTION: Clean Graphs
// ============================================================================

#[test]
fn empty_graph_is_clean() {
    let rig = Rig::new();
    assert!(validate(&rig).is_empty());
}

#[test]
fn well_formed_graph_is_clean() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("src")).expect("src dir");
    std::fs::write(dir.path().join("src/main.cpp"), "int main() { return 0; }\n")
        .expect("source file");

    let mut rig = Rig::new();
    rig.set_repository_info(RepositoryInfo::new("hello", dir.path().to_path_buf()));
    let mut hello = component("comp-1", "hello");
    hello.source_files.push(PathBuf::from("src/main.cpp"));
    rig.add_component(hello).expect("add");

    assert!(validate(&rig).is_empty());
}

// ============================================================================
// SECTION: Source Files
// ============================================================================

#[test]
fn missing_source_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut rig = Rig::new();
    rig.set_repository_info(RepositoryInfo::new("hello", dir.path().to_path_buf()));
    let mut hello = component("comp-1", "hello");
    hello.source_files.push(PathBuf::from("src/missing.cpp"));
    rig.add_component(hello).expect("add");

    let diagnostics = validate(&rig);
    assert_eq!(categories(&diagnostics), vec![Category::MissingSourceFile]);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].node_name.as_deref(), Some("hello"));
}

#[test]
fn source_files_are_not_checked_without_repository_info() {
    let mut rig = Rig::new();
    let mut hello = component("comp-1", "hello");
    hello.source_files.push(PathBuf::from("src/missing.cpp"));
    rig.add_component(hello).expect("add");

    assert!(validate(&rig).is_empty());
}

// ============================================================================
// SECTION: Cycles
// ============================================================================

#[test]
fn self_edge_is_reported_as_a_cycle() {
    let mut rig = Rig::new();
    let mut hello = component("comp-1", "hello");
    hello.push_dependency(NodeRef::component("comp-1"));
    rig.add_component(hello).expect("self edge registers");

    let diagnostics = validate(&rig);
    assert!(categories(&diagnostics).contains(&Category::CircularDependency));
}

#[test]
fn acyclic_chain_reports_no_cycle() {
    let mut rig = Rig::new();
    let mut utils = component("comp-1", "utils");
    utils.component_type = ComponentType::StaticLibrary;
    rig.add_component(utils).expect("utils");
    let mut hello = component("comp-2", "hello");
    hello.push_dependency(NodeRef::component("comp-1"));
    rig.add_component(hello).expect("hello");

    assert!(!categories(&validate(&rig)).contains(&Category::CircularDependency));
}

// ============================================================================
// SECTION: Test Wiring
// ============================================================================

#[test]
fn test_without_executable_is_an_error() {
    let mut rig = Rig::new();
    let mut test = TestDefinition::new(NodeId::new("test-1"), "test_hello", "CTest");
    test.push_evidence(evidence("evidence-1"));
    rig.add_test(test).expect("test without executable registers");

    let diagnostics = validate(&rig);
    assert_eq!(categories(&diagnostics), vec![Category::MissingTestExecutable]);
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

#[test]
fn node_without_evidence_is_an_error() {
    let mut rig = Rig::new();
    let bare = Component::new(
        NodeId::new("comp-1"),
        "hello",
        ComponentType::Executable,
        "cxx",
        PathBuf::from("hello"),
    )
    .expect("component");
    rig.add_component(bare).expect("registers without evidence");

    let diagnostics = validate(&rig);
    assert_eq!(categories(&diagnostics), vec![Category::MissingEvidence]);
    assert_eq!(
        diagnostics[0].suggestion.as_deref(),
        Some("All nodes should have evidence indicating where they are defined")
    );
}

#[test]
fn validator_does_not_mutate_the_graph() {
    let mut rig = Rig::new();
    rig.add_component(component("comp-1", "hello")).expect("add");
    let before = rig.clone();
    let _ = validate(&rig);
    assert_eq!(
        rig.components().collect::<Vec<_>>(),
        before.components().collect::<Vec<_>>()
    );
}
