// crates/rig-extract-cmake/tests/ctest_parse_unit.rs
// ============================================================================
// Module: CTest Introspection Unit Tests
// Description: json-v1 parsing, backtrace anchors, add_test re-parsing.
// Purpose: Validate evidence resolution and command binding inputs.
// ============================================================================

//! ## Overview
//! Unit-level tests for CTest introspection:
//! - json-v1 deserialization of the backtrace graph and tests
//! - Anchor resolution with parent-node fallback
//! - Spanning add_test re-parse across lines and comments
//! - Positional add_test syntax and generator-expression commands
//! - On-disk probing of runner arguments

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

use std::path::Path;
use std::path::PathBuf;

use rig_extract_cmake::ctest::CTestData;
use rig_extract_cmake::ctest::TestAnchor;
use rig_extract_cmake::ctest::existing_file_args;
use rig_extract_cmake::ctest::parse_add_test_at;
use rig_extract_cmake::ctest::resolve_anchor;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const SHOW_ONLY_JSON: &str = r#"{
  "kind": "ctestInfo",
  "version": {"major": 1, "minor": 0},
  "backtraceGraph": {
    "commands": ["add_test"],
    "files": ["CMakeLists.txt", "cmake/tests.cmake"],
    "nodes": [
      {"file": 0},
      {"file": 0, "line": 12, "command": 0, "parent": 0},
      {"file": 1, "command": 0, "parent": 1}
    ]
  },
  "tests": [
    {"name": "test_hello", "config": "Debug", "backtrace": 1, "properties": []},
    {"name": "from_include", "config": "Debug", "backtrace": 2, "properties": []}
  ]
}"#;

fn parsed_fixture() -> CTestData {
    serde_json::from_str(SHOW_ONLY_JSON).expect("json-v1 fixture")
}

// ============================================================================
// SECTION: Deserialization
// ============================================================================

#[test]
fn show_only_json_deserializes() {
    let data = parsed_fixture();
    assert_eq!(data.tests.len(), 2);
    assert_eq!(data.backtrace_graph.files.len(), 2);
    assert_eq!(data.backtrace_graph.commands, vec!["add_test".to_string()]);
}

// ============================================================================
// SECTION: Anchor Resolution
// ============================================================================

#[test]
fn anchor_comes_from_the_backtrace_node() {
    let data = parsed_fixture();
    let anchor = resolve_anchor(&data, &data.tests[0]).expect("anchor");
    assert_eq!(anchor.file, PathBuf::from("CMakeLists.txt"));
    assert_eq!(anchor.line, 12);
}

#[test]
fn anchor_falls_back_to_the_parent_node() {
    let data = parsed_fixture();
    // The second test's node has no line; its parent supplies file and line.
    let anchor = resolve_anchor(&data, &data.tests[1]).expect("anchor");
    assert_eq!(anchor.file, PathBuf::from("CMakeLists.txt"));
    assert_eq!(anchor.line, 12);
}

#[test]
fn anchor_reference_is_repo_relative() {
    let anchor = TestAnchor { file: PathBuf::from("/repo/demo/CMakeLists.txt"), line: 12 };
    assert_eq!(anchor.reference(Path::new("/repo/demo")), "CMakeLists.txt:12");
}

// ============================================================================
// SECTION: add_test Re-Parsing
// ============================================================================

#[test]
fn spanning_add_test_is_collected_across_lines() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("CMakeLists.txt");
    std::fs::write(
        &file,
        "project(demo)\n# registered below\nadd_test(NAME integrate\n    # the runner\n    \
         COMMAND python3 scripts/run.py\n        --exe $<TARGET_FILE:hello>)\n",
    )
    .expect("fixture");

    let parsed = parse_add_test_at(&TestAnchor { file, line: 3 }).expect("parse");
    assert_eq!(parsed.name.as_deref(), Some("integrate"));
    assert_eq!(parsed.command, "python3");
    assert_eq!(
        parsed.args,
        vec!["scripts/run.py".to_string(), "--exe".to_string(), "hello".to_string()]
    );
}

#[test]
fn positional_add_test_syntax_is_supported() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("CMakeLists.txt");
    std::fs::write(&file, "add_test(test_hello hello --fast)\n").expect("fixture");

    let parsed = parse_add_test_at(&TestAnchor { file, line: 1 }).expect("parse");
    assert_eq!(parsed.name.as_deref(), Some("test_hello"));
    assert_eq!(parsed.command, "hello");
    assert_eq!(parsed.args, vec!["--fast".to_string()]);
}

#[test]
fn generator_expression_command_resolves_to_the_target() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("CMakeLists.txt");
    std::fs::write(&file, "add_test(NAME direct COMMAND $<TARGET_FILE:hello>)\n").expect("fixture");

    let parsed = parse_add_test_at(&TestAnchor { file, line: 1 }).expect("parse");
    assert_eq!(parsed.command, "hello");
    assert!(parsed.args.is_empty());
}

#[test]
fn missing_statement_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("CMakeLists.txt");
    std::fs::write(&file, "project(demo)\n").expect("fixture");

    assert!(parse_add_test_at(&TestAnchor { file, line: 1 }).is_err());
}

// ============================================================================
// SECTION: Argument Probing
// ============================================================================

#[test]
fn existing_file_args_keeps_only_on_disk_paths() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("scripts")).expect("scripts dir");
    std::fs::write(dir.path().join("scripts/run.py"), "print('hi')\n").expect("script");

    let args = vec![
        "scripts/run.py".to_string(),
        "--exe".to_string(),
        "hello".to_string(),
        "scripts/absent.py".to_string(),
    ];
    let files = existing_file_args(dir.path(), &args);
    assert_eq!(files, vec![PathBuf::from("scripts/run.py")]);
}
