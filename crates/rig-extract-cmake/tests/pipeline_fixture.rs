// crates/rig-extract-cmake/tests/pipeline_fixture.rs
// ============================================================================
// Module: Extraction Pipeline Fixture Tests
// Description: Population stages driven from in-memory File API replies.
// Purpose: Validate classification, binding, and wiring without cmake.
// ============================================================================

//! ## Overview
//! Drives the population stages over a hand-built File API reply set, an
//! on-disk CMakeLists fixture, and synthetic CTest introspection data. The
//! fixture exercises the representative shapes: a plain executable, a static
//! library link dependency, a jar-producing utility, runtime dependencies
//! declared through debugger environment properties, aggregator and runner
//! utilities, an external package behind find_package, and both test
//! executable variants.

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

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use rig_core::ComponentType;
use rig_core::NodeKind;
use rig_core::Rig;
use rig_core::validate;
use rig_extract_cmake::CMakeExtractor;
use rig_extract_cmake::CMakeExtractorConfig;
use rig_extract_cmake::CMakeListsParser;
use rig_extract_cmake::ctest::CTestData;
use rig_extract_cmake::extractor::ExtractionState;
use rig_extract_cmake::file_api::BacktraceGraph;
use rig_extract_cmake::file_api::BacktraceNode;
use rig_extract_cmake::file_api::Cache;
use rig_extract_cmake::file_api::CacheEntry;
use rig_extract_cmake::file_api::Codemodel;
use rig_extract_cmake::file_api::CodemodelPaths;
use rig_extract_cmake::file_api::CompileGroup;
use rig_extract_cmake::file_api::Configuration;
use rig_extract_cmake::file_api::FileApi;
use rig_extract_cmake::file_api::Project;
use rig_extract_cmake::file_api::Target;
use rig_extract_cmake::file_api::TargetArtifact;
use rig_extract_cmake::file_api::TargetDependency;
use rig_extract_cmake::file_api::TargetRef;
use rig_extract_cmake::file_api::TargetSource;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixture Repository
// ============================================================================

const CMAKE_LISTS: &str = r#"project(demo)
find_package(Boost REQUIRED)
add_library(utils STATIC src/utils.cpp)
add_executable(hello src/main.cpp)
target_link_libraries(hello utils Boost::system)
add_executable(app src/app.cpp)
set_target_properties(app PROPERTIES
    VS_DEBUGGER_ENVIRONMENT "CLASSPATH=${CMAKE_CURRENT_BINARY_DIR}/util.jar;${CMAKE_CURRENT_BINARY_DIR}/core.jar")
add_jar(util.jar SOURCES Util.java)
add_jar(core.jar SOURCES Core.java)
add_custom_target(all_jars DEPENDS util.jar core.jar)
add_custom_target(run_tool COMMAND python3 scripts/run.py)
add_test(NAME test_hello COMMAND hello)
add_test(NAME integrate COMMAND python3 scripts/run.py --exe $<TARGET_FILE:hello>)
"#;

/// Writes the fixture repository (build files, sources, scripts) to disk.
fn write_repo(dir: &TempDir) {
    let root = dir.path();
    std::fs::write(root.join("CMakeLists.txt"), CMAKE_LISTS).expect("CMakeLists.txt");
    std::fs::create_dir_all(root.join("src")).expect("src");
    std::fs::create_dir_all(root.join("scripts")).expect("scripts");
    for source in ["src/utils.cpp", "src/main.cpp", "src/app.cpp"] {
        std::fs::write(root.join(source), "// fixture\n").expect("source");
    }
    std::fs::write(root.join("scripts/run.py"), "print('run')\n").expect("script");
}

/// Builds a per-target backtrace graph anchored at `CMakeLists.txt:<line>`.
fn backtrace(line: u32) -> BacktraceGraph {
    BacktraceGraph {
        commands: vec!["add_target".to_string()],
        files: vec!["CMakeLists.txt".to_string()],
        nodes: vec![BacktraceNode {
            file: Some(0),
            line: Some(line),
            command: Some(0),
            parent: None,
        }],
    }
}

/// Builds a compiled target reply.
#[allow(clippy::too_many_arguments, reason = "Fixture builder mirrors the reply shape.")]
fn compiled_target(
    id: &str,
    name: &str,
    target_type: &str,
    artifact: &str,
    language: &str,
    source: &str,
    line: u32,
    dependencies: &[&str],
) -> Target {
    Target {
        id: id.to_string(),
        name: name.to_string(),
        target_type: target_type.to_string(),
        backtrace: Some(0),
        backtrace_graph: Some(backtrace(line)),
        artifacts: vec![TargetArtifact { path: PathBuf::from(artifact) }],
        name_on_disk: Some(artifact.rsplit('/').next().unwrap_or(artifact).to_string()),
        compile_groups: vec![CompileGroup { language: language.to_string() }],
        link: None,
        dependencies: dependencies
            .iter()
            .map(|dep| TargetDependency { id: (*dep).to_string() })
            .collect(),
        sources: vec![TargetSource { path: PathBuf::from(source) }],
    }
}

/// Builds a utility target reply (no artifact, no compile groups).
fn utility_target(id: &str, name: &str, dependencies: &[&str]) -> Target {
    Target {
        id: id.to_string(),
        name: name.to_string(),
        target_type: "UTILITY".to_string(),
        backtrace: None,
        backtrace_graph: None,
        artifacts: Vec::new(),
        name_on_disk: None,
        compile_groups: Vec::new(),
        link: None,
        dependencies: dependencies
            .iter()
            .map(|dep| TargetDependency { id: (*dep).to_string() })
            .collect(),
        sources: Vec::new(),
    }
}

/// Builds the full fixture reply set rooted at the given repository.
fn fixture_api(repo_root: &Path) -> FileApi {
    let target_list = vec![
        compiled_target(
            "utils::@1",
            "utils",
            "STATIC_LIBRARY",
            "libutils.a",
            "CXX",
            "src/utils.cpp",
            3,
            &[],
        ),
        compiled_target(
            "hello::@1",
            "hello",
            "EXECUTABLE",
            "hello",
            "CXX",
            "src/main.cpp",
            4,
            &["utils::@1"],
        ),
        utility_target("util.jar::@1", "util.jar", &[]),
        utility_target("core.jar::@1", "core.jar", &[]),
        compiled_target(
            "app::@1",
            "app",
            "EXECUTABLE",
            "app",
            "CXX",
            "src/app.cpp",
            6,
            &[],
        ),
        utility_target("all_jars::@1", "all_jars", &["util.jar::@1", "core.jar::@1"]),
        utility_target("run_tool::@1", "run_tool", &[]),
    ];

    let targets: BTreeMap<String, Target> =
        target_list.iter().map(|target| (target.id.clone(), target.clone())).collect();
    let target_refs: Vec<TargetRef> = target_list
        .iter()
        .map(|target| TargetRef {
            id: target.id.clone(),
            name: target.name.clone(),
            json_file: format!("target-{}.json", target.name),
        })
        .collect();

    FileApi {
        codemodel: Codemodel {
            paths: CodemodelPaths {
                source: repo_root.to_path_buf(),
                build: repo_root.join("spade_build"),
            },
            configurations: vec![Configuration {
                name: "Debug".to_string(),
                projects: vec![Project { name: "demo".to_string() }],
                targets: target_refs,
            }],
        },
        cache: Cache {
            entries: vec![
                CacheEntry {
                    name: "CMAKE_INSTALL_PREFIX".to_string(),
                    value: repo_root.join("install").display().to_string(),
                },
                CacheEntry {
                    name: "demo_BINARY_DIR".to_string(),
                    value: repo_root.join("spade_build").display().to_string(),
                },
            ],
        },
        cmake_files: None,
        configure_log: None,
        toolchains: None,
        targets,
    }
}

/// Synthetic ctest introspection for the two registered tests.
fn fixture_ctest() -> CTestData {
    serde_json::from_str(
        r#"{
  "backtraceGraph": {
    "commands": ["add_test"],
    "files": ["CMakeLists.txt"],
    "nodes": [
      {"file": 0},
      {"file": 0, "line": 13, "command": 0, "parent": 0},
      {"file": 0, "line": 14, "command": 0, "parent": 0}
    ]
  },
  "tests": [
    {"name": "test_hello", "config": "Debug", "backtrace": 1, "properties": []},
    {"name": "integrate", "config": "Debug", "backtrace": 2, "properties": []}
  ]
}"#,
    )
    .expect("ctest fixture")
}

/// Runs the population stages over the fixture and returns the graph.
fn extract_fixture(dir: &TempDir) -> Rig {
    write_repo(dir);
    let repo_root = dir.path();
    let api = fixture_api(repo_root);
    let mut lists = CMakeListsParser::default();
    lists.parse_content(CMAKE_LISTS, &repo_root.join("CMakeLists.txt"));

    let extractor = CMakeExtractor::new(CMakeExtractorConfig::default());
    let mut rig = Rig::new();
    let mut state = ExtractionState::new();
    extractor
        .populate_repository(&mut rig, repo_root, &api, "3.28.1")
        .expect("repository facts");
    extractor
        .populate_targets(&mut rig, &mut state, repo_root, &api, &lists)
        .expect("targets");
    extractor
        .populate_tests(&mut rig, &mut state, repo_root, &fixture_ctest())
        .expect("tests");
    rig.hydrate_all().expect("hydrate");
    rig
}

// ============================================================================
// SECTION: Repository Facts
// ============================================================================

#[test]
fn repository_and_build_facts_are_recorded() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let repo = rig.repository().expect("repository info");
    assert_eq!(repo.name, "demo");
    assert_eq!(repo.build_directory, Some(PathBuf::from("spade_build")));
    assert_eq!(repo.install_directory, Some(PathBuf::from("install")));
    assert_eq!(repo.output_directory, Some(PathBuf::from("spade_build")));
    assert!(repo.configure_command.as_deref().is_some_and(|cmd| cmd.contains("cmake -S")));

    let build = rig.build_system().expect("build system info");
    assert_eq!(build.name, "CMake");
    assert_eq!(build.version.as_deref(), Some("3.28.1"));
    assert_eq!(build.build_type.as_deref(), Some("Debug"));
}

// ============================================================================
// SECTION: Target Classification
// ============================================================================

#[test]
fn compiled_and_jar_targets_become_components() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let names: Vec<&str> = rig.components().map(|component| component.name.as_str()).collect();
    assert_eq!(names.len(), 5, "expected hello, app, libutils.a, util.jar, core.jar");
    for expected in ["hello", "app", "libutils.a", "util.jar", "core.jar"] {
        assert!(names.contains(&expected), "missing component {expected}");
    }

    let jar = rig.components().find(|component| component.name == "util.jar").expect("jar");
    assert_eq!(jar.component_type, ComponentType::PackageLibrary);
    assert_eq!(jar.programming_language, "java");

    let hello = rig.components().find(|component| component.name == "hello").expect("hello");
    assert_eq!(hello.component_type, ComponentType::Executable);
    assert_eq!(hello.programming_language, "cxx");
    assert_eq!(hello.source_files, vec![PathBuf::from("src/main.cpp")]);
}

#[test]
fn link_dependencies_are_wired() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let hello = rig.components().find(|component| component.name == "hello").expect("hello");
    let utils = rig.components().find(|component| component.name == "libutils.a").expect("utils");
    assert!(hello.depends_on_ids.contains(&utils.id));
    assert!(utils.depends_on_ids.is_empty());
}

#[test]
fn runtime_environment_dependencies_are_wired() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let app = rig.components().find(|component| component.name == "app").expect("app");
    let jar_ids: Vec<_> = rig
        .components()
        .filter(|component| component.name.ends_with(".jar"))
        .map(|component| component.id.clone())
        .collect();
    assert_eq!(jar_ids.len(), 2);
    for jar_id in &jar_ids {
        assert!(app.depends_on_ids.contains(jar_id), "app must depend on {jar_id}");
    }
}

#[test]
fn utility_targets_split_into_aggregator_and_runner() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let aggregator =
        rig.aggregators().find(|node| node.name == "all_jars").expect("aggregator");
    assert_eq!(aggregator.depends_on_ids.len(), 2);

    let runner = rig.runners().find(|node| node.name == "run_tool").expect("runner");
    assert_eq!(runner.arguments, vec!["python3".to_string(), "scripts/run.py".to_string()]);
}

#[test]
fn find_package_links_become_external_packages() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let hello = rig.components().find(|component| component.name == "hello").expect("hello");
    assert_eq!(hello.external_packages.len(), 1);
    assert_eq!(hello.external_packages[0].name, "Boost::system");
    let manager = rig
        .package_manager(&hello.external_packages[0].package_manager_id)
        .expect("manager");
    assert_eq!(manager.name, "cmake");
    assert_eq!(manager.package_name, "Boost");
}

#[test]
fn every_node_carries_evidence() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    for node in rig.all_nodes() {
        assert!(!node.evidence_ids().is_empty(), "node {} has no evidence", node.name());
    }
    for test in rig.tests() {
        assert!(!test.evidence_ids.is_empty(), "test {} has no evidence", test.name);
    }
}

// ============================================================================
// SECTION: Test Binding
// ============================================================================

#[test]
fn component_backed_test_is_bound_with_its_closure() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let test = rig.tests().find(|test| test.name == "test_hello").expect("test_hello");
    assert_eq!(test.test_framework, "CTest");
    let executable = test.test_executable.as_ref().expect("executable");
    assert_eq!(executable.kind, NodeKind::Component);
    let hello = rig.component(&executable.id).expect("hello component");
    assert_eq!(hello.name, "hello");

    let utils = rig.components().find(|component| component.name == "libutils.a").expect("utils");
    assert_eq!(test.test_components_ids.len(), 1);
    assert!(test.test_components_ids.contains(&utils.id));
    assert_eq!(test.source_files, vec![PathBuf::from("src/main.cpp")]);

    let evidence_reference = test
        .evidence
        .first()
        .and_then(|record| record.first_reference().map(ToString::to_string))
        .expect("evidence reference");
    assert_eq!(evidence_reference, "CMakeLists.txt:13");
}

#[test]
fn command_backed_test_synthesizes_a_runner() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);

    let test = rig.tests().find(|test| test.name == "integrate").expect("integrate");
    let executable = test.test_executable.as_ref().expect("executable");
    assert_eq!(executable.kind, NodeKind::Runner);

    let runner = rig.runner(&executable.id).expect("runner");
    assert_eq!(runner.name, "python3");
    assert_eq!(
        runner.arguments,
        vec!["scripts/run.py".to_string(), "--exe".to_string(), "hello".to_string()]
    );
    let hello = rig.components().find(|component| component.name == "hello").expect("hello");
    assert!(runner.args_nodes_ids.contains(&hello.id));

    assert!(test.test_components_ids.contains(&hello.id));
    assert_eq!(test.source_files, vec![PathBuf::from("scripts/run.py")]);
}

// ============================================================================
// SECTION: Whole-Graph Validation
// ============================================================================

#[test]
fn extracted_fixture_validates_clean() {
    let dir = TempDir::new().expect("tempdir");
    let rig = extract_fixture(&dir);
    let diagnostics = validate(&rig);
    assert!(diagnostics.is_empty(), "unexpected findings: {diagnostics:?}");
}
