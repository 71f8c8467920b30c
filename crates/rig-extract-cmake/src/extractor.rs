// rig-extract-cmake/src/extractor.rs
// ============================================================================
// Module: CMake Extraction Pipeline
// Description: Configure, read, classify, and bind into a complete graph.
// Purpose: Produce a fully populated, hydrated graph from a CMake repo.
// Dependencies: crate submodules, rig-core, tracing
// ============================================================================

//! ## Overview
//! The pipeline runs strictly sequentially: instrument the File API and
//! configure, read the replies, parse the CMakeLists fallback data, classify
//! every target into graph nodes (recursively, dependency first), augment
//! runtime dependencies from target properties, then bind CTest tests. On
//! any error the partial graph is discarded. The population stages are
//! public so callers with pre-read File API data (fixtures, caches) can
//! drive them without spawning `cmake`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use rig_core::Aggregator;
use rig_core::BuildSystemInfo;
use rig_core::Component;
use rig_core::Evidence;
use rig_core::Extractor;
use rig_core::ExtractorError;
use rig_core::ExternalPackage;
use rig_core::IdAllocator;
use rig_core::NodeId;
use rig_core::NodeKind;
use rig_core::NodeRef;
use rig_core::PackageId;
use rig_core::PackageManager;
use rig_core::RepositoryInfo;
use rig_core::Rig;
use rig_core::RigNode;
use rig_core::Runner;
use rig_core::TestDefinition;
use serde::Deserialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::classify::TargetCategory;
use crate::classify::backtrace_evidence;
use crate::classify::classify_target;
use crate::classify::component_language;
use crate::ctest;
use crate::ctest::CTestData;
use crate::ctest::TestAnchor;
use crate::error::ExtractError;
use crate::file_api;
use crate::file_api::FileApi;
use crate::file_api::Target;
use crate::lists_parser::CMakeListsParser;
use crate::process;
use crate::runtime_deps;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional build directory name for instrumented configures.
pub const DEFAULT_BUILD_DIR: &str = "spade_build";

/// Default cap for ctest introspection.
const DEFAULT_CTEST_TIMEOUT_SECS: u64 = 30;

/// Test framework tag recorded on CTest-sourced tests.
const CTEST_FRAMEWORK: &str = "CTest";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the CMake extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct CMakeExtractorConfig {
    /// Build directory name under the repository root.
    #[serde(default = "default_build_dir")]
    pub build_dir_name: String,
    /// Configuration to read; defaults to the codemodel's first.
    #[serde(default)]
    pub configuration: Option<String>,
    /// Cap in seconds for ctest introspection.
    #[serde(default = "default_ctest_timeout_secs")]
    pub ctest_timeout_secs: u64,
}

impl Default for CMakeExtractorConfig {
    fn default() -> Self {
        Self {
            build_dir_name: DEFAULT_BUILD_DIR.to_string(),
            configuration: None,
            ctest_timeout_secs: DEFAULT_CTEST_TIMEOUT_SECS,
        }
    }
}

/// Returns the default build directory name.
fn default_build_dir() -> String {
    DEFAULT_BUILD_DIR.to_string()
}

/// Returns the default ctest introspection cap.
const fn default_ctest_timeout_secs() -> u64 {
    DEFAULT_CTEST_TIMEOUT_SECS
}

// ============================================================================
// SECTION: Extraction State
// ============================================================================

/// Mutable bookkeeping shared by the population stages of one run.
#[derive(Debug, Default)]
pub struct ExtractionState {
    /// Identifier allocator scoped to this run.
    pub allocator: IdAllocator,
    /// Created nodes keyed by CMake target id.
    findings: BTreeMap<String, NodeRef>,
    /// Created components keyed by artifact name.
    component_names: BTreeMap<String, NodeRef>,
    /// Package manager records keyed by discovered package name.
    package_managers: BTreeMap<String, PackageId>,
    /// Targets currently being built, for dependency-cycle protection.
    in_progress: BTreeSet<String>,
}

impl ExtractionState {
    /// Creates empty state with fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a command token to a created node: the CMake target id
    /// prefix (before `::`) first, then the artifact name.
    #[must_use]
    fn resolve_token(&self, token: &str) -> Option<&NodeRef> {
        self.findings
            .iter()
            .find(|(target_id, _)| target_id.split("::").next() == Some(token))
            .map(|(_, node_ref)| node_ref)
            .or_else(|| self.component_names.get(token))
    }
}

// ============================================================================
// SECTION: Extractor
// ============================================================================

/// Deterministic CMake graph extractor.
#[derive(Debug, Clone, Default)]
pub struct CMakeExtractor {
    /// Extractor configuration.
    config: CMakeExtractorConfig,
}

impl CMakeExtractor {
    /// Creates an extractor with the given configuration.
    #[must_use]
    pub fn new(config: CMakeExtractorConfig) -> Self {
        Self { config }
    }

    /// Runs the full pipeline over a repository root.
    ///
    /// This is the inherent entry point and returns the pipeline's own
    /// [`ExtractError`]; the [`Extractor`] trait implementation below adapts
    /// it to the contract-level [`ExtractorError`]. Callers holding a
    /// concrete `CMakeExtractor` resolve to this method; callers holding
    /// `&dyn Extractor` see only the trait adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] on configure, introspection, parse, or model
    /// failure; no partial graph is returned.
    pub fn extract(&self, repo_root: &Path) -> Result<Rig, ExtractError> {
        let build_dir = repo_root.join(&self.config.build_dir_name);
        file_api::write_queries(&build_dir)?;

        let root_display = repo_root.display().to_string();
        let build_display = build_dir.display().to_string();
        info!(repo = %root_display, "configuring cmake project");
        process::run_capture(
            "cmake",
            &["-S", &root_display, "-B", &build_display, "-DCMAKE_EXPORT_COMPILE_COMMANDS=ON"],
            None,
        )
        .map_err(|err| ExtractError::Configure(err.to_string()))?;

        let api = file_api::read(&build_dir)?;
        let lists = CMakeListsParser::parse_tree(repo_root, Some(&self.config.build_dir_name))?;

        let mut rig = Rig::new();
        let mut state = ExtractionState::new();
        self.populate_repository(&mut rig, repo_root, &api, &process::cmake_version())?;
        self.populate_targets(&mut rig, &mut state, repo_root, &api, &lists)?;

        let configuration = self
            .config
            .configuration
            .clone()
            .unwrap_or_else(|| api.first_configuration().map_or_else(|_| String::new(), |c| c.name.clone()));
        let ctest_data = ctest::introspect(
            repo_root,
            &self.config.build_dir_name,
            &configuration,
            Duration::from_secs(self.config.ctest_timeout_secs),
        )?;
        self.populate_tests(&mut rig, &mut state, repo_root, &ctest_data)?;

        rig.hydrate_all().map_err(|err| ExtractError::Model(err.to_string()))?;
        info!(
            components = rig.components().count(),
            tests = rig.tests().count(),
            "extraction complete"
        );
        Ok(rig)
    }

    // ------------------------------------------------------------------
    // Stage: repository and build system facts
    // ------------------------------------------------------------------

    /// Records repository and build-system facts from the File API.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileApi`] when the codemodel carries no
    /// configuration or project.
    pub fn populate_repository(
        &self,
        rig: &mut Rig,
        repo_root: &Path,
        api: &FileApi,
        cmake_version: &str,
    ) -> Result<(), ExtractError> {
        let configuration = api.first_configuration()?;
        let project_name = configuration
            .projects
            .first()
            .map(|project| project.name.clone())
            .ok_or_else(|| ExtractError::FileApi {
                path: PathBuf::from("codemodel"),
                message: "configuration has no projects".to_string(),
            })?;

        let mut info = RepositoryInfo::new(project_name.clone(), repo_root.to_path_buf());
        info.build_directory = Some(relative_to_root(&api.codemodel.paths.build, repo_root));
        if let Some(prefix) = api.cache.value_of("CMAKE_INSTALL_PREFIX") {
            info.install_directory = Some(relative_to_root(Path::new(prefix), repo_root));
        }
        if let Some(binary_dir) = api.cache.value_of(&format!("{project_name}_BINARY_DIR")) {
            info.output_directory = Some(relative_to_root(Path::new(binary_dir), repo_root));
        }
        let build_dir_name = &self.config.build_dir_name;
        info.configure_command = Some(format!(
            "cmake -S {} -B {build_dir_name} -DCMAKE_EXPORT_COMPILE_COMMANDS=ON",
            repo_root.display()
        ));
        info.build_command = Some(format!("cmake --build {build_dir_name}"));
        info.test_command = Some(format!("ctest --test-dir {build_dir_name}"));
        rig.set_repository_info(info);

        rig.set_build_system_info(BuildSystemInfo::new(
            "CMake",
            Some(cmake_version.to_string()),
            Some(configuration.name.clone()),
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stage: targets
    // ------------------------------------------------------------------

    /// Classifies and registers every target of the first configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Model`] when the graph engine rejects a
    /// produced node.
    pub fn populate_targets(
        &self,
        rig: &mut Rig,
        state: &mut ExtractionState,
        repo_root: &Path,
        api: &FileApi,
        lists: &CMakeListsParser,
    ) -> Result<(), ExtractError> {
        let configuration = api.first_configuration()?;
        for target_ref in &configuration.targets {
            self.create_node(rig, state, repo_root, api, lists, &target_ref.id)?;
        }
        Ok(())
    }

    /// Creates the node for one target, recursively creating dependencies
    /// first. Returns `None` for skipped targets and cycle back-edges.
    fn create_node(
        &self,
        rig: &mut Rig,
        state: &mut ExtractionState,
        repo_root: &Path,
        api: &FileApi,
        lists: &CMakeListsParser,
        target_id: &str,
    ) -> Result<Option<NodeRef>, ExtractError> {
        if let Some(existing) = state.findings.get(target_id) {
            return Ok(Some(existing.clone()));
        }
        if state.in_progress.contains(target_id) {
            warn!(cmake_target = target_id, "dependency cycle detected; dropping back edge");
            return Ok(None);
        }
        let Some(target) = api.targets.get(target_id) else {
            warn!(cmake_target = target_id, "dependency references unknown target; skipping");
            return Ok(None);
        };
        if target.name.contains("${") {
            warn!(cmake_target = %target.name, "target name is an unresolved variable; skipping");
            return Ok(None);
        }
        let category = classify_target(target, lists);
        if category == TargetCategory::Skip {
            debug!(cmake_target = %target.name, kind = %target.target_type, "target skipped");
            return Ok(None);
        }

        state.in_progress.insert(target_id.to_string());
        let mut dependencies: Vec<NodeRef> = Vec::new();
        for dependency in &target.dependencies {
            if let Some(node_ref) =
                self.create_node(rig, state, repo_root, api, lists, &dependency.id)?
            {
                dependencies.push(node_ref);
            }
        }

        let evidence = target_evidence(state, target, lists);
        let node_ref = match category {
            TargetCategory::Skip => {
                state.in_progress.remove(target_id);
                return Ok(None);
            }
            TargetCategory::Component(component_type) => {
                let mut component = build_component(state, target, component_type)
                    .map_err(|err| ExtractError::Model(err.to_string()))?;
                for dependency in dependencies {
                    component.push_dependency(dependency);
                }
                for runtime_dep in runtime_dependencies(state, repo_root, target) {
                    component.push_dependency(runtime_dep);
                }
                attach_external_packages(rig, state, &mut component, target, lists);
                if let Some(record) = evidence {
                    component.push_evidence(record);
                }
                let node_ref = NodeRef::component(component.id.clone());
                let name = component.name.clone();
                rig.add_component(component).map_err(|err| ExtractError::Model(err.to_string()))?;
                state.component_names.insert(name, node_ref.clone());
                node_ref
            }
            TargetCategory::Runner => {
                let arguments = lists
                    .custom_target(&target.name)
                    .and_then(|record| record.parameters.get("COMMAND").cloned())
                    .unwrap_or_default();
                let mut runner =
                    Runner::new(state.allocator.next_runner(), target.name.clone(), arguments);
                for dependency in dependencies {
                    runner.push_dependency(dependency);
                }
                if let Some(record) = evidence {
                    runner.push_evidence(record);
                }
                let node_ref = NodeRef::runner(runner.id.clone());
                rig.add_runner(runner).map_err(|err| ExtractError::Model(err.to_string()))?;
                node_ref
            }
            TargetCategory::Aggregator => {
                let mut aggregator =
                    Aggregator::new(state.allocator.next_aggregator(), target.name.clone());
                for dependency in dependencies {
                    aggregator.push_dependency(dependency);
                }
                if let Some(record) = evidence {
                    aggregator.push_evidence(record);
                }
                let node_ref = NodeRef::aggregator(aggregator.id.clone());
                rig.add_aggregator(aggregator)
                    .map_err(|err| ExtractError::Model(err.to_string()))?;
                node_ref
            }
        };
        state.in_progress.remove(target_id);
        state.findings.insert(target_id.to_string(), node_ref.clone());
        Ok(Some(node_ref))
    }

    // ------------------------------------------------------------------
    // Stage: tests
    // ------------------------------------------------------------------

    /// Binds CTest tests into test definitions.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when a backtrace cannot be resolved, an
    /// `add_test` span cannot be parsed, or the engine rejects a test.
    pub fn populate_tests(
        &self,
        rig: &mut Rig,
        state: &mut ExtractionState,
        repo_root: &Path,
        data: &CTestData,
    ) -> Result<(), ExtractError> {
        for test_info in &data.tests {
            let anchor = ctest::resolve_anchor(data, test_info)?;
            let anchor = TestAnchor {
                file: if anchor.file.is_absolute() {
                    anchor.file
                } else {
                    repo_root.join(&anchor.file)
                },
                line: anchor.line,
            };
            let parsed = ctest::parse_add_test_at(&anchor)?;
            let evidence = Evidence::from_lines(
                state.allocator.next_evidence(),
                vec![anchor.reference(repo_root)],
            )
            .map_err(|err| ExtractError::Model(err.to_string()))?;

            let executable = state.resolve_token(&parsed.command).cloned();
            let executable = match executable {
                Some(node_ref) if node_ref.kind == NodeKind::Component => node_ref,
                _ => {
                    let runner = synthesize_runner(state, &parsed, &evidence);
                    let node_ref = NodeRef::runner(runner.id.clone());
                    rig.add_runner(runner)
                        .map_err(|err| ExtractError::Model(err.to_string()))?;
                    node_ref
                }
            };

            let mut test = TestDefinition::new(
                state.allocator.next_test(),
                test_info.name.clone(),
                CTEST_FRAMEWORK,
            );
            match executable.kind {
                NodeKind::Component => {
                    test.test_components_ids = transitive_components(rig, &executable.id);
                    if let Some(component) = rig.component(&executable.id) {
                        test.source_files = component.source_files.clone();
                    }
                }
                NodeKind::Runner => {
                    if let Some(runner) = rig.runner(&executable.id) {
                        test.test_components_ids = runner
                            .args_nodes
                            .iter()
                            .filter(|node| node.kind == NodeKind::Component)
                            .map(|node| node.id.clone())
                            .collect();
                        test.source_files =
                            ctest::existing_file_args(repo_root, &runner.arguments);
                    }
                }
                NodeKind::Aggregator | NodeKind::Test => {}
            }
            test.test_executable = Some(executable);
            test.push_evidence(evidence);
            rig.add_test(test).map_err(|err| ExtractError::Model(err.to_string()))?;
        }
        Ok(())
    }
}

impl Extractor for CMakeExtractor {
    fn build_system(&self) -> &str {
        "CMake"
    }

    /// Contract adapter over the inherent [`CMakeExtractor::extract`]
    /// pipeline entry; inherent methods take precedence, so the qualified
    /// call below resolves there rather than recursing into this impl.
    fn extract(&self, repo_root: &Path) -> Result<Rig, ExtractorError> {
        CMakeExtractor::extract(self, repo_root).map_err(ExtractorError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Makes a path repository-relative when it lies under the root.
fn relative_to_root(path: &Path, repo_root: &Path) -> PathBuf {
    path.strip_prefix(repo_root).map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
}

/// Builds a target's evidence, falling back from the File API backtrace to
/// the CMakeLists record of the same target.
fn target_evidence(
    state: &mut ExtractionState,
    target: &Target,
    lists: &CMakeListsParser,
) -> Option<Evidence> {
    if let Some(record) = backtrace_evidence(target, state.allocator.next_evidence()) {
        return Some(record);
    }
    let custom = lists.custom_target(&target.name)?;
    Evidence::from_lines(
        state.allocator.next_evidence(),
        vec![format!("{}:{}", custom.file.display(), custom.line)],
    )
    .ok()
}

/// Resolves runtime dependencies declared through target properties in the
/// build file that defined the target (located via the backtrace).
fn runtime_dependencies(
    state: &ExtractionState,
    repo_root: &Path,
    target: &Target,
) -> Vec<NodeRef> {
    let Some(graph) = target.backtrace_graph.as_ref() else {
        return Vec::new();
    };
    let file = target
        .backtrace
        .and_then(|index| graph.nodes.get(index))
        .and_then(|node| node.file)
        .and_then(|file_index| graph.files.get(file_index));
    let Some(file) = file else {
        return Vec::new();
    };
    let path = PathBuf::from(file);
    let path = if path.is_absolute() { path } else { repo_root.join(path) };
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    match_runtime_artifacts(state, &content, &target.name)
}

/// Synthesizes a runner for a test command that matches no component.
fn synthesize_runner(
    state: &mut ExtractionState,
    parsed: &ctest::ParsedAddTest,
    evidence: &Evidence,
) -> Runner {
    let mut runner =
        Runner::new(state.allocator.next_runner(), parsed.command.clone(), parsed.args.clone());
    for arg in &parsed.args {
        if let Some(node_ref) = state.resolve_token(arg) {
            runner.push_args_node(node_ref.clone());
        }
    }
    runner.push_evidence(evidence.clone());
    runner
}

/// Builds the component skeleton for a classified target.
fn build_component(
    state: &mut ExtractionState,
    target: &Target,
    component_type: rig_core::ComponentType,
) -> Result<Component, rig_core::ModelError> {
    let name = target
        .name_on_disk
        .clone()
        .or_else(|| {
            target
                .artifacts
                .first()
                .and_then(|artifact| artifact.path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| target.name.clone());
    let relative_path = target
        .artifacts
        .first()
        .map_or_else(|| PathBuf::from(&name), |artifact| artifact.path.clone());
    let language = component_language(target, TargetCategory::Component(component_type));
    let mut component = Component::new(
        state.allocator.next_component(),
        name,
        component_type,
        language,
        relative_path,
    )?;
    component.source_files = target.sources.iter().map(|source| source.path.clone()).collect();
    Ok(component)
}

/// Matches runtime-artifact basenames against created component names.
fn match_runtime_artifacts(
    state: &ExtractionState,
    cmake_content: &str,
    target_name: &str,
) -> Vec<NodeRef> {
    runtime_deps::runtime_artifacts_for_target(cmake_content, target_name)
        .into_iter()
        .filter_map(|artifact| state.component_names.get(&artifact).cloned())
        .collect()
}

/// Synthesizes external packages for link tokens backed by `find_package`
/// records rather than repository targets.
fn attach_external_packages(
    rig: &mut Rig,
    state: &mut ExtractionState,
    component: &mut Component,
    target: &Target,
    lists: &CMakeListsParser,
) {
    let tokens: Vec<String> = lists.target_link_libraries(&target.name).to_vec();
    for token in tokens {
        if token.starts_with('-') || token.contains('/') || token.contains("$<") {
            continue;
        }
        if state.resolve_token(&token).is_some() {
            continue;
        }
        let base = token.split("::").next().unwrap_or(&token);
        let Some(record) = lists.find_package(base) else {
            continue;
        };
        if component.external_packages.iter().any(|package| package.name == token) {
            continue;
        }
        let manager_id = match state.package_managers.get(&record.name) {
            Some(id) => id.clone(),
            None => {
                let id = state.allocator.next_package();
                rig.register_package_manager(PackageManager::new(
                    id.clone(),
                    "cmake",
                    record.name.clone(),
                ));
                state.package_managers.insert(record.name.clone(), id.clone());
                id
            }
        };
        component.push_external_package(ExternalPackage::new(
            state.allocator.next_package(),
            token,
            manager_id,
        ));
    }
}

/// Collects the transitive component closure of a component's dependencies,
/// excluding the component itself, cycle-safe.
fn transitive_components(rig: &Rig, root: &NodeId) -> BTreeSet<NodeId> {
    let mut closure = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut queue = vec![root.clone()];
    while let Some(current) = queue.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(component) = rig.component(&current) else {
            continue;
        };
        for dependency in component.depends_on() {
            if dependency.kind == NodeKind::Component && dependency.id != *root {
                closure.insert(dependency.id.clone());
            }
            queue.push(dependency.id.clone());
        }
    }
    closure
}
