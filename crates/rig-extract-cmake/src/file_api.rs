// rig-extract-cmake/src/file_api.rs
// ============================================================================
// Module: CMake File API Reader
// Description: Query instrumentation and typed reply deserialization.
// Purpose: Read the configured project model without coupling to CMake
//          internals beyond the documented reply layout.
// Dependencies: crate::error, serde, serde_json
// ============================================================================

//! ## Overview
//! Before configuring, the extractor writes query marker files under
//! `<build>/.cmake/api/v1/query/`. After `cmake` runs, the reply directory
//! holds an index naming one JSON file per object kind; codemodel targets
//! live in further per-target files. This module reads the five consumed
//! kinds (codemodel v2, cache v2, cmakeFiles v1, configureLog v1,
//! toolchains v1) into typed structures. The codemodel and cache are
//! required; the remaining kinds are informational and tolerated missing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ExtractError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query marker file names for the consumed object kinds.
const QUERY_FILES: &[&str] =
    &["codemodel-v2", "cache-v2", "cmakeFiles-v1", "configureLog-v1", "toolchains-v1"];

// ============================================================================
// SECTION: Reply Index Model
// ============================================================================

/// Top-level reply index.
#[derive(Debug, Deserialize)]
struct ReplyIndex {
    /// Reply objects written by CMake.
    #[serde(default)]
    objects: Vec<ReplyObject>,
}

/// One reply object reference in the index.
#[derive(Debug, Deserialize)]
struct ReplyObject {
    /// Object kind (`codemodel`, `cache`, ...).
    kind: String,
    /// Reply file name relative to the reply directory.
    #[serde(rename = "jsonFile")]
    json_file: String,
}

// ============================================================================
// SECTION: Codemodel Model
// ============================================================================

/// Codemodel v2 reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Codemodel {
    /// Source and build paths.
    pub paths: CodemodelPaths,
    /// Build configurations (the first is consumed).
    #[serde(default)]
    pub configurations: Vec<Configuration>,
}

/// Codemodel source/build paths.
#[derive(Debug, Clone, Deserialize)]
pub struct CodemodelPaths {
    /// Absolute source directory.
    pub source: PathBuf,
    /// Absolute build directory.
    pub build: PathBuf,
}

/// One build configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    /// Configuration name (e.g. `Debug`).
    pub name: String,
    /// Projects in the configuration.
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Target references in the configuration.
    #[serde(default)]
    pub targets: Vec<TargetRef>,
}

/// Project entry in a configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    /// Project name.
    pub name: String,
}

/// Target reference naming the per-target reply file.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetRef {
    /// Stable CMake target id.
    pub id: String,
    /// Target name.
    pub name: String,
    /// Per-target reply file.
    #[serde(rename = "jsonFile")]
    pub json_file: String,
}

// ============================================================================
// SECTION: Target Model
// ============================================================================

/// Per-target codemodel reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Stable CMake target id.
    pub id: String,
    /// Target name.
    pub name: String,
    /// Target type (`EXECUTABLE`, `STATIC_LIBRARY`, `UTILITY`, ...).
    #[serde(rename = "type")]
    pub target_type: String,
    /// Index of the defining call in the backtrace graph.
    #[serde(default)]
    pub backtrace: Option<usize>,
    /// Backtrace graph for the target's commands.
    #[serde(rename = "backtraceGraph", default)]
    pub backtrace_graph: Option<BacktraceGraph>,
    /// Produced artifacts, build-directory relative.
    #[serde(default)]
    pub artifacts: Vec<TargetArtifact>,
    /// Artifact file name on disk.
    #[serde(rename = "nameOnDisk", default)]
    pub name_on_disk: Option<String>,
    /// Compile groups carrying the compile language.
    #[serde(rename = "compileGroups", default)]
    pub compile_groups: Vec<CompileGroup>,
    /// Link step metadata.
    #[serde(default)]
    pub link: Option<TargetLink>,
    /// Dependencies on other targets.
    #[serde(default)]
    pub dependencies: Vec<TargetDependency>,
    /// Source file entries, source-directory relative.
    #[serde(default)]
    pub sources: Vec<TargetSource>,
}

/// Artifact entry of a target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetArtifact {
    /// Artifact path relative to the build directory.
    pub path: PathBuf,
}

/// Compile group of a target.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileGroup {
    /// Compile language (`CXX`, `C`, ...).
    pub language: String,
}

/// Link metadata of a target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetLink {
    /// Link language.
    #[serde(default)]
    pub language: Option<String>,
}

/// Dependency edge between targets.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetDependency {
    /// Stable CMake target id of the dependency.
    pub id: String,
}

/// Source entry of a target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSource {
    /// Source path relative to the source directory.
    pub path: PathBuf,
}

/// Backtrace graph shared by target commands.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktraceGraph {
    /// Command names.
    #[serde(default)]
    pub commands: Vec<String>,
    /// File paths, source-directory relative.
    #[serde(default)]
    pub files: Vec<String>,
    /// Backtrace nodes, parent-linked.
    #[serde(default)]
    pub nodes: Vec<BacktraceNode>,
}

/// One backtrace node.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BacktraceNode {
    /// File index into the graph's file table.
    #[serde(default)]
    pub file: Option<usize>,
    /// Line number of the call.
    #[serde(default)]
    pub line: Option<u32>,
    /// Command index into the graph's command table.
    #[serde(default)]
    pub command: Option<usize>,
    /// Parent node index.
    #[serde(default)]
    pub parent: Option<usize>,
}

// ============================================================================
// SECTION: Cache Model
// ============================================================================

/// Cache v2 reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
    /// Cache entries.
    #[serde(default)]
    pub entries: Vec<CacheEntry>,
}

/// One cache entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheEntry {
    /// Entry name.
    pub name: String,
    /// Entry value.
    pub value: String,
}

impl Cache {
    /// Returns the value of a cache entry by name.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|entry| entry.name == name).map(|entry| entry.value.as_str())
    }
}

// ============================================================================
// SECTION: Auxiliary Models
// ============================================================================

/// cmakeFiles v1 reply.
#[derive(Debug, Clone, Deserialize)]
pub struct CmakeFiles {
    /// Input build files.
    #[serde(default)]
    pub inputs: Vec<CmakeFileInput>,
}

/// One build-file input.
#[derive(Debug, Clone, Deserialize)]
pub struct CmakeFileInput {
    /// Input path, source-directory relative.
    pub path: PathBuf,
}

/// toolchains v1 reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Toolchains {
    /// Per-language toolchains.
    #[serde(default)]
    pub toolchains: Vec<Toolchain>,
}

/// One language toolchain.
#[derive(Debug, Clone, Deserialize)]
pub struct Toolchain {
    /// Compile language.
    pub language: String,
}

// ============================================================================
// SECTION: Loaded Reply Set
// ============================================================================

/// All File API data consumed by the extractor.
#[derive(Debug, Clone)]
pub struct FileApi {
    /// Codemodel reply.
    pub codemodel: Codemodel,
    /// Cache reply.
    pub cache: Cache,
    /// cmakeFiles reply, when present.
    pub cmake_files: Option<CmakeFiles>,
    /// configureLog reply, raw, when present.
    pub configure_log: Option<serde_json::Value>,
    /// toolchains reply, when present.
    pub toolchains: Option<Toolchains>,
    /// Per-target replies keyed by CMake target id.
    pub targets: BTreeMap<String, Target>,
}

impl FileApi {
    /// Returns the first configuration, the one the extractor consumes.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileApi`] when the codemodel has no
    /// configurations.
    pub fn first_configuration(&self) -> Result<&Configuration, ExtractError> {
        self.codemodel.configurations.first().ok_or_else(|| ExtractError::FileApi {
            path: PathBuf::from("codemodel"),
            message: "codemodel has no configurations".to_string(),
        })
    }
}

// ============================================================================
// SECTION: Query Instrumentation
// ============================================================================

/// Writes the query marker files under the build directory.
///
/// # Errors
///
/// Returns [`ExtractError::FileApi`] when the query directory cannot be
/// created or a marker cannot be written.
pub fn write_queries(build_dir: &Path) -> Result<(), ExtractError> {
    let query_dir = build_dir.join(".cmake").join("api").join("v1").join("query");
    std::fs::create_dir_all(&query_dir).map_err(|err| ExtractError::FileApi {
        path: query_dir.clone(),
        message: err.to_string(),
    })?;
    for name in QUERY_FILES {
        let marker = query_dir.join(name);
        std::fs::write(&marker, b"").map_err(|err| ExtractError::FileApi {
            path: marker.clone(),
            message: err.to_string(),
        })?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Reply Reading
// ============================================================================

/// Reads and deserializes one reply file.
fn read_reply<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ExtractError> {
    let bytes = std::fs::read(path).map_err(|err| ExtractError::FileApi {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| ExtractError::FileApi {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Reads the full reply set from a configured build directory.
///
/// # Errors
///
/// Returns [`ExtractError::FileApi`] when the reply index, codemodel, cache,
/// or any per-target file is missing or malformed.
pub fn read(build_dir: &Path) -> Result<FileApi, ExtractError> {
    let reply_dir = build_dir.join(".cmake").join("api").join("v1").join("reply");
    let index_path = newest_index(&reply_dir)?;
    let index: ReplyIndex = read_reply(&index_path)?;

    let mut codemodel: Option<Codemodel> = None;
    let mut cache: Option<Cache> = None;
    let mut cmake_files: Option<CmakeFiles> = None;
    let mut configure_log: Option<serde_json::Value> = None;
    let mut toolchains: Option<Toolchains> = None;

    for object in &index.objects {
        let path = reply_dir.join(&object.json_file);
        match object.kind.as_str() {
            "codemodel" => codemodel = Some(read_reply(&path)?),
            "cache" => cache = Some(read_reply(&path)?),
            "cmakeFiles" => cmake_files = Some(read_reply(&path)?),
            "configureLog" => configure_log = Some(read_reply(&path)?),
            "toolchains" => toolchains = Some(read_reply(&path)?),
            _ => {}
        }
    }

    let codemodel = codemodel.ok_or_else(|| ExtractError::FileApi {
        path: index_path.clone(),
        message: "reply index has no codemodel object".to_string(),
    })?;
    let cache = cache.ok_or_else(|| ExtractError::FileApi {
        path: index_path.clone(),
        message: "reply index has no cache object".to_string(),
    })?;

    let mut targets = BTreeMap::new();
    for configuration in &codemodel.configurations {
        for target_ref in &configuration.targets {
            let target: Target = read_reply(&reply_dir.join(&target_ref.json_file))?;
            targets.insert(target_ref.id.clone(), target);
        }
    }

    Ok(FileApi { codemodel, cache, cmake_files, configure_log, toolchains, targets })
}

/// Locates the newest `index-*.json` in the reply directory.
fn newest_index(reply_dir: &Path) -> Result<PathBuf, ExtractError> {
    let entries = std::fs::read_dir(reply_dir).map_err(|err| ExtractError::FileApi {
        path: reply_dir.to_path_buf(),
        message: err.to_string(),
    })?;
    let mut newest: Option<PathBuf> = None;
    for entry in entries {
        let entry = entry.map_err(|err| ExtractError::FileApi {
            path: reply_dir.to_path_buf(),
            message: err.to_string(),
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("index-") && name.ends_with(".json") {
            let path = entry.path();
            if newest.as_ref().is_none_or(|current| path > *current) {
                newest = Some(path);
            }
        }
    }
    newest.ok_or_else(|| ExtractError::FileApi {
        path: reply_dir.to_path_buf(),
        message: "no reply index found; was the project configured?".to_string(),
    })
}
