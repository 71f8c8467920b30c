// rig-extract-cmake/src/runtime_deps.rs
// ============================================================================
// Module: Runtime Dependency Parser
// Description: Recover runtime dependencies from target properties.
// Purpose: Parse environment assignments the File API does not expose.
// Dependencies: crate::lists_parser, regex
// ============================================================================

//! ## Overview
//! Some targets declare runtime dependencies only via
//! `set_target_properties(<t> PROPERTIES VS_DEBUGGER_ENVIRONMENT ...)`
//! entries such as `CLASSPATH=.../util.jar;.../core.jar`. The File API does
//! not expose target properties, so this module scans the CMakeLists text,
//! extracts the known environment variables, splits values on both platform
//! path separators, and matches entry basenames against known component
//! artifact names. A basename that matches nothing is a benign miss.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variables that carry runtime artifact paths.
const RUNTIME_ENV_VARS: &[&str] = &["CLASSPATH", "PATH", "LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH"];

/// Artifact suffixes eligible for runtime-dependency matching.
const ARTIFACT_SUFFIXES: &[&str] = &[".jar", ".dll", ".so", ".dylib", ".exe"];

/// Splits environment blocks into individual assignments.
static ENV_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\n\s]+").unwrap_or_else(|_| unreachable!()));

/// Splits path lists on both Windows and Unix separators.
static PATH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;:]").unwrap_or_else(|_| unreachable!()));

// ============================================================================
// SECTION: Property Extraction
// ============================================================================

/// Extracts a property value from a `set_target_properties` call for the
/// given target, or `None` when the target declares none.
#[must_use]
pub fn extract_target_property(
    cmake_content: &str,
    target_name: &str,
    property_name: &str,
) -> Option<String> {
    let block_pattern = format!(
        r"(?is)set_target_properties\s*\(\s*{}\s+PROPERTIES\s+(.*?)\)",
        regex::escape(target_name)
    );
    let block_regex = Regex::new(&block_pattern).ok()?;
    let block = block_regex.captures(cmake_content)?.get(1)?.as_str();

    let property_pattern = format!(
        r#"(?i){}\s+["']?(.*?)["']?\s*(?:\n|$|\)|,)"#,
        regex::escape(property_name)
    );
    let property_regex = Regex::new(&property_pattern).ok()?;
    let value = property_regex.captures(block)?.get(1)?.as_str();
    Some(value.trim().trim_matches(['"', '\'']).to_string())
}

// ============================================================================
// SECTION: Environment Parsing
// ============================================================================

/// Extracts runtime artifact basenames from an environment string such as
/// `CLASSPATH=${CMAKE_CURRENT_BINARY_DIR}/util.jar;.../core.jar`.
#[must_use]
pub fn parse_environment_artifacts(env_string: &str) -> Vec<String> {
    let mut artifacts = Vec::new();
    for assignment in ENV_SPLIT.split(env_string) {
        let assignment = assignment.trim();
        if assignment.is_empty() {
            continue;
        }
        let Some((variable, value)) = assignment.split_once('=') else {
            continue;
        };
        if !RUNTIME_ENV_VARS.contains(&variable.trim().to_uppercase().as_str()) {
            continue;
        }
        for path in PATH_SPLIT.split(value) {
            let path = path.trim();
            if path.is_empty() {
                continue;
            }
            let basename = path.rsplit(['/', '\\']).next().unwrap_or(path);
            if ARTIFACT_SUFFIXES.iter().any(|suffix| basename.ends_with(suffix)) {
                artifacts.push(basename.to_string());
            }
        }
    }
    artifacts
}

/// Returns runtime-dependency artifact basenames for a target declared in
/// the given CMakeLists content, empty when the target declares none.
#[must_use]
pub fn runtime_artifacts_for_target(cmake_content: &str, target_name: &str) -> Vec<String> {
    extract_target_property(cmake_content, target_name, "VS_DEBUGGER_ENVIRONMENT")
        .map(|value| parse_environment_artifacts(&value))
        .unwrap_or_default()
}
