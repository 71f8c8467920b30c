// rig-core/src/runtime/compact.rs
// ============================================================================
// Module: RIG Payload Compaction
// Description: Lossless shrinking of canonical JSON for LLM consumers.
// Purpose: Deduplicate paths/strings and alias hot keys behind lookup tables.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Compaction rewrites a canonical export document as
//! `{"lookups": {"paths": [...], "strings": [...], "keys": {...}}, "data": ...}`.
//! Path-like strings become `$p<index>` tokens, frequent long strings become
//! `$s<index>` tokens, and high-frequency keys are renamed through a fixed
//! alias table stored alias-to-original so readers can reverse it. When the
//! rewritten form is not strictly smaller than the input, the input is
//! returned unchanged. Expansion reconstructs the original document exactly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum occurrences for a string to enter the string table.
const STRING_TABLE_MIN_COUNT: usize = 3;
/// Minimum length for a string to enter the string table.
const STRING_TABLE_MIN_LEN: usize = 12;
/// Minimum length for a string to be considered path-like.
const PATH_MIN_LEN: usize = 4;

/// File extensions that mark an extensionful string as path-like.
const PATH_SUFFIXES: &[&str] = &[
    "c", "cc", "cpp", "cxx", "h", "hpp", "hxx", "py", "java", "go", "cs", "js", "ts", "json",
    "yaml", "yml", "toml", "cmake", "ini", "cfg", "dll", "exe",
];

/// Fixed key alias table, original to alias.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("components", "comp"),
    ("aggregators", "agg"),
    ("runners", "run"),
    ("tests", "test"),
    ("external_packages", "extpkg"),
    ("package_managers", "pkgmgr"),
    ("source_files", "sf"),
    ("depends_on_ids", "deps"),
    ("external_packages_ids", "extdeps"),
    ("evidence_ids", "evid"),
    ("programming_language", "lang"),
    ("relative_path", "rel"),
    ("test_components_ids", "tcomp"),
    ("components_being_tested_ids", "cbt"),
    ("test_executable_component_id", "texe"),
    ("call_stack", "cs"),
    ("package_name", "pkg"),
    ("package_manager_id", "pm"),
    ("configure_cmd", "cfg"),
    ("test_cmd", "tcmd"),
    ("test_framework", "tf"),
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while expanding a compacted document.
#[derive(Debug, Error)]
pub enum CompactError {
    /// The compacted wrapper was structurally invalid.
    #[error("malformed compact payload: {0}")]
    Malformed(String),
    /// A table token referenced an out-of-range index.
    #[error("dangling lookup token: {0}")]
    DanglingToken(String),
}

// ============================================================================
// SECTION: Compaction
// ============================================================================

/// Compacts a canonical JSON document.
///
/// Returns the `{lookups, data}` wrapper when it is strictly smaller than
/// the input rendering, and a clone of the input otherwise.
#[must_use]
pub fn compact(value: &Value) -> Value {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut path_candidates: BTreeSet<String> = BTreeSet::new();
    scan_strings(value, &mut counts, &mut path_candidates);

    let paths: Vec<String> = path_candidates.into_iter().collect();
    let path_index: BTreeMap<&str, usize> =
        paths.iter().enumerate().map(|(index, path)| (path.as_str(), index)).collect();

    let strings: Vec<String> = counts
        .iter()
        .filter(|(text, count)| {
            **count >= STRING_TABLE_MIN_COUNT
                && text.len() > STRING_TABLE_MIN_LEN
                && !path_index.contains_key(text.as_str())
        })
        .map(|(text, _)| text.clone())
        .collect();
    let string_index: BTreeMap<&str, usize> =
        strings.iter().enumerate().map(|(index, text)| (text.as_str(), index)).collect();

    let aliases: BTreeMap<&str, &str> = KEY_ALIASES.iter().copied().collect();
    let data = rewrite(value, &path_index, &string_index, &aliases);

    let mut keys_reversed = Map::new();
    for (original, alias) in KEY_ALIASES {
        keys_reversed.insert((*alias).to_string(), Value::String((*original).to_string()));
    }
    let mut lookups = Map::new();
    lookups.insert("paths".to_string(), Value::Array(paths.into_iter().map(Value::String).collect()));
    lookups
        .insert("strings".to_string(), Value::Array(strings.into_iter().map(Value::String).collect()));
    lookups.insert("keys".to_string(), Value::Object(keys_reversed));

    let mut wrapper = Map::new();
    wrapper.insert("lookups".to_string(), Value::Object(lookups));
    wrapper.insert("data".to_string(), data);
    let wrapper = Value::Object(wrapper);

    let compacted_len = wrapper.to_string().len();
    let original_len = value.to_string().len();
    if compacted_len >= original_len { value.clone() } else { wrapper }
}

/// Collects string occurrence counts and path-like candidates.
fn scan_strings(
    value: &Value,
    counts: &mut BTreeMap<String, usize>,
    paths: &mut BTreeSet<String>,
) {
    match value {
        Value::String(text) => {
            *counts.entry(text.clone()).or_insert(0) += 1;
            if is_path_like(text) {
                paths.insert(text.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_strings(item, counts, paths);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                scan_strings(child, counts, paths);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Returns true when a string should enter the path table.
fn is_path_like(text: &str) -> bool {
    if text.len() < PATH_MIN_LEN {
        return false;
    }
    if text.contains('/') || text.contains('\\') {
        return true;
    }
    let Some((_, extension)) = text.rsplit_once('.') else {
        return false;
    };
    PATH_SUFFIXES.contains(&extension.to_lowercase().as_str())
}

/// Rewrites strings through the tables and keys through the alias map.
fn rewrite(
    value: &Value,
    path_index: &BTreeMap<&str, usize>,
    string_index: &BTreeMap<&str, usize>,
    aliases: &BTreeMap<&str, &str>,
) -> Value {
    match value {
        Value::String(text) => {
            if let Some(index) = path_index.get(text.as_str()) {
                Value::String(format!("$p{index}"))
            } else if let Some(index) = string_index.get(text.as_str()) {
                Value::String(format!("$s{index}"))
            } else {
                value.clone()
            }
        }
        Value::Array(items) => Value::Array(
            items.iter().map(|item| rewrite(item, path_index, string_index, aliases)).collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let key = aliases.get(key.as_str()).map_or_else(|| key.clone(), ToString::to_string);
                out.insert(key, rewrite(child, path_index, string_index, aliases));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// Expands a compacted document back to its original form.
///
/// Documents without the `{lookups, data}` wrapper are returned unchanged.
///
/// # Errors
///
/// Returns [`CompactError`] when the wrapper is malformed or a token
/// references a missing table entry.
pub fn expand(value: &Value) -> Result<Value, CompactError> {
    let Some(object) = value.as_object() else {
        return Ok(value.clone());
    };
    let (Some(lookups), Some(data)) = (object.get("lookups"), object.get("data")) else {
        return Ok(value.clone());
    };
    let lookups = lookups
        .as_object()
        .ok_or_else(|| CompactError::Malformed("lookups is not an object".to_string()))?;
    let paths = table_entries(lookups, "paths")?;
    let strings = table_entries(lookups, "strings")?;
    let keys = lookups
        .get("keys")
        .and_then(Value::as_object)
        .ok_or_else(|| CompactError::Malformed("keys is not an object".to_string()))?;
    let mut alias_to_original: BTreeMap<&str, &str> = BTreeMap::new();
    for (alias, original) in keys {
        let original = original
            .as_str()
            .ok_or_else(|| CompactError::Malformed(format!("key alias '{alias}' is not a string")))?;
        alias_to_original.insert(alias.as_str(), original);
    }
    restore(data, &paths, &strings, &alias_to_original)
}

/// Reads a lookup table as a string vector.
fn table_entries(lookups: &Map<String, Value>, name: &str) -> Result<Vec<String>, CompactError> {
    let entries = lookups
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| CompactError::Malformed(format!("{name} is not an array")))?;
    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(ToString::to_string)
                .ok_or_else(|| CompactError::Malformed(format!("{name} entry is not a string")))
        })
        .collect()
}

/// Restores tokens and aliased keys recursively.
fn restore(
    value: &Value,
    paths: &[String],
    strings: &[String],
    aliases: &BTreeMap<&str, &str>,
) -> Result<Value, CompactError> {
    match value {
        Value::String(text) => {
            if let Some(index) = parse_token(text, "$p") {
                let entry = paths
                    .get(index)
                    .ok_or_else(|| CompactError::DanglingToken(text.clone()))?;
                Ok(Value::String(entry.clone()))
            } else if let Some(index) = parse_token(text, "$s") {
                let entry = strings
                    .get(index)
                    .ok_or_else(|| CompactError::DanglingToken(text.clone()))?;
                Ok(Value::String(entry.clone()))
            } else {
                Ok(value.clone())
            }
        }
        Value::Array(items) => {
            let restored: Result<Vec<Value>, CompactError> =
                items.iter().map(|item| restore(item, paths, strings, aliases)).collect();
            Ok(Value::Array(restored?))
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let key =
                    aliases.get(key.as_str()).map_or_else(|| key.clone(), ToString::to_string);
                out.insert(key, restore(child, paths, strings, aliases)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Parses a `$p<digits>` / `$s<digits>` token into its table index.
fn parse_token(text: &str, prefix: &str) -> Option<usize> {
    let digits = text.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
