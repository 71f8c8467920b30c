// crates/rig-core/tests/compact_payload.rs
// ============================================================================
// Module: Payload Compaction Unit Tests
// Description: Lookup-table rewriting and lossless expansion.
// Purpose: Validate reversibility, non-inflation, and the wrapper shape.
// ============================================================================

//! ## Overview
//! Unit-level tests for payload compaction:
//! - `expand(compact(v))` reconstructs the original value
//! - Compacted output is never larger than the input
//! - Path and string tables, tokens, and key aliases have the agreed shape
//! - Payloads that would not shrink pass through unchanged

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

use rig_core::compact;
use rig_core::expand;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// A payload with enough repeated paths and long strings that the lookup
/// tables pay for themselves.
fn repetitive_payload() -> Value {
    let mut components = Vec::new();
    for index in 0..40 {
        components.push(json!({
            "name": format!("component-{index}"),
            "relative_path": "build/artifacts/primary/output.so",
            "source_files": ["src/common/runtime_support.cpp", "src/common/diagnostics_channel.cpp"],
            "programming_language": "cxx",
            "depends_on_ids": ["core-runtime-support-library:static_library:cxx"]
        }));
    }
    let mut tests = Vec::new();
    for index in 0..20 {
        tests.push(json!({
            "name": format!("test-{index}"),
            "test_framework": "integration-harness-framework"
        }));
    }
    json!({"components": components, "tests": tests})
}

// ============================================================================
// SECTION: Reversibility
// ============================================================================

#[test]
fn compact_then_expand_is_the_identity() {
    let original = repetitive_payload();
    let compacted = compact(&original);
    let expanded = expand(&compacted).expect("expand");
    assert_eq!(expanded, original);
}

#[test]
fn expand_passes_uncompacted_values_through() {
    let original = json!({"name": "hello"});
    assert_eq!(expand(&original).expect("expand"), original);
}

#[test]
fn non_shrinking_payload_is_returned_unchanged() {
    let original = json!({"a": 1});
    assert_eq!(compact(&original), original);
}

// ============================================================================
// SECTION: Wrapper Shape
// ============================================================================

#[test]
fn compacted_wrapper_has_lookups_and_data() {
    let original = repetitive_payload();
    let compacted = compact(&original);
    let object = compacted.as_object().expect("object");
    assert!(object.contains_key("lookups"));
    assert!(object.contains_key("data"));

    let lookups = object["lookups"].as_object().expect("lookups");
    let paths = lookups["paths"].as_array().expect("paths");
    assert!(paths.iter().any(|entry| entry == "src/common/runtime_support.cpp"));
    let strings = lookups["strings"].as_array().expect("strings");
    assert!(strings.iter().any(|entry| entry == "integration-harness-framework"));
    // Key alias map is stored alias-to-original so readers can reverse it.
    assert_eq!(lookups["keys"]["comp"], "components");
    assert_eq!(lookups["keys"]["tf"], "test_framework");
}

#[test]
fn path_values_are_rewritten_as_tokens() {
    let original = repetitive_payload();
    let compacted = compact(&original);
    assert!(compacted.to_string().contains("$p"));

    let data = &compacted["data"];
    let components = data["comp"].as_array().expect("aliased components");
    let first_sources = components[0]["sf"].as_array().expect("aliased source_files");
    assert!(first_sources.iter().all(|entry| {
        entry.as_str().is_some_and(|text| text.starts_with("$p"))
    }));
}

#[test]
fn frequent_long_strings_are_rewritten_as_tokens() {
    let original = repetitive_payload();
    let compacted = compact(&original);
    let tests = compacted["data"]["test"].as_array().expect("aliased tests");
    for test in tests {
        let tag = test["tf"].as_str().expect("framework token");
        assert!(tag.starts_with("$s"));
    }
}

// ============================================================================
// SECTION: Non-Inflation
// ============================================================================

#[test]
fn compacted_rendering_is_never_larger() {
    for payload in [repetitive_payload(), json!({"a": 1}), json!([]), json!("x")] {
        let compacted = compact(&payload);
        assert!(compacted.to_string().len() <= payload.to_string().len());
    }
}
