// crates/rig-core/tests/proptest_compact.rs
// ============================================================================
// Module: Payload Compaction Property Tests
// Description: Randomized reversibility and non-inflation checks.
// Purpose: Hold the compaction laws over arbitrary JSON-like documents.
// ============================================================================

//! ## Overview
//! Property tests for payload compaction: for any generated document,
//! expansion inverts compaction exactly and the compacted rendering is
//! never larger than the original rendering.

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

use proptest::prelude::*;
use rig_core::compact;
use rig_core::expand;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Generators
// ============================================================================

/// Strings that exercise the path detector, the frequency table, and plain
/// short values. Tokens like `$p0` are deliberately excluded: the compactor
/// reserves that grammar for its own tables.
fn leaf_string() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("src/app/main.cpp".to_string()),
        Just("build/out/lib/libcore.so".to_string()),
        Just("a-long-repeated-identifier-value".to_string()),
        Just("cxx".to_string()),
        Just("hello".to_string()),
        "[a-z]{1,8}",
    ]
}

/// Object keys drawn from names the key-alias table neither maps nor
/// produces, keeping aliasing injective over generated documents.
fn object_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("name".to_string()),
        Just("items".to_string()),
        Just("values".to_string()),
        Just("entries".to_string()),
        Just("payload".to_string()),
        Just("kind".to_string()),
        Just("label".to_string()),
        Just("children".to_string()),
    ]
}

/// Shallow JSON documents built from the leaf strings.
fn document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        leaf_string().prop_map(Value::String),
        any::<i32>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ];
    leaf.prop_recursive(3, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map(object_key(), inner, 0..8).prop_map(|map| json!(map)),
        ]
    })
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn expand_inverts_compact(original in document()) {
        let compacted = compact(&original);
        let expanded = expand(&compacted).expect("expand");
        prop_assert_eq!(expanded, original);
    }

    #[test]
    fn compaction_never_inflates(original in document()) {
        let compacted = compact(&original);
        prop_assert!(compacted.to_string().len() <= original.to_string().len());
    }
}
