// crates/rig-store-sqlite/tests/proptest_roundtrip.rs
// ============================================================================
// Module: Save/Load Property Tests
// Description: Randomized round-trip checks over generated graphs.
// Purpose: Hold the save/load identity law for arbitrary well-formed graphs.
// ============================================================================

//! ## Overview
//! Property tests for the store: graphs with randomized component types,
//! languages, dependency wiring, and evidence anchors survive a save/load
//! cycle semantically identical and with every shared record intact.

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

use proptest::prelude::*;
use rig_core::Component;
use rig_core::ComponentType;
use rig_core::Evidence;
use rig_core::EvidenceId;
use rig_core::NodeId;
use rig_core::NodeRef;
use rig_core::Rig;
use rig_core::RigNode;
use rig_core::compare;
use rig_store_sqlite::SqliteRigStore;
use tempfile::TempDir;

// ============================================================================
// SECTION: Generators
// ============================================================================

/// Randomized shape of one component in a generated graph.
#[derive(Debug, Clone)]
struct ComponentSeed {
    /// Component type.
    component_type: ComponentType,
    /// Programming language label.
    language: String,
    /// Bitmask selecting dependencies among earlier components.
    dep_mask: u8,
    /// Evidence anchor line.
    line: u8,
    /// Number of source files.
    source_count: usize,
}

fn component_type() -> impl Strategy<Value = ComponentType> {
    prop_oneof![
        Just(ComponentType::Executable),
        Just(ComponentType::SharedLibrary),
        Just(ComponentType::StaticLibrary),
        Just(ComponentType::PackageLibrary),
        Just(ComponentType::Vm),
        Just(ComponentType::Interpreted),
    ]
}

fn component_seed() -> impl Strategy<Value = ComponentSeed> {
    (
        component_type(),
        prop_oneof![Just("cxx".to_string()), Just("c".to_string()), Just("java".to_string())],
        any::<u8>(),
        1u8..=200,
        0usize..3,
    )
        .prop_map(|(component_type, language, dep_mask, line, source_count)| ComponentSeed {
            component_type,
            language,
            dep_mask,
            line,
            source_count,
        })
}

/// Builds a well-formed graph from the seeds. Component names are indexed,
/// so stable keys stay unique and dependencies always point at components
/// registered earlier (keeping the graph acyclic).
fn build_rig(seeds: &[ComponentSeed]) -> Rig {
    let mut rig = Rig::new();
    for (index, seed) in seeds.iter().enumerate() {
        let mut component = Component::new(
            NodeId::new(format!("comp-{}", index + 1)),
            format!("artifact-{index}"),
            seed.component_type,
            seed.language.clone(),
            PathBuf::from(format!("build/artifact-{index}")),
        )
        .expect("component");
        for source_index in 0..seed.source_count {
            component.source_files.push(PathBuf::from(format!("src/file-{index}-{source_index}.cpp")));
        }
        component.push_evidence(
            Evidence::from_lines(
                EvidenceId::new(format!("evidence-{}", index + 1)),
                vec![format!("CMakeLists.txt:{}", seed.line)],
            )
            .expect("evidence"),
        );
        for dep_index in 0..index {
            if (seed.dep_mask >> (dep_index % 8)) & 1 == 1 {
                component.push_dependency(NodeRef::component(format!("comp-{}", dep_index + 1)));
            }
        }
        rig.add_component(component).expect("add component");
    }
    rig
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn save_then_load_is_semantically_identical(seeds in prop::collection::vec(component_seed(), 1..6)) {
        let original = build_rig(&seeds);
        let dir = TempDir::new().expect("tempdir");
        let mut store = SqliteRigStore::open_path(&dir.path().join("rig.sqlite")).expect("open");
        store.save(&original, "property round trip").expect("save");
        let loaded = store.load().expect("load");
        prop_assert!(compare(&original, &loaded).expect("compare").is_identical());
    }

    #[test]
    fn shared_records_survive_the_trip(seeds in prop::collection::vec(component_seed(), 1..6)) {
        let original = build_rig(&seeds);
        let dir = TempDir::new().expect("tempdir");
        let mut store = SqliteRigStore::open_path(&dir.path().join("rig.sqlite")).expect("open");
        store.save(&original, "property records").expect("save");
        let loaded = store.load().expect("load");

        prop_assert_eq!(loaded.components().count(), original.components().count());
        prop_assert_eq!(loaded.evidence_records().count(), original.evidence_records().count());
        for component in original.components() {
            let reloaded = loaded.component(&component.id).expect("component by id");
            prop_assert_eq!(&reloaded.depends_on_ids, &component.depends_on_ids);
            prop_assert_eq!(&reloaded.source_files, &component.source_files);
        }
    }
}
