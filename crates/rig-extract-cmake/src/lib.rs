// rig-extract-cmake/src/lib.rs
// ============================================================================
// Module: RIG CMake Extractor Library
// Description: Public API surface for the CMake extraction pipeline.
// Purpose: Expose the extractor, its configuration, and parsing submodules.
// Dependencies: crate submodules
// ============================================================================

//! ## Overview
//! `rig-extract-cmake` turns a CMake repository into a Repository
//! Intelligence Graph. It combines three deterministic readers: the CMake
//! File API (configured project model), a regex-level CMakeLists parser for
//! the metadata the File API omits, and `ctest --show-only=json-v1` for
//! registered tests. Extraction is strictly sequential and offline except
//! for the `cmake`/`ctest` subprocess boundaries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod classify;
pub mod ctest;
pub mod error;
pub mod extractor;
pub mod file_api;
pub mod lists_parser;
pub mod process;
pub mod runtime_deps;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ExtractError;
pub use extractor::CMakeExtractor;
pub use extractor::CMakeExtractorConfig;
pub use extractor::DEFAULT_BUILD_DIR;
pub use extractor::ExtractionState;
pub use lists_parser::CMakeListsParser;
