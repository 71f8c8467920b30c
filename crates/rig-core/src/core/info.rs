// rig-core/src/core/info.rs
// ============================================================================
// Module: RIG Repository and Build System Facts
// Description: Singleton repository-level and build-system-level records.
// Purpose: Anchor a graph to its repository root and producing build system.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A graph carries exactly one [`RepositoryInfo`] and one [`BuildSystemInfo`]
//! snapshot, both set by the producing extractor. Paths other than
//! `root_path` are relative to the repository root when the build layout
//! allows it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Repository Info
// ============================================================================

/// Repository-level facts recorded by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository (project) name.
    pub name: String,
    /// Absolute repository root path.
    pub root_path: PathBuf,
    /// Build directory, relative to the root where possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_directory: Option<PathBuf>,
    /// Primary artifact output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
    /// Install prefix directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_directory: Option<PathBuf>,
    /// Command line used to configure the build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configure_command: Option<String>,
    /// Command line used to build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    /// Command line used to install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    /// Command line used to run tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,
}

impl RepositoryInfo {
    /// Creates repository info with only the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, root_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            root_path,
            build_directory: None,
            output_directory: None,
            install_directory: None,
            configure_command: None,
            build_command: None,
            install_command: None,
            test_command: None,
        }
    }
}

// ============================================================================
// SECTION: Build System Info
// ============================================================================

/// Build system identity recorded by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSystemInfo {
    /// Build system name (e.g. `CMake`).
    pub name: String,
    /// Build system version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Configured build type (e.g. `Debug`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<String>,
}

impl BuildSystemInfo {
    /// Creates build system info.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        build_type: Option<String>,
    ) -> Self {
        Self { name: name.into(), version, build_type }
    }
}
