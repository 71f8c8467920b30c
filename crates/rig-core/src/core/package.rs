// rig-core/src/core/package.rs
// ============================================================================
// Module: RIG External Packages
// Description: Package managers and externally sourced dependencies.
// Purpose: Record dependencies a repository consumes but does not build.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! External packages are dependencies sourced from a package manager rather
//! than built by the repository. Many external packages may share one
//! manager; the link is a [`PackageId`] reference resolved through the
//! graph's package-manager map, never an owned copy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PackageId;

// ============================================================================
// SECTION: Package Manager
// ============================================================================

/// Package manager identity (e.g. `vcpkg`, `cargo`, `maven`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManager {
    /// Package record identifier.
    pub id: PackageId,
    /// Package manager name.
    pub name: String,
    /// Canonical package name used by the manager.
    pub package_name: String,
}

impl PackageManager {
    /// Creates a package manager record.
    #[must_use]
    pub fn new(
        id: PackageId,
        name: impl Into<String>,
        package_name: impl Into<String>,
    ) -> Self {
        Self { id, name: name.into(), package_name: package_name.into() }
    }
}

// ============================================================================
// SECTION: External Package
// ============================================================================

/// Dependency sourced from an external package manager.
///
/// # Invariants
/// - `package_manager_id` names a registered [`PackageManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPackage {
    /// Package record identifier.
    pub id: PackageId,
    /// External package name.
    pub name: String,
    /// Owning package manager, shared by reference.
    pub package_manager_id: PackageId,
}

impl ExternalPackage {
    /// Creates an external package record.
    #[must_use]
    pub fn new(id: PackageId, name: impl Into<String>, package_manager_id: PackageId) -> Self {
        Self { id, name: name.into(), package_manager_id }
    }
}
