// rig-core/src/core/identifiers.rs
// ============================================================================
// Module: RIG Identifiers
// Description: Canonical opaque identifiers for RIG entities and typed edges.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used throughout
//! the Repository Intelligence Graph. Identifiers are opaque and serialize as
//! strings. During an extraction run they are allocated from prefixed
//! counters (`comp-1`, `evidence-3`, ...); after normalization they are
//! content-derived stable keys. The graph never depends on counter values
//! across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier for a graph node (component, aggregator, runner, or test).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new node identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier for an evidence record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(String);

impl EvidenceId {
    /// Creates a new evidence identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EvidenceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EvidenceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier for a package manager or external package record.
///
/// # Invariants
/// - Package managers and external packages share one identifier namespace
///   (the `pkg-` counter), matching the persisted discriminator layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Creates a new package identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PackageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PackageId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Node Kinds and Edges
// ============================================================================

/// Closed set of graph node kinds.
///
/// # Invariants
/// - Variants are stable for serialization and persisted discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Buildable artifact (executable, library, package).
    Component,
    /// Virtual grouping target with no artifact and no command.
    Aggregator,
    /// Target whose semantics are "run this command".
    Runner,
    /// Registered test definition.
    Test,
}

impl NodeKind {
    /// Returns the stable discriminator label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Aggregator => "aggregator",
            Self::Runner => "runner",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed reference to a graph node.
///
/// Edges between nodes are stored as references, never as ownership: the same
/// node may appear in many parents' edges, and removing a parent does not
/// remove the child. The node itself lives in the graph's kind-specific map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Kind of the referenced node.
    pub kind: NodeKind,
    /// Identifier of the referenced node.
    pub id: NodeId,
}

impl NodeRef {
    /// Creates a new typed node reference.
    #[must_use]
    pub fn new(kind: NodeKind, id: impl Into<NodeId>) -> Self {
        Self { kind, id: id.into() }
    }

    /// Creates a reference to a component.
    #[must_use]
    pub fn component(id: impl Into<NodeId>) -> Self {
        Self::new(NodeKind::Component, id)
    }

    /// Creates a reference to an aggregator.
    #[must_use]
    pub fn aggregator(id: impl Into<NodeId>) -> Self {
        Self::new(NodeKind::Aggregator, id)
    }

    /// Creates a reference to a runner.
    #[must_use]
    pub fn runner(id: impl Into<NodeId>) -> Self {
        Self::new(NodeKind::Runner, id)
    }

    /// Creates a reference to a test.
    #[must_use]
    pub fn test(id: impl Into<NodeId>) -> Self {
        Self::new(NodeKind::Test, id)
    }
}

// ============================================================================
// SECTION: Identifier Allocation
// ============================================================================

/// Allocator for prefixed extraction-time identifiers.
///
/// Six monotone counters, one per prefix. Counters are scoped to a single
/// extraction run; persisted or compared graphs must go through stable-key
/// normalization instead of relying on counter values.
#[derive(Debug, Default)]
pub struct IdAllocator {
    /// Next `comp-` ordinal.
    component: u64,
    /// Next `agg-` ordinal.
    aggregator: u64,
    /// Next `runner-` ordinal.
    runner: u64,
    /// Next `test-` ordinal.
    test: u64,
    /// Next `pkg-` ordinal (shared by package managers and external packages).
    package: u64,
    /// Next `evidence-` ordinal.
    evidence: u64,
}

impl IdAllocator {
    /// Creates an allocator with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next component identifier (`comp-N`).
    pub fn next_component(&mut self) -> NodeId {
        self.component += 1;
        NodeId::new(format!("comp-{}", self.component))
    }

    /// Allocates the next aggregator identifier (`agg-N`).
    pub fn next_aggregator(&mut self) -> NodeId {
        self.aggregator += 1;
        NodeId::new(format!("agg-{}", self.aggregator))
    }

    /// Allocates the next runner identifier (`runner-N`).
    pub fn next_runner(&mut self) -> NodeId {
        self.runner += 1;
        NodeId::new(format!("runner-{}", self.runner))
    }

    /// Allocates the next test identifier (`test-N`).
    pub fn next_test(&mut self) -> NodeId {
        self.test += 1;
        NodeId::new(format!("test-{}", self.test))
    }

    /// Allocates the next package identifier (`pkg-N`).
    pub fn next_package(&mut self) -> PackageId {
        self.package += 1;
        PackageId::new(format!("pkg-{}", self.package))
    }

    /// Allocates the next evidence identifier (`evidence-N`).
    pub fn next_evidence(&mut self) -> EvidenceId {
        self.evidence += 1;
        EvidenceId::new(format!("evidence-{}", self.evidence))
    }
}
