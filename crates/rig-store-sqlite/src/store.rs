// rig-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Graph Store
// Description: Normalized relational persistence for one graph per database.
// Purpose: Symmetric transactional save/load with integrity verification.
// Dependencies: rig-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The store maps the graph onto a normalized schema: one row per entity with
//! an integer primary key and a `string_id` column, plus join tables for
//! every many-to-many edge. Polymorphic references carry a `(type, id)`
//! discriminator pair. A save runs in one transaction that clears all tables
//! and re-inserts the graph together with a SHA-256 digest of its canonical
//! export; a load requires exactly one stored graph, resolves every
//! discriminator, hydrates the result, and re-verifies the digest.
//! Database contents are untrusted; loads fail closed on any mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use rig_core::BuildSystemInfo;
use rig_core::Evidence;
use rig_core::EvidenceId;
use rig_core::ExternalPackage;
use rig_core::NodeId;
use rig_core::NodeKind;
use rig_core::NodeRef;
use rig_core::PackageId;
use rig_core::PackageManager;
use rig_core::RepositoryInfo;
use rig_core::Rig;
use rig_core::core::hashing::DEFAULT_HASH_ALGORITHM;
use rig_core::core::hashing::HashAlgorithm;
use rig_core::core::hashing::hash_canonical_json;
use rig_core::core::nodes::Aggregator;
use rig_core::core::nodes::Component;
use rig_core::core::nodes::ComponentType;
use rig_core::core::nodes::RigNode;
use rig_core::core::nodes::Runner;
use rig_core::core::nodes::TestDefinition;
use rig_core::runtime::export;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Relational schema for one graph per database.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS rig_metadata (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    description TEXT NOT NULL,
    export_hash TEXT NOT NULL,
    hash_algorithm TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS repository_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    root_path TEXT NOT NULL,
    build_directory TEXT,
    output_directory TEXT,
    install_directory TEXT,
    configure_command TEXT,
    build_command TEXT,
    install_command TEXT,
    test_command TEXT
);
CREATE TABLE IF NOT EXISTS build_system_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT,
    build_type TEXT
);
CREATE TABLE IF NOT EXISTS evidence (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    line_json TEXT,
    call_stack_json TEXT
);
CREATE TABLE IF NOT EXISTS package_managers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    name TEXT NOT NULL,
    package_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS external_packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    name TEXT NOT NULL,
    package_manager_id INTEGER NOT NULL REFERENCES package_managers(id)
);
CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    programming_language TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS aggregators (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS runners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    name TEXT NOT NULL,
    arguments_json TEXT
);
CREATE TABLE IF NOT EXISTS tests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    string_id TEXT NOT NULL,
    name TEXT NOT NULL,
    test_executable_component_id INTEGER,
    test_executable_type TEXT,
    test_framework TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS node_evidence (
    node_type TEXT NOT NULL,
    node_id INTEGER NOT NULL,
    evidence_id INTEGER NOT NULL REFERENCES evidence(id)
);
CREATE TABLE IF NOT EXISTS component_dependencies (
    component_id INTEGER NOT NULL REFERENCES components(id),
    depends_on_type TEXT NOT NULL,
    depends_on_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS aggregator_dependencies (
    aggregator_id INTEGER NOT NULL REFERENCES aggregators(id),
    depends_on_type TEXT NOT NULL,
    depends_on_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS runner_dependencies (
    runner_id INTEGER NOT NULL REFERENCES runners(id),
    depends_on_type TEXT NOT NULL,
    depends_on_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS test_dependencies (
    test_id INTEGER NOT NULL REFERENCES tests(id),
    depends_on_type TEXT NOT NULL,
    depends_on_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS runner_args_nodes (
    runner_id INTEGER NOT NULL REFERENCES runners(id),
    args_node_type TEXT NOT NULL,
    args_node_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS test_components (
    test_id INTEGER NOT NULL REFERENCES tests(id),
    component_id INTEGER NOT NULL REFERENCES components(id)
);
CREATE TABLE IF NOT EXISTS test_components_being_tested (
    test_id INTEGER NOT NULL REFERENCES tests(id),
    component_id INTEGER NOT NULL REFERENCES components(id)
);
CREATE TABLE IF NOT EXISTS component_source_files (
    component_id INTEGER NOT NULL REFERENCES components(id),
    source_file_path TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS test_source_files (
    test_id INTEGER NOT NULL REFERENCES tests(id),
    source_file_path TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS component_external_packages (
    component_id INTEGER NOT NULL REFERENCES components(id),
    external_package_id INTEGER NOT NULL REFERENCES external_packages(id)
);
CREATE TABLE IF NOT EXISTS component_locations (
    component_id INTEGER NOT NULL REFERENCES components(id),
    location_path TEXT NOT NULL
);
";

/// Every table, in deletion order for the save-time clear.
const ALL_TABLES: &[&str] = &[
    "rig_metadata",
    "repository_info",
    "build_system_info",
    "node_evidence",
    "component_dependencies",
    "aggregator_dependencies",
    "runner_dependencies",
    "test_dependencies",
    "runner_args_nodes",
    "test_components",
    "test_components_being_tested",
    "component_source_files",
    "test_source_files",
    "component_external_packages",
    "component_locations",
    "tests",
    "runners",
    "aggregators",
    "components",
    "external_packages",
    "package_managers",
    "evidence",
];

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` graph store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened or created.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// `SQLite` engine error.
    #[error("store db error: {0}")]
    Db(String),
    /// Wrong number of stored graphs, digest mismatch, or bad discriminator.
    #[error("store corrupt: {0}")]
    Corrupt(String),
    /// A transaction failed to commit.
    #[error("store transaction failed: {0}")]
    Transaction(String),
    /// Stored data failed model validation.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

/// Maps `SQLite` errors into the store error space.
fn db_err(err: &rusqlite::Error) -> StoreError {
    StoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed store holding exactly one graph per database file.
#[derive(Debug)]
pub struct SqliteRigStore {
    /// Open database connection.
    connection: Connection,
}

impl SqliteRigStore {
    /// Opens (and initializes if needed) a graph store.
    ///
    /// The schema is created when the `rig_metadata` marker table is absent
    /// and preserved otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the database cannot be
    /// opened and [`StoreError::Db`] when initialization fails.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let connection = Connection::open_with_flags(&config.path, flags)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        connection
            .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| db_err(&err))?;
        connection
            .execute_batch(&format!(
                "PRAGMA foreign_keys = ON;\nPRAGMA journal_mode = {};\nPRAGMA synchronous = {};",
                config.journal_mode.pragma_value(),
                config.sync_mode.pragma_value()
            ))
            .map_err(|err| db_err(&err))?;
        let store = Self { connection };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Opens a store at a path with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] as for [`SqliteRigStore::open`].
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        Self::open(&SqliteStoreConfig::new(path))
    }

    /// Creates the schema when the marker table is absent.
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let marker: Option<String> = self
            .connection
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'rig_metadata'",
                params![],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| db_err(&err))?;
        if marker.is_none() {
            self.connection.execute_batch(SCHEMA_SQL).map_err(|err| db_err(&err))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    /// Saves a graph, replacing any graph already stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on any failure; the transaction rolls back and
    /// the database contents are unchanged.
    pub fn save(&mut self, rig: &Rig, description: &str) -> Result<(), StoreError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &export(rig))
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        let tx = self.connection.transaction().map_err(|err| db_err(&err))?;

        for table in ALL_TABLES {
            tx.execute(&format!("DELETE FROM {table}"), params![]).map_err(|err| db_err(&err))?;
        }

        tx.execute(
            "INSERT INTO rig_metadata (id, description, export_hash, hash_algorithm) VALUES (1, \
             ?1, ?2, ?3)",
            params![description, digest.value, hash_algorithm_label(digest.algorithm)],
        )
        .map_err(|err| db_err(&err))?;

        if let Some(info) = rig.repository() {
            save_repository_info(&tx, info)?;
        }
        if let Some(info) = rig.build_system() {
            save_build_system_info(&tx, info)?;
        }

        let evidence_ids = save_evidence(&tx, rig)?;
        let manager_ids = save_package_managers(&tx, rig)?;
        let package_ids = save_external_packages(&tx, rig, &manager_ids)?;
        let component_ids = save_components(&tx, rig)?;
        let aggregator_ids = save_aggregators(&tx, rig)?;
        let runner_ids = save_runners(&tx, rig)?;
        let node_ids =
            NodeIdTables { components: &component_ids, aggregators: &aggregator_ids, runners: &runner_ids };
        let test_ids = save_tests(&tx, rig, &node_ids)?;

        save_node_evidence(&tx, rig, &evidence_ids, &node_ids, &test_ids)?;
        save_dependencies(&tx, rig, &node_ids, &test_ids)?;
        save_runner_args_nodes(&tx, rig, &node_ids, &test_ids)?;
        save_test_relationships(&tx, rig, &component_ids, &test_ids)?;
        save_source_files(&tx, rig, &component_ids, &test_ids)?;
        save_component_external_packages(&tx, rig, &component_ids, &package_ids)?;
        save_component_locations(&tx, rig, &component_ids)?;

        tx.commit().map_err(|err| StoreError::Transaction(err.to_string()))
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Loads the single stored graph, fully hydrated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when the database holds zero or more
    /// than one graph or the stored digest does not match, and
    /// [`StoreError::Invalid`] when stored rows fail model validation.
    pub fn load(&mut self) -> Result<Rig, StoreError> {
        let tx = self.connection.transaction().map_err(|err| db_err(&err))?;

        let count: i64 = tx
            .query_row("SELECT COUNT(*) FROM rig_metadata", params![], |row| row.get(0))
            .map_err(|err| db_err(&err))?;
        if count == 0 {
            return Err(StoreError::Corrupt("database is empty - no graph found".to_string()));
        }
        if count > 1 {
            return Err(StoreError::Corrupt(format!(
                "database contains {count} graphs, expected 1"
            )));
        }
        let (stored_hash, stored_algorithm): (String, String) = tx
            .query_row(
                "SELECT export_hash, hash_algorithm FROM rig_metadata WHERE id = 1",
                params![],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|err| db_err(&err))?;

        let mut rig = Rig::new();
        if let Some(info) = load_repository_info(&tx)? {
            rig.set_repository_info(info);
        }
        if let Some(info) = load_build_system_info(&tx)? {
            rig.set_build_system_info(info);
        }

        let evidence_map = load_evidence(&tx)?;
        let manager_map = load_package_managers(&tx)?;
        let package_map = load_external_packages(&tx, &manager_map)?;
        let mut components = load_components(&tx)?;
        let mut aggregators = load_aggregators(&tx)?;
        let mut runners = load_runners(&tx)?;
        let mut tests = load_tests(&tx, &components, &runners)?;

        let kind_tables = LoadedNodeTables {
            components: components.iter().map(|(id, node)| (*id, node.id.clone())).collect(),
            aggregators: aggregators.iter().map(|(id, node)| (*id, node.id.clone())).collect(),
            runners: runners.iter().map(|(id, node)| (*id, node.id.clone())).collect(),
            tests: tests.iter().map(|(id, node)| (*id, node.id.clone())).collect(),
        };

        load_node_evidence(&tx, &evidence_map, &mut components, &mut aggregators, &mut runners, &mut tests)?;
        load_dependencies(&tx, &kind_tables, &mut components, &mut aggregators, &mut runners, &mut tests)?;
        load_runner_args_nodes(&tx, &kind_tables, &mut runners)?;
        load_test_relationships(&tx, &kind_tables, &mut tests)?;
        load_source_files(&tx, &mut components, &mut tests)?;
        load_component_external_packages(&tx, &package_map, &mut components)?;
        load_component_locations(&tx, &mut components)?;

        tx.commit().map_err(|err| StoreError::Transaction(err.to_string()))?;

        for record in evidence_map.values() {
            rig.register_evidence(record.clone());
        }
        for manager in manager_map.values() {
            rig.register_package_manager(manager.clone());
        }
        for package in package_map.values() {
            rig.register_external_package(package.clone())
                .map_err(|err| StoreError::Invalid(err.to_string()))?;
        }
        for component in components.into_values() {
            rig.add_component(component).map_err(|err| StoreError::Invalid(err.to_string()))?;
        }
        for aggregator in aggregators.into_values() {
            rig.add_aggregator(aggregator).map_err(|err| StoreError::Invalid(err.to_string()))?;
        }
        for runner in runners.into_values() {
            rig.add_runner(runner).map_err(|err| StoreError::Invalid(err.to_string()))?;
        }
        for test in tests.into_values() {
            rig.add_test(test).map_err(|err| StoreError::Invalid(err.to_string()))?;
        }
        rig.hydrate_all().map_err(|err| StoreError::Invalid(err.to_string()))?;

        let algorithm = parse_hash_algorithm(&stored_algorithm)?;
        let digest = hash_canonical_json(algorithm, &export(&rig))
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        if digest.value != stored_hash {
            return Err(StoreError::Corrupt("export digest mismatch".to_string()));
        }
        Ok(rig)
    }
}

// ============================================================================
// SECTION: Hash Labels
// ============================================================================

/// Returns the canonical hash algorithm label.
const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, StoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(StoreError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}

// ============================================================================
// SECTION: Save Helpers
// ============================================================================

/// Integer-id tables for the three build-node kinds during a save.
struct NodeIdTables<'a> {
    /// Component string id to row id.
    components: &'a BTreeMap<NodeId, i64>,
    /// Aggregator string id to row id.
    aggregators: &'a BTreeMap<NodeId, i64>,
    /// Runner string id to row id.
    runners: &'a BTreeMap<NodeId, i64>,
}

impl NodeIdTables<'_> {
    /// Resolves a node id to its `(type, row id)` discriminator pair.
    fn resolve(&self, id: &NodeId) -> Option<(&'static str, i64)> {
        if let Some(row) = self.components.get(id) {
            Some(("component", *row))
        } else if let Some(row) = self.aggregators.get(id) {
            Some(("aggregator", *row))
        } else {
            self.runners.get(id).map(|row| ("runner", *row))
        }
    }
}

/// Saves the repository info singleton row.
fn save_repository_info(tx: &Transaction<'_>, info: &RepositoryInfo) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO repository_info (name, root_path, build_directory, output_directory, \
         install_directory, configure_command, build_command, install_command, test_command) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            info.name,
            info.root_path.display().to_string(),
            info.build_directory.as_ref().map(|path| path.display().to_string()),
            info.output_directory.as_ref().map(|path| path.display().to_string()),
            info.install_directory.as_ref().map(|path| path.display().to_string()),
            info.configure_command,
            info.build_command,
            info.install_command,
            info.test_command,
        ],
    )
    .map_err(|err| db_err(&err))?;
    Ok(())
}

/// Saves the build system info singleton row.
fn save_build_system_info(tx: &Transaction<'_>, info: &BuildSystemInfo) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO build_system_info (name, version, build_type) VALUES (?1, ?2, ?3)",
        params![info.name, info.version, info.build_type],
    )
    .map_err(|err| db_err(&err))?;
    Ok(())
}

/// Serializes a string list column, eliding empties as NULL.
fn list_json(values: &[String]) -> Result<Option<String>, StoreError> {
    if values.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(values).map(Some).map_err(|err| StoreError::Invalid(err.to_string()))
}

/// Saves evidence rows and returns the string-id to row-id map.
fn save_evidence(tx: &Transaction<'_>, rig: &Rig) -> Result<BTreeMap<EvidenceId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for record in rig.evidence_records() {
        tx.execute(
            "INSERT INTO evidence (string_id, line_json, call_stack_json) VALUES (?1, ?2, ?3)",
            params![record.id.as_str(), list_json(&record.line)?, list_json(&record.call_stack)?],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(record.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves package manager rows and returns the string-id to row-id map.
fn save_package_managers(
    tx: &Transaction<'_>,
    rig: &Rig,
) -> Result<BTreeMap<PackageId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for manager in rig.package_managers() {
        tx.execute(
            "INSERT INTO package_managers (string_id, name, package_name) VALUES (?1, ?2, ?3)",
            params![manager.id.as_str(), manager.name, manager.package_name],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(manager.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves external package rows and returns the string-id to row-id map.
fn save_external_packages(
    tx: &Transaction<'_>,
    rig: &Rig,
    manager_ids: &BTreeMap<PackageId, i64>,
) -> Result<BTreeMap<PackageId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for package in rig.external_packages() {
        let manager_row = manager_ids.get(&package.package_manager_id).ok_or_else(|| {
            StoreError::Invalid(format!(
                "external package '{}' references unknown manager '{}'",
                package.id, package.package_manager_id
            ))
        })?;
        tx.execute(
            "INSERT INTO external_packages (string_id, name, package_manager_id) VALUES (?1, ?2, \
             ?3)",
            params![package.id.as_str(), package.name, manager_row],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(package.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves component rows and returns the string-id to row-id map.
fn save_components(tx: &Transaction<'_>, rig: &Rig) -> Result<BTreeMap<NodeId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for component in rig.components() {
        tx.execute(
            "INSERT INTO components (string_id, name, type, relative_path, \
             programming_language) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                component.id.as_str(),
                component.name,
                component.component_type.as_str(),
                component.relative_path.display().to_string(),
                component.programming_language,
            ],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(component.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves aggregator rows and returns the string-id to row-id map.
fn save_aggregators(tx: &Transaction<'_>, rig: &Rig) -> Result<BTreeMap<NodeId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for aggregator in rig.aggregators() {
        tx.execute(
            "INSERT INTO aggregators (string_id, name) VALUES (?1, ?2)",
            params![aggregator.id.as_str(), aggregator.name],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(aggregator.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves runner rows and returns the string-id to row-id map.
fn save_runners(tx: &Transaction<'_>, rig: &Rig) -> Result<BTreeMap<NodeId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for runner in rig.runners() {
        tx.execute(
            "INSERT INTO runners (string_id, name, arguments_json) VALUES (?1, ?2, ?3)",
            params![runner.id.as_str(), runner.name, list_json(&runner.arguments)?],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(runner.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves test rows and returns the string-id to row-id map.
fn save_tests(
    tx: &Transaction<'_>,
    rig: &Rig,
    node_ids: &NodeIdTables<'_>,
) -> Result<BTreeMap<NodeId, i64>, StoreError> {
    let mut map = BTreeMap::new();
    for test in rig.tests() {
        let (executable_type, executable_row) = match &test.test_executable {
            Some(executable) => match executable.kind {
                NodeKind::Component => (
                    Some("component"),
                    node_ids.components.get(&executable.id).copied(),
                ),
                NodeKind::Runner => {
                    (Some("runner"), node_ids.runners.get(&executable.id).copied())
                }
                NodeKind::Aggregator | NodeKind::Test => (None, None),
            },
            None => (None, None),
        };
        tx.execute(
            "INSERT INTO tests (string_id, name, test_executable_component_id, \
             test_executable_type, test_framework) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![test.id.as_str(), test.name, executable_row, executable_type, test.test_framework],
        )
        .map_err(|err| db_err(&err))?;
        map.insert(test.id.clone(), tx.last_insert_rowid());
    }
    Ok(map)
}

/// Saves node-evidence join rows for every node kind.
fn save_node_evidence(
    tx: &Transaction<'_>,
    rig: &Rig,
    evidence_ids: &BTreeMap<EvidenceId, i64>,
    node_ids: &NodeIdTables<'_>,
    test_ids: &BTreeMap<NodeId, i64>,
) -> Result<(), StoreError> {
    let insert = |node_type: &str, node_row: i64, ids: &std::collections::BTreeSet<EvidenceId>| {
        for evidence_id in ids {
            if let Some(evidence_row) = evidence_ids.get(evidence_id) {
                tx.execute(
                    "INSERT INTO node_evidence (node_type, node_id, evidence_id) VALUES (?1, ?2, \
                     ?3)",
                    params![node_type, node_row, evidence_row],
                )
                .map_err(|err| db_err(&err))?;
            }
        }
        Ok::<(), StoreError>(())
    };
    for component in rig.components() {
        if let Some(row) = node_ids.components.get(&component.id) {
            insert("component", *row, &component.evidence_ids)?;
        }
    }
    for aggregator in rig.aggregators() {
        if let Some(row) = node_ids.aggregators.get(&aggregator.id) {
            insert("aggregator", *row, &aggregator.evidence_ids)?;
        }
    }
    for runner in rig.runners() {
        if let Some(row) = node_ids.runners.get(&runner.id) {
            insert("runner", *row, &runner.evidence_ids)?;
        }
    }
    for test in rig.tests() {
        if let Some(row) = test_ids.get(&test.id) {
            insert("test", *row, &test.evidence_ids)?;
        }
    }
    Ok(())
}

/// Saves dependency join rows for every node kind.
fn save_dependencies(
    tx: &Transaction<'_>,
    rig: &Rig,
    node_ids: &NodeIdTables<'_>,
    test_ids: &BTreeMap<NodeId, i64>,
) -> Result<(), StoreError> {
    let insert = |table: &str, column: &str, node_row: i64, deps: &std::collections::BTreeSet<NodeId>| {
        for dep_id in deps {
            if let Some((dep_type, dep_row)) = node_ids.resolve(dep_id) {
                tx.execute(
                    &format!(
                        "INSERT INTO {table} ({column}, depends_on_type, depends_on_id) VALUES \
                         (?1, ?2, ?3)"
                    ),
                    params![node_row, dep_type, dep_row],
                )
                .map_err(|err| db_err(&err))?;
            }
        }
        Ok::<(), StoreError>(())
    };
    for component in rig.components() {
        if let Some(row) = node_ids.components.get(&component.id) {
            insert("component_dependencies", "component_id", *row, &component.depends_on_ids)?;
        }
    }
    for aggregator in rig.aggregators() {
        if let Some(row) = node_ids.aggregators.get(&aggregator.id) {
            insert("aggregator_dependencies", "aggregator_id", *row, &aggregator.depends_on_ids)?;
        }
    }
    for runner in rig.runners() {
        if let Some(row) = node_ids.runners.get(&runner.id) {
            insert("runner_dependencies", "runner_id", *row, &runner.depends_on_ids)?;
        }
    }
    for test in rig.tests() {
        if let Some(row) = test_ids.get(&test.id) {
            insert("test_dependencies", "test_id", *row, &test.depends_on_ids)?;
        }
    }
    Ok(())
}

/// Saves runner argument-node join rows.
fn save_runner_args_nodes(
    tx: &Transaction<'_>,
    rig: &Rig,
    node_ids: &NodeIdTables<'_>,
    test_ids: &BTreeMap<NodeId, i64>,
) -> Result<(), StoreError> {
    for runner in rig.runners() {
        let Some(runner_row) = node_ids.runners.get(&runner.id) else {
            continue;
        };
        for arg_id in &runner.args_nodes_ids {
            let pair = node_ids
                .resolve(arg_id)
                .or_else(|| test_ids.get(arg_id).map(|row| ("test", *row)));
            if let Some((arg_type, arg_row)) = pair {
                tx.execute(
                    "INSERT INTO runner_args_nodes (runner_id, args_node_type, args_node_id) \
                     VALUES (?1, ?2, ?3)",
                    params![runner_row, arg_type, arg_row],
                )
                .map_err(|err| db_err(&err))?;
            }
        }
    }
    Ok(())
}

/// Saves test component-set join rows.
fn save_test_relationships(
    tx: &Transaction<'_>,
    rig: &Rig,
    component_ids: &BTreeMap<NodeId, i64>,
    test_ids: &BTreeMap<NodeId, i64>,
) -> Result<(), StoreError> {
    for test in rig.tests() {
        let Some(test_row) = test_ids.get(&test.id) else {
            continue;
        };
        for component_id in &test.test_components_ids {
            if let Some(component_row) = component_ids.get(component_id) {
                tx.execute(
                    "INSERT INTO test_components (test_id, component_id) VALUES (?1, ?2)",
                    params![test_row, component_row],
                )
                .map_err(|err| db_err(&err))?;
            }
        }
        for component_id in &test.components_being_tested_ids {
            if let Some(component_row) = component_ids.get(component_id) {
                tx.execute(
                    "INSERT INTO test_components_being_tested (test_id, component_id) VALUES \
                     (?1, ?2)",
                    params![test_row, component_row],
                )
                .map_err(|err| db_err(&err))?;
            }
        }
    }
    Ok(())
}

/// Saves component and test source-file rows.
fn save_source_files(
    tx: &Transaction<'_>,
    rig: &Rig,
    component_ids: &BTreeMap<NodeId, i64>,
    test_ids: &BTreeMap<NodeId, i64>,
) -> Result<(), StoreError> {
    for component in rig.components() {
        let Some(row) = component_ids.get(&component.id) else {
            continue;
        };
        for source_file in &component.source_files {
            tx.execute(
                "INSERT INTO component_source_files (component_id, source_file_path) VALUES (?1, \
                 ?2)",
                params![row, source_file.display().to_string()],
            )
            .map_err(|err| db_err(&err))?;
        }
    }
    for test in rig.tests() {
        let Some(row) = test_ids.get(&test.id) else {
            continue;
        };
        for source_file in &test.source_files {
            tx.execute(
                "INSERT INTO test_source_files (test_id, source_file_path) VALUES (?1, ?2)",
                params![row, source_file.display().to_string()],
            )
            .map_err(|err| db_err(&err))?;
        }
    }
    Ok(())
}

/// Saves component external-package join rows.
fn save_component_external_packages(
    tx: &Transaction<'_>,
    rig: &Rig,
    component_ids: &BTreeMap<NodeId, i64>,
    package_ids: &BTreeMap<PackageId, i64>,
) -> Result<(), StoreError> {
    for component in rig.components() {
        let Some(row) = component_ids.get(&component.id) else {
            continue;
        };
        for package_id in &component.external_packages_ids {
            if let Some(package_row) = package_ids.get(package_id) {
                tx.execute(
                    "INSERT INTO component_external_packages (component_id, external_package_id) \
                     VALUES (?1, ?2)",
                    params![row, package_row],
                )
                .map_err(|err| db_err(&err))?;
            }
        }
    }
    Ok(())
}

/// Saves component location rows.
fn save_component_locations(
    tx: &Transaction<'_>,
    rig: &Rig,
    component_ids: &BTreeMap<NodeId, i64>,
) -> Result<(), StoreError> {
    for component in rig.components() {
        let Some(row) = component_ids.get(&component.id) else {
            continue;
        };
        for location in &component.locations {
            tx.execute(
                "INSERT INTO component_locations (component_id, location_path) VALUES (?1, ?2)",
                params![row, location.display().to_string()],
            )
            .map_err(|err| db_err(&err))?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Load Helpers
// ============================================================================

/// Row-id to string-id tables for every node kind during a load.
struct LoadedNodeTables {
    /// Component row id to string id.
    components: BTreeMap<i64, NodeId>,
    /// Aggregator row id to string id.
    aggregators: BTreeMap<i64, NodeId>,
    /// Runner row id to string id.
    runners: BTreeMap<i64, NodeId>,
    /// Test row id to string id.
    tests: BTreeMap<i64, NodeId>,
}

impl LoadedNodeTables {
    /// Resolves a `(type, row id)` discriminator pair to a string id.
    fn resolve(&self, node_type: &str, row: i64) -> Result<NodeId, StoreError> {
        let table = match node_type {
            "component" => &self.components,
            "aggregator" => &self.aggregators,
            "runner" => &self.runners,
            "test" => &self.tests,
            other => {
                return Err(StoreError::Corrupt(format!("unknown node discriminator: {other}")));
            }
        };
        table.get(&row).cloned().ok_or_else(|| {
            StoreError::Corrupt(format!("dangling {node_type} reference: row {row}"))
        })
    }
}

/// Loads the repository info singleton row.
fn load_repository_info(tx: &Transaction<'_>) -> Result<Option<RepositoryInfo>, StoreError> {
    tx.query_row(
        "SELECT name, root_path, build_directory, output_directory, install_directory, \
         configure_command, build_command, install_command, test_command FROM repository_info",
        params![],
        |row| {
            let name: String = row.get(0)?;
            let root_path: String = row.get(1)?;
            let build_directory: Option<String> = row.get(2)?;
            let output_directory: Option<String> = row.get(3)?;
            let install_directory: Option<String> = row.get(4)?;
            let mut info = RepositoryInfo::new(name, PathBuf::from(root_path));
            info.build_directory = build_directory.map(PathBuf::from);
            info.output_directory = output_directory.map(PathBuf::from);
            info.install_directory = install_directory.map(PathBuf::from);
            info.configure_command = row.get(5)?;
            info.build_command = row.get(6)?;
            info.install_command = row.get(7)?;
            info.test_command = row.get(8)?;
            Ok(info)
        },
    )
    .optional()
    .map_err(|err| db_err(&err))
}

/// Loads the build system info singleton row.
fn load_build_system_info(tx: &Transaction<'_>) -> Result<Option<BuildSystemInfo>, StoreError> {
    tx.query_row(
        "SELECT name, version, build_type FROM build_system_info",
        params![],
        |row| {
            let name: String = row.get(0)?;
            let version: Option<String> = row.get(1)?;
            let build_type: Option<String> = row.get(2)?;
            Ok(BuildSystemInfo::new(name, version, build_type))
        },
    )
    .optional()
    .map_err(|err| db_err(&err))
}

/// Deserializes a string-list JSON column.
fn parse_list_json(column: Option<String>) -> Result<Vec<String>, StoreError> {
    match column {
        None => Ok(Vec::new()),
        Some(text) => {
            serde_json::from_str(&text).map_err(|err| StoreError::Invalid(err.to_string()))
        }
    }
}

/// Loads evidence rows keyed by row id.
fn load_evidence(tx: &Transaction<'_>) -> Result<BTreeMap<i64, Evidence>, StoreError> {
    let mut stmt = tx
        .prepare("SELECT id, string_id, line_json, call_stack_json FROM evidence")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let line_json: Option<String> = row.get(2)?;
            let call_stack_json: Option<String> = row.get(3)?;
            Ok((id, string_id, line_json, call_stack_json))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, string_id, line_json, call_stack_json) = row.map_err(|err| db_err(&err))?;
        let record = Evidence::new(
            EvidenceId::new(string_id),
            parse_list_json(line_json)?,
            parse_list_json(call_stack_json)?,
        )
        .map_err(|err| StoreError::Invalid(err.to_string()))?;
        map.insert(id, record);
    }
    Ok(map)
}

/// Loads package manager rows keyed by row id.
fn load_package_managers(tx: &Transaction<'_>) -> Result<BTreeMap<i64, PackageManager>, StoreError> {
    let mut stmt = tx
        .prepare("SELECT id, string_id, name, package_name FROM package_managers")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let name: String = row.get(2)?;
            let package_name: String = row.get(3)?;
            Ok((id, PackageManager::new(PackageId::new(string_id), name, package_name)))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, manager) = row.map_err(|err| db_err(&err))?;
        map.insert(id, manager);
    }
    Ok(map)
}

/// Loads external package rows keyed by row id.
fn load_external_packages(
    tx: &Transaction<'_>,
    manager_map: &BTreeMap<i64, PackageManager>,
) -> Result<BTreeMap<i64, ExternalPackage>, StoreError> {
    let mut stmt = tx
        .prepare("SELECT id, string_id, name, package_manager_id FROM external_packages")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let name: String = row.get(2)?;
            let manager_row: i64 = row.get(3)?;
            Ok((id, string_id, name, manager_row))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, string_id, name, manager_row) = row.map_err(|err| db_err(&err))?;
        let manager = manager_map.get(&manager_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling package manager reference: row {manager_row}"))
        })?;
        map.insert(
            id,
            ExternalPackage::new(PackageId::new(string_id), name, manager.id.clone()),
        );
    }
    Ok(map)
}

/// Loads component rows keyed by row id.
fn load_components(tx: &Transaction<'_>) -> Result<BTreeMap<i64, Component>, StoreError> {
    let mut stmt = tx
        .prepare(
            "SELECT id, string_id, name, type, relative_path, programming_language FROM \
             components",
        )
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let name: String = row.get(2)?;
            let type_label: String = row.get(3)?;
            let relative_path: String = row.get(4)?;
            let programming_language: String = row.get(5)?;
            Ok((id, string_id, name, type_label, relative_path, programming_language))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, string_id, name, type_label, relative_path, programming_language) =
            row.map_err(|err| db_err(&err))?;
        let component_type = ComponentType::parse(&type_label)
            .ok_or_else(|| StoreError::Invalid(format!("unknown component type: {type_label}")))?;
        let component = Component::new(
            NodeId::new(string_id),
            name,
            component_type,
            programming_language,
            PathBuf::from(relative_path),
        )
        .map_err(|err| StoreError::Invalid(err.to_string()))?;
        map.insert(id, component);
    }
    Ok(map)
}

/// Loads aggregator rows keyed by row id.
fn load_aggregators(tx: &Transaction<'_>) -> Result<BTreeMap<i64, Aggregator>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT id, string_id, name FROM aggregators").map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let name: String = row.get(2)?;
            Ok((id, Aggregator::new(NodeId::new(string_id), name)))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, aggregator) = row.map_err(|err| db_err(&err))?;
        map.insert(id, aggregator);
    }
    Ok(map)
}

/// Loads runner rows keyed by row id.
fn load_runners(tx: &Transaction<'_>) -> Result<BTreeMap<i64, Runner>, StoreError> {
    let mut stmt = tx
        .prepare("SELECT id, string_id, name, arguments_json FROM runners")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let name: String = row.get(2)?;
            let arguments_json: Option<String> = row.get(3)?;
            Ok((id, string_id, name, arguments_json))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, string_id, name, arguments_json) = row.map_err(|err| db_err(&err))?;
        let runner = Runner::new(NodeId::new(string_id), name, parse_list_json(arguments_json)?);
        map.insert(id, runner);
    }
    Ok(map)
}

/// Loads test rows keyed by row id, resolving executable discriminators.
fn load_tests(
    tx: &Transaction<'_>,
    components: &BTreeMap<i64, Component>,
    runners: &BTreeMap<i64, Runner>,
) -> Result<BTreeMap<i64, TestDefinition>, StoreError> {
    let mut stmt = tx
        .prepare(
            "SELECT id, string_id, name, test_executable_component_id, test_executable_type, \
             test_framework FROM tests",
        )
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let id: i64 = row.get(0)?;
            let string_id: String = row.get(1)?;
            let name: String = row.get(2)?;
            let executable_row: Option<i64> = row.get(3)?;
            let executable_type: Option<String> = row.get(4)?;
            let test_framework: String = row.get(5)?;
            Ok((id, string_id, name, executable_row, executable_type, test_framework))
        })
        .map_err(|err| db_err(&err))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (id, string_id, name, executable_row, executable_type, test_framework) =
            row.map_err(|err| db_err(&err))?;
        let mut test = TestDefinition::new(NodeId::new(string_id), name, test_framework);
        test.test_executable = match (executable_type.as_deref(), executable_row) {
            (Some("component"), Some(row_id)) => {
                let component = components.get(&row_id).ok_or_else(|| {
                    StoreError::Corrupt(format!("dangling test executable: component row {row_id}"))
                })?;
                Some(NodeRef::component(component.id.clone()))
            }
            (Some("runner"), Some(row_id)) => {
                let runner = runners.get(&row_id).ok_or_else(|| {
                    StoreError::Corrupt(format!("dangling test executable: runner row {row_id}"))
                })?;
                Some(NodeRef::runner(runner.id.clone()))
            }
            (None, _) => None,
            (Some(other), _) => {
                return Err(StoreError::Corrupt(format!(
                    "unknown test executable discriminator: {other}"
                )));
            }
        };
        map.insert(id, test);
    }
    Ok(map)
}

/// Loads node-evidence join rows into the node id sets.
fn load_node_evidence(
    tx: &Transaction<'_>,
    evidence_map: &BTreeMap<i64, Evidence>,
    components: &mut BTreeMap<i64, Component>,
    aggregators: &mut BTreeMap<i64, Aggregator>,
    runners: &mut BTreeMap<i64, Runner>,
    tests: &mut BTreeMap<i64, TestDefinition>,
) -> Result<(), StoreError> {
    let mut stmt = tx
        .prepare("SELECT node_type, node_id, evidence_id FROM node_evidence")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let node_type: String = row.get(0)?;
            let node_row: i64 = row.get(1)?;
            let evidence_row: i64 = row.get(2)?;
            Ok((node_type, node_row, evidence_row))
        })
        .map_err(|err| db_err(&err))?;
    for row in rows {
        let (node_type, node_row, evidence_row) = row.map_err(|err| db_err(&err))?;
        let evidence_id = evidence_map
            .get(&evidence_row)
            .map(|record| record.id.clone())
            .ok_or_else(|| {
                StoreError::Corrupt(format!("dangling evidence reference: row {evidence_row}"))
            })?;
        let node: Option<&mut dyn RigNode> = match node_type.as_str() {
            "component" => components.get_mut(&node_row).map(|node| node as &mut dyn RigNode),
            "aggregator" => aggregators.get_mut(&node_row).map(|node| node as &mut dyn RigNode),
            "runner" => runners.get_mut(&node_row).map(|node| node as &mut dyn RigNode),
            "test" => tests.get_mut(&node_row).map(|node| node as &mut dyn RigNode),
            other => {
                return Err(StoreError::Corrupt(format!("unknown node discriminator: {other}")));
            }
        };
        let node = node.ok_or_else(|| {
            StoreError::Corrupt(format!("dangling {node_type} reference: row {node_row}"))
        })?;
        node.insert_evidence_id(evidence_id);
    }
    Ok(())
}

/// Loads dependency join rows into the node id sets.
fn load_dependencies(
    tx: &Transaction<'_>,
    tables: &LoadedNodeTables,
    components: &mut BTreeMap<i64, Component>,
    aggregators: &mut BTreeMap<i64, Aggregator>,
    runners: &mut BTreeMap<i64, Runner>,
    tests: &mut BTreeMap<i64, TestDefinition>,
) -> Result<(), StoreError> {
    let specs: [(&str, &str); 4] = [
        ("component_dependencies", "component_id"),
        ("aggregator_dependencies", "aggregator_id"),
        ("runner_dependencies", "runner_id"),
        ("test_dependencies", "test_id"),
    ];
    for (table, column) in specs {
        let mut stmt = tx
            .prepare(&format!("SELECT {column}, depends_on_type, depends_on_id FROM {table}"))
            .map_err(|err| db_err(&err))?;
        let rows = stmt
            .query_map(params![], |row| {
                let node_row: i64 = row.get(0)?;
                let dep_type: String = row.get(1)?;
                let dep_row: i64 = row.get(2)?;
                Ok((node_row, dep_type, dep_row))
            })
            .map_err(|err| db_err(&err))?;
        for row in rows {
            let (node_row, dep_type, dep_row) = row.map_err(|err| db_err(&err))?;
            let dep_id = tables.resolve(&dep_type, dep_row)?;
            let node: Option<&mut dyn RigNode> = match table {
                "component_dependencies" => {
                    components.get_mut(&node_row).map(|node| node as &mut dyn RigNode)
                }
                "aggregator_dependencies" => {
                    aggregators.get_mut(&node_row).map(|node| node as &mut dyn RigNode)
                }
                "runner_dependencies" => {
                    runners.get_mut(&node_row).map(|node| node as &mut dyn RigNode)
                }
                _ => tests.get_mut(&node_row).map(|node| node as &mut dyn RigNode),
            };
            let node = node.ok_or_else(|| {
                StoreError::Corrupt(format!("dangling reference in {table}: row {node_row}"))
            })?;
            node.insert_dependency_id(dep_id);
        }
    }
    Ok(())
}

/// Loads runner argument-node join rows into the runner id sets.
fn load_runner_args_nodes(
    tx: &Transaction<'_>,
    tables: &LoadedNodeTables,
    runners: &mut BTreeMap<i64, Runner>,
) -> Result<(), StoreError> {
    let mut stmt = tx
        .prepare("SELECT runner_id, args_node_type, args_node_id FROM runner_args_nodes")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let runner_row: i64 = row.get(0)?;
            let arg_type: String = row.get(1)?;
            let arg_row: i64 = row.get(2)?;
            Ok((runner_row, arg_type, arg_row))
        })
        .map_err(|err| db_err(&err))?;
    for row in rows {
        let (runner_row, arg_type, arg_row) = row.map_err(|err| db_err(&err))?;
        let arg_id = tables.resolve(&arg_type, arg_row)?;
        let runner = runners.get_mut(&runner_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling runner reference: row {runner_row}"))
        })?;
        runner.args_nodes_ids.insert(arg_id);
    }
    Ok(())
}

/// Loads test component-set join rows into the test id sets.
fn load_test_relationships(
    tx: &Transaction<'_>,
    tables: &LoadedNodeTables,
    tests: &mut BTreeMap<i64, TestDefinition>,
) -> Result<(), StoreError> {
    let specs: [(&str, bool); 2] =
        [("test_components", true), ("test_components_being_tested", false)];
    for (table, is_closure) in specs {
        let mut stmt = tx
            .prepare(&format!("SELECT test_id, component_id FROM {table}"))
            .map_err(|err| db_err(&err))?;
        let rows = stmt
            .query_map(params![], |row| {
                let test_row: i64 = row.get(0)?;
                let component_row: i64 = row.get(1)?;
                Ok((test_row, component_row))
            })
            .map_err(|err| db_err(&err))?;
        for row in rows {
            let (test_row, component_row) = row.map_err(|err| db_err(&err))?;
            let component_id = tables.resolve("component", component_row)?;
            let test = tests.get_mut(&test_row).ok_or_else(|| {
                StoreError::Corrupt(format!("dangling test reference: row {test_row}"))
            })?;
            if is_closure {
                test.test_components_ids.insert(component_id);
            } else {
                test.components_being_tested_ids.insert(component_id);
            }
        }
    }
    Ok(())
}

/// Loads source-file rows into components and tests.
fn load_source_files(
    tx: &Transaction<'_>,
    components: &mut BTreeMap<i64, Component>,
    tests: &mut BTreeMap<i64, TestDefinition>,
) -> Result<(), StoreError> {
    let mut stmt = tx
        .prepare("SELECT component_id, source_file_path FROM component_source_files ORDER BY rowid")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let component_row: i64 = row.get(0)?;
            let path: String = row.get(1)?;
            Ok((component_row, path))
        })
        .map_err(|err| db_err(&err))?;
    for row in rows {
        let (component_row, path) = row.map_err(|err| db_err(&err))?;
        let component = components.get_mut(&component_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling component reference: row {component_row}"))
        })?;
        component.source_files.push(PathBuf::from(path));
    }
    let mut stmt = tx
        .prepare("SELECT test_id, source_file_path FROM test_source_files ORDER BY rowid")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let test_row: i64 = row.get(0)?;
            let path: String = row.get(1)?;
            Ok((test_row, path))
        })
        .map_err(|err| db_err(&err))?;
    for row in rows {
        let (test_row, path) = row.map_err(|err| db_err(&err))?;
        let test = tests.get_mut(&test_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling test reference: row {test_row}"))
        })?;
        test.source_files.push(PathBuf::from(path));
    }
    Ok(())
}

/// Loads component external-package join rows into the component id sets.
fn load_component_external_packages(
    tx: &Transaction<'_>,
    package_map: &BTreeMap<i64, ExternalPackage>,
    components: &mut BTreeMap<i64, Component>,
) -> Result<(), StoreError> {
    let mut stmt = tx
        .prepare("SELECT component_id, external_package_id FROM component_external_packages")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let component_row: i64 = row.get(0)?;
            let package_row: i64 = row.get(1)?;
            Ok((component_row, package_row))
        })
        .map_err(|err| db_err(&err))?;
    for row in rows {
        let (component_row, package_row) = row.map_err(|err| db_err(&err))?;
        let package = package_map.get(&package_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling package reference: row {package_row}"))
        })?;
        let component = components.get_mut(&component_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling component reference: row {component_row}"))
        })?;
        component.external_packages_ids.insert(package.id.clone());
    }
    Ok(())
}

/// Loads component location rows.
fn load_component_locations(
    tx: &Transaction<'_>,
    components: &mut BTreeMap<i64, Component>,
) -> Result<(), StoreError> {
    let mut stmt = tx
        .prepare("SELECT component_id, location_path FROM component_locations ORDER BY rowid")
        .map_err(|err| db_err(&err))?;
    let rows = stmt
        .query_map(params![], |row| {
            let component_row: i64 = row.get(0)?;
            let path: String = row.get(1)?;
            Ok((component_row, path))
        })
        .map_err(|err| db_err(&err))?;
    for row in rows {
        let (component_row, path) = row.map_err(|err| db_err(&err))?;
        let component = components.get_mut(&component_row).ok_or_else(|| {
            StoreError::Corrupt(format!("dangling component reference: row {component_row}"))
        })?;
        component.locations.push(PathBuf::from(path));
    }
    Ok(())
}
