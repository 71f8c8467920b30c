// rig-cli/src/main.rs
// ============================================================================
// Module: RIG CLI Entry Point
// Description: Command dispatcher for extraction, validation, and compare.
// Purpose: Provide a safe, localized CLI over the graph core and stores.
// Dependencies: clap, rig-core, rig-extract-cmake, rig-store-sqlite,
//               serde_json, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `rig` binary wires the library crates together: extract a repository
//! into a SQLite database, validate a stored graph, compare two stored
//! graphs semantically, and export canonical (optionally compacted) JSON.
//! All failures map to a non-zero exit code with a single error line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use rig_core::CompareOutcome;
use rig_core::Rig;
use rig_core::Severity;
use rig_core::compact;
use rig_core::compare;
use rig_core::export_value;
use rig_core::validate;
use rig_extract_cmake::CMakeExtractor;
use rig_extract_cmake::CMakeExtractorConfig;
use rig_store_sqlite::SqliteRigStore;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rig", about = "Repository Intelligence Graph tools", arg_required_else_help = true)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: CliCommand,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Extract a CMake repository into a graph database.
    Extract {
        /// Repository root to extract.
        #[arg(long)]
        repo: PathBuf,
        /// Output SQLite database path.
        #[arg(long)]
        db: PathBuf,
        /// Build directory name under the repository root.
        #[arg(long)]
        build_dir: Option<String>,
        /// Description stored with the graph.
        #[arg(long, default_value = "RIG Export")]
        description: String,
    },
    /// Validate a stored graph and print diagnostics.
    Validate {
        /// Graph database path.
        #[arg(long)]
        db: PathBuf,
    },
    /// Compare two stored graphs semantically.
    Compare {
        /// Left graph database path.
        #[arg(long)]
        left: PathBuf,
        /// Right graph database path.
        #[arg(long)]
        right: PathBuf,
    },
    /// Export a stored graph as canonical JSON.
    Export {
        /// Graph database path.
        #[arg(long)]
        db: PathBuf,
        /// Emit the compacted `{lookups, data}` form.
        #[arg(long)]
        compact: bool,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failure wrapper carrying one printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Printable failure message.
    message: String,
}

impl CliError {
    /// Wraps any displayable error.
    fn new(err: impl std::fmt::Display) -> Self {
        Self { message: err.to_string() }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let _ = write_stderr_line(&format!("error: {err}"));
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        CliCommand::Extract { repo, db, build_dir, description } => {
            run_extract(&repo, &db, build_dir, &description)
        }
        CliCommand::Validate { db } => run_validate(&db),
        CliCommand::Compare { left, right } => run_compare(&left, &right),
        CliCommand::Export { db, compact } => run_export(&db, compact),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Extracts a repository and saves the graph.
fn run_extract(
    repo: &std::path::Path,
    db: &std::path::Path,
    build_dir: Option<String>,
    description: &str,
) -> Result<ExitCode, CliError> {
    let mut config = CMakeExtractorConfig::default();
    if let Some(build_dir) = build_dir {
        config.build_dir_name = build_dir;
    }
    let extractor = CMakeExtractor::new(config);
    let rig = extractor.extract(repo).map_err(CliError::new)?;
    let mut store = SqliteRigStore::open_path(db).map_err(CliError::new)?;
    store.save(&rig, description).map_err(CliError::new)?;
    write_stdout_line(&format!(
        "extracted {} components, {} tests -> {}",
        rig.components().count(),
        rig.tests().count(),
        db.display()
    ))
    .map_err(CliError::new)?;
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates a stored graph.
fn run_validate(db: &std::path::Path) -> Result<ExitCode, CliError> {
    let rig = load_rig(db)?;
    let diagnostics = validate(&rig);
    if diagnostics.is_empty() {
        write_stdout_line("ok: no findings").map_err(CliError::new)?;
        return Ok(ExitCode::SUCCESS);
    }
    let mut errors = 0usize;
    for diagnostic in &diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => {
                errors += 1;
                "error"
            }
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write_stdout_line(&format!(
            "{severity}: [{}] {}",
            diagnostic.category.as_str(),
            diagnostic.message
        ))
        .map_err(CliError::new)?;
    }
    Ok(if errors > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Compares two stored graphs semantically.
fn run_compare(left: &std::path::Path, right: &std::path::Path) -> Result<ExitCode, CliError> {
    let left_rig = load_rig(left)?;
    let right_rig = load_rig(right)?;
    match compare(&left_rig, &right_rig).map_err(CliError::new)? {
        CompareOutcome::Identical => {
            write_stdout_line("identical").map_err(CliError::new)?;
            Ok(ExitCode::SUCCESS)
        }
        CompareOutcome::Different(diff) => {
            write_stdout_line(&diff).map_err(CliError::new)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Exports a stored graph as canonical JSON, optionally compacted.
fn run_export(db: &std::path::Path, compact_output: bool) -> Result<ExitCode, CliError> {
    let rig = load_rig(db)?;
    let value = export_value(&rig).map_err(CliError::new)?;
    let value = if compact_output { compact(&value) } else { value };
    let rendered = serde_json::to_string_pretty(&value).map_err(CliError::new)?;
    write_stdout_line(&rendered).map_err(CliError::new)?;
    Ok(ExitCode::SUCCESS)
}

/// Opens a store and loads its single graph.
fn load_rig(db: &std::path::Path) -> Result<Rig, CliError> {
    let mut store = SqliteRigStore::open_path(db).map_err(CliError::new)?;
    store.load().map_err(CliError::new)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
