// rig-extract-cmake/src/error.rs
// ============================================================================
// Module: CMake Extraction Errors
// Description: Typed failures raised by the CMake extraction pipeline.
// Purpose: Pinpoint the file, line, or subprocess behind each failure.
// Dependencies: rig-core, thiserror
// ============================================================================

//! ## Overview
//! Every extraction failure is typed and carries file or command context
//! where available. On any error the partially built graph is discarded; the
//! caller never observes intermediate state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use rig_core::ExtractorError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CMake extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// `cmake` configuration failed.
    #[error("cmake configure failed: {0}")]
    Configure(String),
    /// A File API reply was missing or malformed.
    #[error("cmake file api error at {}: {message}", .path.display())]
    FileApi {
        /// Offending reply path.
        path: PathBuf,
        /// Failure description.
        message: String,
    },
    /// CTest introspection failed.
    #[error("ctest introspection failed: {0}")]
    CTest(String),
    /// A CMakeLists file could not be read or parsed.
    #[error("cmakelists parse error at {}{}: {message}", .path.display(), .line.map(|l| format!(":{l}")).unwrap_or_default())]
    ListsParse {
        /// Offending file.
        path: PathBuf,
        /// Offending line, when known.
        line: Option<u32>,
        /// Failure description.
        message: String,
    },
    /// A helper subprocess exited non-zero or could not be spawned.
    #[error("subprocess '{command}' failed: {message}")]
    Subprocess {
        /// Command line that failed.
        command: String,
        /// Failure description.
        message: String,
    },
    /// A capped helper subprocess exceeded its timeout.
    #[error("subprocess '{command}' timed out after {seconds}s")]
    SubprocessTimeout {
        /// Command line that timed out.
        command: String,
        /// Configured cap in seconds.
        seconds: u64,
    },
    /// The graph engine rejected produced data (extractor bug).
    #[error("model violation: {0}")]
    Model(String),
}

impl From<ExtractError> for ExtractorError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::Configure(message) => Self::Configure(message),
            ExtractError::FileApi { path, message } => {
                Self::Introspection(format!("{}: {message}", path.display()))
            }
            ExtractError::CTest(message) => Self::Introspection(message),
            ExtractError::ListsParse { path, line, message } => Self::Parse(format!(
                "{}{}: {message}",
                path.display(),
                line.map(|value| format!(":{value}")).unwrap_or_default()
            )),
            ExtractError::Subprocess { command, message } => {
                Self::Subprocess(format!("{command}: {message}"))
            }
            ExtractError::SubprocessTimeout { command, seconds } => {
                Self::Subprocess(format!("{command}: timed out after {seconds}s"))
            }
            ExtractError::Model(message) => Self::Model(message),
        }
    }
}
