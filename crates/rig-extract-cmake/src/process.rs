// rig-extract-cmake/src/process.rs
// ============================================================================
// Module: Extraction Subprocesses
// Description: Captured invocations of cmake and ctest.
// Purpose: Run build-system tools sequentially with typed failures.
// Dependencies: crate::error, std::process, std::thread, tracing
// ============================================================================

//! ## Overview
//! The pipeline blocks only at these subprocess boundaries. Configure runs
//! uncapped (it is necessarily long); introspection commands run under a
//! timeout and are killed when they exceed it. Non-zero exits surface as
//! [`ExtractError::Subprocess`] with captured stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;

use crate::error::ExtractError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Poll interval while waiting on a capped subprocess.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Renders a command line for error messages.
fn render_command(program: &str, args: &[&str]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

/// Runs a command to completion, capturing stdout.
///
/// # Errors
///
/// Returns [`ExtractError::Subprocess`] when the command cannot be spawned
/// or exits non-zero.
pub fn run_capture(
    program: &str,
    args: &[&str],
    current_dir: Option<&std::path::Path>,
) -> Result<String, ExtractError> {
    let command_line = render_command(program, args);
    debug!(command = %command_line, "running subprocess");
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = current_dir {
        command.current_dir(dir);
    }
    let output = command.output().map_err(|err| ExtractError::Subprocess {
        command: command_line.clone(),
        message: err.to_string(),
    })?;
    if !output.status.success() {
        return Err(ExtractError::Subprocess {
            command: command_line,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    String::from_utf8(output.stdout).map_err(|err| ExtractError::Subprocess {
        command: command_line,
        message: format!("non-utf8 output: {err}"),
    })
}

/// Runs a command under a wall-clock cap, killing it on expiry.
///
/// # Errors
///
/// Returns [`ExtractError::SubprocessTimeout`] when the cap expires and
/// [`ExtractError::Subprocess`] on spawn failure or non-zero exit.
pub fn run_capture_timeout(
    program: &str,
    args: &[&str],
    current_dir: Option<&std::path::Path>,
    timeout: Duration,
) -> Result<String, ExtractError> {
    let command_line = render_command(program, args);
    debug!(command = %command_line, timeout_secs = timeout.as_secs(), "running capped subprocess");
    let mut command = Command::new(program);
    command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped()).stdin(Stdio::null());
    if let Some(dir) = current_dir {
        command.current_dir(dir);
    }
    let mut child = command.spawn().map_err(|err| ExtractError::Subprocess {
        command: command_line.clone(),
        message: err.to_string(),
    })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || read_pipe(stdout_pipe));
    let stderr_reader = std::thread::spawn(move || read_pipe(stderr_pipe));

    let deadline = Instant::now() + timeout;
    let status = loop {
        let waited = child.try_wait().map_err(|err| ExtractError::Subprocess {
            command: command_line.clone(),
            message: err.to_string(),
        })?;
        if let Some(status) = waited {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractError::SubprocessTimeout {
                command: command_line,
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    };

    let stdout = join_reader(stdout_reader, &command_line)?;
    let stderr = join_reader(stderr_reader, &command_line)?;
    if !status.success() {
        return Err(ExtractError::Subprocess {
            command: command_line,
            message: stderr.trim().to_string(),
        });
    }
    Ok(stdout)
}

/// Drains a child pipe to a string, tolerating read errors as empty output.
fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buffer = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buffer);
    }
    buffer
}

/// Joins a reader thread, mapping panics into subprocess errors.
fn join_reader(
    handle: std::thread::JoinHandle<String>,
    command_line: &str,
) -> Result<String, ExtractError> {
    handle.join().map_err(|_| ExtractError::Subprocess {
        command: command_line.to_string(),
        message: "output reader thread panicked".to_string(),
    })
}

// ============================================================================
// SECTION: CMake Helpers
// ============================================================================

/// Returns the installed CMake version string, or `unknown`.
#[must_use]
pub fn cmake_version() -> String {
    run_capture("cmake", &["--version"], None).map_or_else(
        |_| "unknown".to_string(),
        |stdout| {
            stdout
                .lines()
                .next()
                .and_then(|line| line.rsplit("version").next())
                .map_or_else(|| "unknown".to_string(), |version| version.trim().to_string())
        },
    )
}
