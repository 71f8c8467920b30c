// rig-extract-cmake/src/ctest.rs
// ============================================================================
// Module: CTest Introspection
// Description: ctest --show-only=json-v1 parsing and test binding.
// Purpose: Turn registered CTest tests into test definitions with evidence.
// Dependencies: crate::{error, lists_parser, process}, serde, serde_json
// ============================================================================

//! ## Overview
//! `ctest -N --show-only=json-v1` yields the registered tests plus a
//! backtrace graph locating every `add_test` call. For each test the module
//! resolves evidence from the backtrace (falling back to the parent node),
//! re-reads the spanning `add_test(...)` statement from the build file, and
//! hands the parsed command to the extractor for component binding or runner
//! synthesis.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::ExtractError;
use crate::lists_parser::expand_target_file_genex;
use crate::lists_parser::strip_quotes;
use crate::process::run_capture_timeout;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Content between the parentheses of an `add_test` statement.
static ADD_TEST_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)add_test\s*\((.*)\)").unwrap_or_else(|_| unreachable!())
});

/// Whitespace-separated tokens honoring double quotes.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:[^\s"]|"(?:\\.|[^"])*")+"#).unwrap_or_else(|_| unreachable!())
});

// ============================================================================
// SECTION: Introspection Model
// ============================================================================

/// Root of the json-v1 document.
#[derive(Debug, Clone, Deserialize)]
pub struct CTestData {
    /// Backtrace graph for all registered tests.
    #[serde(rename = "backtraceGraph")]
    pub backtrace_graph: CTestBacktraceGraph,
    /// Registered tests.
    #[serde(default)]
    pub tests: Vec<CTestInfo>,
}

/// Backtrace graph: command names, files, and parent-linked nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct CTestBacktraceGraph {
    /// Command names.
    #[serde(default)]
    pub commands: Vec<String>,
    /// File paths.
    #[serde(default)]
    pub files: Vec<String>,
    /// Backtrace nodes.
    #[serde(default)]
    pub nodes: Vec<CTestBacktraceNode>,
}

/// One backtrace node.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CTestBacktraceNode {
    /// File index.
    #[serde(default)]
    pub file: Option<usize>,
    /// Line number.
    #[serde(default)]
    pub line: Option<u32>,
    /// Command index.
    #[serde(default)]
    pub command: Option<usize>,
    /// Parent node index.
    #[serde(default)]
    pub parent: Option<usize>,
}

/// One registered test.
#[derive(Debug, Clone, Deserialize)]
pub struct CTestInfo {
    /// Test name.
    pub name: String,
    /// Backtrace node index for the defining `add_test`.
    pub backtrace: usize,
    /// Test properties, shape-preserving.
    #[serde(default)]
    pub properties: Vec<serde_json::Value>,
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Runs ctest introspection over a configured build directory.
///
/// # Errors
///
/// Returns [`ExtractError::CTest`] when the output is not valid json-v1 and
/// subprocess errors when ctest fails or exceeds the timeout.
pub fn introspect(
    repo_root: &Path,
    build_dir_name: &str,
    configuration: &str,
    timeout: Duration,
) -> Result<CTestData, ExtractError> {
    let stdout = run_capture_timeout(
        "ctest",
        &["-N", "--show-only=json-v1", "--test-dir", build_dir_name, "-C", configuration],
        Some(repo_root),
        timeout,
    )?;
    serde_json::from_str(&stdout).map_err(|err| ExtractError::CTest(err.to_string()))
}

// ============================================================================
// SECTION: Evidence Resolution
// ============================================================================

/// A resolved `file:line` evidence anchor for one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAnchor {
    /// Build file containing the `add_test` call.
    pub file: PathBuf,
    /// Line of the `add_test` call.
    pub line: u32,
}

impl TestAnchor {
    /// Renders the anchor as a `path:line` reference, repo-relative when the
    /// file lies under the repository root.
    #[must_use]
    pub fn reference(&self, repo_root: &Path) -> String {
        let path = self.file.strip_prefix(repo_root).unwrap_or(&self.file);
        format!("{}:{}", path.display(), self.line)
    }
}

/// Resolves a test's backtrace to a file and line, using the parent node as
/// a fallback when the leaf lacks either.
///
/// # Errors
///
/// Returns [`ExtractError::CTest`] when neither the node nor its parent
/// carries a file and line.
pub fn resolve_anchor(data: &CTestData, test: &CTestInfo) -> Result<TestAnchor, ExtractError> {
    let graph = &data.backtrace_graph;
    let node = graph.nodes.get(test.backtrace).ok_or_else(|| {
        ExtractError::CTest(format!("test '{}' has no backtrace node", test.name))
    })?;
    let mut file = node.file;
    let mut line = node.line;
    if (file.is_none() || line.is_none())
        && let Some(parent_index) = node.parent
        && let Some(parent) = graph.nodes.get(parent_index)
    {
        file = parent.file;
        line = parent.line;
    }
    let (Some(file_index), Some(line)) = (file, line) else {
        return Err(ExtractError::CTest(format!(
            "could not extract file/line from backtrace for test '{}'",
            test.name
        )));
    };
    let file = graph.files.get(file_index).ok_or_else(|| {
        ExtractError::CTest(format!("test '{}' backtrace file index out of range", test.name))
    })?;
    Ok(TestAnchor { file: PathBuf::from(file), line })
}

// ============================================================================
// SECTION: add_test Re-Parsing
// ============================================================================

/// Parsed `add_test` statement: name, command, and trailing arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddTest {
    /// Test name, when the NAME keyword form was used.
    pub name: Option<String>,
    /// Command token with generator expressions expanded.
    pub command: String,
    /// Trailing arguments with generator expressions expanded.
    pub args: Vec<String>,
}

/// Re-parses the spanning `add_test(...)` statement starting at an anchor.
///
/// The statement may span multiple lines; comment lines are skipped and
/// parentheses are balanced across lines.
///
/// # Errors
///
/// Returns [`ExtractError::ListsParse`] when the file cannot be read, the
/// anchor is out of range, or no parsable statement is found.
pub fn parse_add_test_at(anchor: &TestAnchor) -> Result<ParsedAddTest, ExtractError> {
    let content =
        std::fs::read_to_string(&anchor.file).map_err(|err| ExtractError::ListsParse {
            path: anchor.file.clone(),
            line: Some(anchor.line),
            message: err.to_string(),
        })?;
    let lines: Vec<&str> = content.lines().collect();
    let start = usize::try_from(anchor.line).unwrap_or(usize::MAX);
    if start == 0 || start > lines.len() {
        return Err(ExtractError::ListsParse {
            path: anchor.file.clone(),
            line: Some(anchor.line),
            message: format!("line {start} out of range"),
        });
    }

    let mut statement = String::new();
    let mut paren_depth: i64 = 0;
    let mut started = false;
    for line in &lines[start - 1..] {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        if !started && trimmed.to_lowercase().contains("add_test") {
            started = true;
        }
        if started {
            statement.push(' ');
            statement.push_str(trimmed);
            paren_depth += i64::from(count_char(trimmed, '('));
            paren_depth -= i64::from(count_char(trimmed, ')'));
            if paren_depth <= 0 && statement.contains('(') {
                break;
            }
        }
    }
    if statement.is_empty() {
        return Err(ExtractError::ListsParse {
            path: anchor.file.clone(),
            line: Some(anchor.line),
            message: "could not find add_test statement".to_string(),
        });
    }

    let body = ADD_TEST_BODY
        .captures(&statement)
        .and_then(|capture| capture.get(1))
        .ok_or_else(|| ExtractError::ListsParse {
            path: anchor.file.clone(),
            line: Some(anchor.line),
            message: format!("could not parse add_test statement: {statement}"),
        })?
        .as_str()
        .trim()
        .to_string();

    let tokens: Vec<String> =
        TOKEN.find_iter(&body).map(|token| token.as_str().to_string()).collect();
    parse_add_test_tokens(&tokens).ok_or_else(|| ExtractError::ListsParse {
        path: anchor.file.clone(),
        line: Some(anchor.line),
        message: format!("add_test statement has no command: {statement}"),
    })
}

/// Binds the NAME/COMMAND or positional token forms.
fn parse_add_test_tokens(tokens: &[String]) -> Option<ParsedAddTest> {
    let uses_name_form = tokens.iter().any(|token| token.eq_ignore_ascii_case("NAME"));
    let (name, command, args) = if uses_name_form {
        let mut name = None;
        let mut command = None;
        let mut args: Vec<String> = Vec::new();
        let mut index = 0;
        while index < tokens.len() {
            if tokens[index].eq_ignore_ascii_case("NAME") && index + 1 < tokens.len() {
                name = Some(tokens[index + 1].clone());
                index += 2;
            } else if tokens[index].eq_ignore_ascii_case("COMMAND") && index + 1 < tokens.len() {
                command = Some(tokens[index + 1].clone());
                args = tokens[index + 2..].to_vec();
                break;
            } else {
                index += 1;
            }
        }
        (name, command?, args)
    } else {
        if tokens.len() < 2 {
            return None;
        }
        (Some(tokens[0].clone()), tokens[1].clone(), tokens[2..].to_vec())
    };

    let command = strip_quotes(&expand_target_file_genex(&command)).to_string();
    let args = args
        .iter()
        .map(|arg| strip_quotes(&expand_target_file_genex(arg)).to_string())
        .collect();
    Some(ParsedAddTest { name, command, args })
}

/// Counts occurrences of a character, saturating at `u32::MAX`.
fn count_char(text: &str, needle: char) -> u32 {
    u32::try_from(text.chars().filter(|ch| *ch == needle).count()).unwrap_or(u32::MAX)
}

// ============================================================================
// SECTION: Argument File Probing
// ============================================================================

/// Returns the arguments that name readable files on disk, as given when
/// absolute and repo-root relative otherwise.
#[must_use]
pub fn existing_file_args(repo_root: &Path, args: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for arg in args {
        let candidate = PathBuf::from(arg);
        if candidate.is_absolute() {
            if candidate.is_file() {
                files.push(candidate);
            }
            continue;
        }
        if repo_root.join(&candidate).is_file() {
            files.push(candidate);
        }
    }
    files
}
