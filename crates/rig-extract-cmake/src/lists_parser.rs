// rig-extract-cmake/src/lists_parser.rs
// ============================================================================
// Module: CMakeLists Subset Parser
// Description: Regex-level parser for the commands the File API omits.
// Purpose: Recover custom targets, find_package, add_test, link libraries,
//          and output directories directly from build files.
// Dependencies: crate::error, regex, walkdir
// ============================================================================

//! ## Overview
//! The File API is preferred wherever it carries the needed data; this
//! parser is the fallback for properties and metadata it does not expose.
//! The supported subset is exactly: `add_custom_target`, `add_jar`,
//! `find_package`, `add_test` (both syntaxes), `target_link_libraries`, and
//! `set(CMAKE_*_OUTPUT_DIRECTORY ...)`. The tokenizer handles quoted
//! strings, nested parentheses, multi-line calls, and
//! `$<TARGET_FILE:tgt>` generator expressions. Unusual formatting outside
//! this subset is not supported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::ExtractError;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// `add_custom_target(<name> ...)`.
static ADD_CUSTOM_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)add_custom_target\s*\(\s*([\w.-]+)\s*(.*?)\)").unwrap_or_else(|_| unreachable!())
});

/// `add_jar(<name-or-variable> ...)`.
static ADD_JAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)add_jar\s*\(\s*(\$\{[^}]+\}|[\w.-]+)").unwrap_or_else(|_| unreachable!())
});

/// `find_package(<name> ...)`.
static FIND_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)find_package\s*\(\s*([\w-]+)\s*(.*?)\)").unwrap_or_else(|_| unreachable!())
});

/// `add_test(NAME <name> ...)`.
static ADD_TEST_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)add_test\s*\(\s*NAME\s+([\w-]+)\s+(.*?)\)").unwrap_or_else(|_| unreachable!())
});

/// `target_link_libraries(<target> ...)`.
static TARGET_LINK_LIBRARIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)target_link_libraries\s*\(\s*([\w-]+)\s+(.*?)\)")
        .unwrap_or_else(|_| unreachable!())
});

/// `set(CMAKE_<kind>_OUTPUT_DIRECTORY <value>)`.
static OUTPUT_DIRECTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)set\s*\(\s*(CMAKE_\w+_OUTPUT_DIRECTORY)\s+(.*?)\)")
        .unwrap_or_else(|_| unreachable!())
});

/// `$<TARGET_FILE:tgt>` generator expression.
static TARGET_FILE_GENEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$<TARGET_FILE:([^>]+)>").unwrap_or_else(|_| unreachable!()));

/// Keywords that open a parameter bucket in supported commands.
const PARAMETER_KEYWORDS: &[&str] = &[
    "COMMAND",
    "DEPENDS",
    "OUTPUT",
    "BYPRODUCTS",
    "COMPONENTS",
    "REQUIRED",
    "WORKING_DIRECTORY",
    "NAME",
];

// ============================================================================
// SECTION: Records
// ============================================================================

/// Parsed `add_custom_target` (or `add_jar`) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTarget {
    /// Target name as written (may be a `${...}` variable).
    pub name: String,
    /// Defining file.
    pub file: PathBuf,
    /// Defining line.
    pub line: u32,
    /// Keyword parameter buckets.
    pub parameters: BTreeMap<String, Vec<String>>,
    /// True when a COMMAND bucket is present.
    pub has_commands: bool,
    /// True when a DEPENDS bucket is present.
    pub has_depends: bool,
    /// True when an OUTPUT bucket is present.
    pub has_output: bool,
    /// True when a BYPRODUCTS bucket is present.
    pub has_byproducts: bool,
    /// True when the target was declared via `add_jar`.
    pub is_jar: bool,
}

/// Parsed `find_package` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindPackage {
    /// Package name.
    pub name: String,
    /// Defining file.
    pub file: PathBuf,
    /// Defining line.
    pub line: u32,
    /// True when REQUIRED was present.
    pub is_required: bool,
    /// COMPONENTS bucket values.
    pub components: Vec<String>,
}

/// Parsed `add_test(NAME ...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTest {
    /// Test name.
    pub name: String,
    /// Defining file.
    pub file: PathBuf,
    /// Defining line.
    pub line: u32,
    /// COMMAND bucket values.
    pub command: Vec<String>,
    /// WORKING_DIRECTORY value.
    pub working_directory: Option<String>,
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Aggregated results of parsing every build file under a source tree.
#[derive(Debug, Default, Clone)]
pub struct CMakeListsParser {
    /// Custom targets by name.
    pub custom_targets: BTreeMap<String, CustomTarget>,
    /// All `find_package` records in parse order.
    pub find_packages: Vec<FindPackage>,
    /// All named `add_test` records in parse order.
    pub add_tests: Vec<AddTest>,
    /// Link-library tokens by target name.
    pub link_libraries: BTreeMap<String, Vec<String>>,
    /// Output-directory cache variables by name.
    pub output_directories: BTreeMap<String, String>,
}

impl CMakeListsParser {
    /// Parses every `CMakeLists.txt` and `*.cmake` file under the source
    /// directory, skipping the build directory and VCS metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::ListsParse`] when no build files exist or a
    /// build file cannot be read.
    pub fn parse_tree(source_dir: &Path, skip_dir: Option<&str>) -> Result<Self, ExtractError> {
        let mut parser = Self::default();
        let mut seen_any = false;
        let walker = WalkDir::new(source_dir).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(name == ".git" || skip_dir.is_some_and(|skip| name == skip))
        });
        for entry in walker {
            let entry = entry.map_err(|err| ExtractError::ListsParse {
                path: source_dir.to_path_buf(),
                line: None,
                message: err.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name == "CMakeLists.txt" || name.ends_with(".cmake") {
                seen_any = true;
                parser.parse_file(entry.path())?;
            }
        }
        if !seen_any {
            return Err(ExtractError::ListsParse {
                path: source_dir.to_path_buf(),
                line: None,
                message: "no CMakeLists.txt or *.cmake files found".to_string(),
            });
        }
        Ok(parser)
    }

    /// Parses one build file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::ListsParse`] when the file cannot be read.
    pub fn parse_file(&mut self, path: &Path) -> Result<(), ExtractError> {
        let content = std::fs::read_to_string(path).map_err(|err| ExtractError::ListsParse {
            path: path.to_path_buf(),
            line: None,
            message: err.to_string(),
        })?;
        self.parse_content(&content, path);
        Ok(())
    }

    /// Parses the content of one build file.
    pub fn parse_content(&mut self, content: &str, path: &Path) {
        self.parse_custom_targets(content, path);
        self.parse_add_jar(content, path);
        self.parse_find_packages(content, path);
        self.parse_add_tests(content, path);
        self.parse_link_libraries(content);
        self.parse_output_directories(content);
    }

    /// Collects `add_custom_target` calls.
    fn parse_custom_targets(&mut self, content: &str, path: &Path) {
        for capture in ADD_CUSTOM_TARGET.captures_iter(content) {
            let (Some(whole), Some(name), Some(params)) =
                (capture.get(0), capture.get(1), capture.get(2))
            else {
                continue;
            };
            let parameters = parse_parameters(params.as_str());
            self.custom_targets.insert(
                name.as_str().to_string(),
                CustomTarget {
                    name: name.as_str().to_string(),
                    file: path.to_path_buf(),
                    line: line_of(content, whole.start()),
                    has_commands: parameters.contains_key("COMMAND"),
                    has_depends: parameters.contains_key("DEPENDS"),
                    has_output: parameters.contains_key("OUTPUT"),
                    has_byproducts: parameters.contains_key("BYPRODUCTS"),
                    parameters,
                    is_jar: false,
                },
            );
        }
    }

    /// Collects `add_jar` calls as jar-flagged custom targets.
    fn parse_add_jar(&mut self, content: &str, path: &Path) {
        for capture in ADD_JAR.captures_iter(content) {
            let (Some(whole), Some(name)) = (capture.get(0), capture.get(1)) else {
                continue;
            };
            self.custom_targets.insert(
                name.as_str().to_string(),
                CustomTarget {
                    name: name.as_str().to_string(),
                    file: path.to_path_buf(),
                    line: line_of(content, whole.start()),
                    parameters: BTreeMap::new(),
                    has_commands: false,
                    has_depends: false,
                    has_output: true,
                    has_byproducts: false,
                    is_jar: true,
                },
            );
        }
    }

    /// Collects `find_package` calls.
    fn parse_find_packages(&mut self, content: &str, path: &Path) {
        for capture in FIND_PACKAGE.captures_iter(content) {
            let (Some(whole), Some(name), Some(params)) =
                (capture.get(0), capture.get(1), capture.get(2))
            else {
                continue;
            };
            let parameters = parse_parameters(params.as_str());
            self.find_packages.push(FindPackage {
                name: name.as_str().to_string(),
                file: path.to_path_buf(),
                line: line_of(content, whole.start()),
                is_required: parameters.contains_key("REQUIRED")
                    || params.as_str().to_uppercase().split_whitespace().any(|t| t == "REQUIRED"),
                components: parameters.get("COMPONENTS").cloned().unwrap_or_default(),
            });
        }
    }

    /// Collects `add_test(NAME ...)` calls.
    fn parse_add_tests(&mut self, content: &str, path: &Path) {
        for capture in ADD_TEST_NAMED.captures_iter(content) {
            let (Some(whole), Some(name), Some(params)) =
                (capture.get(0), capture.get(1), capture.get(2))
            else {
                continue;
            };
            let parameters = parse_parameters(params.as_str());
            self.add_tests.push(AddTest {
                name: name.as_str().to_string(),
                file: path.to_path_buf(),
                line: line_of(content, whole.start()),
                command: parameters.get("COMMAND").cloned().unwrap_or_default(),
                working_directory: parameters
                    .get("WORKING_DIRECTORY")
                    .and_then(|values| values.first().cloned()),
            });
        }
    }

    /// Collects `target_link_libraries` tokens per target.
    fn parse_link_libraries(&mut self, content: &str) {
        for capture in TARGET_LINK_LIBRARIES.captures_iter(content) {
            let (Some(name), Some(libraries)) = (capture.get(1), capture.get(2)) else {
                continue;
            };
            self.link_libraries
                .entry(name.as_str().to_string())
                .or_default()
                .extend(tokenize(libraries.as_str()));
        }
    }

    /// Collects `CMAKE_*_OUTPUT_DIRECTORY` assignments.
    fn parse_output_directories(&mut self, content: &str) {
        for capture in OUTPUT_DIRECTORY.captures_iter(content) {
            let (Some(name), Some(value)) = (capture.get(1), capture.get(2)) else {
                continue;
            };
            let value = strip_quotes(value.as_str().trim()).to_string();
            self.output_directories.insert(name.as_str().to_string(), value);
        }
    }

    /// Returns the custom-target record for a name.
    #[must_use]
    pub fn custom_target(&self, name: &str) -> Option<&CustomTarget> {
        self.custom_targets.get(name)
    }

    /// Returns the first `find_package` record for a package name,
    /// case-insensitively.
    #[must_use]
    pub fn find_package(&self, name: &str) -> Option<&FindPackage> {
        self.find_packages.iter().find(|record| record.name.eq_ignore_ascii_case(name))
    }

    /// Returns the link-library tokens recorded for a target.
    #[must_use]
    pub fn target_link_libraries(&self, target: &str) -> &[String] {
        self.link_libraries.get(target).map_or(&[], Vec::as_slice)
    }

    /// Returns the output directory recorded for a directory kind
    /// (`RUNTIME`, `LIBRARY`, `ARCHIVE`).
    #[must_use]
    pub fn output_directory(&self, kind: &str) -> Option<&str> {
        self.output_directories.get(&format!("CMAKE_{kind}_OUTPUT_DIRECTORY")).map(String::as_str)
    }
}

// ============================================================================
// SECTION: Tokenization
// ============================================================================

/// Splits a parameter string into keyword buckets.
fn parse_parameters(params: &str) -> BTreeMap<String, Vec<String>> {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current_key: Option<String> = None;
    let mut current_values: Vec<String> = Vec::new();
    for token in tokenize(params) {
        let upper = token.to_uppercase();
        if PARAMETER_KEYWORDS.contains(&upper.as_str()) {
            if let Some(key) = current_key.take() {
                buckets.insert(key, std::mem::take(&mut current_values));
            }
            current_key = Some(upper);
        } else {
            current_values.push(token);
        }
    }
    if let Some(key) = current_key {
        buckets.insert(key, current_values);
    }
    buckets
}

/// Tokenizes a CMake argument string, honoring quotes and escapes.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';
    let mut previous = '\0';
    for ch in text.chars() {
        if in_quotes {
            current.push(ch);
            if ch == quote_char && previous != '\\' {
                in_quotes = false;
            }
        } else if ch == '"' || ch == '\'' {
            in_quotes = true;
            quote_char = ch;
            current.push(ch);
        } else if ch.is_whitespace() {
            push_token(&mut tokens, &mut current);
        } else {
            current.push(ch);
        }
        previous = ch;
    }
    push_token(&mut tokens, &mut current);
    tokens
}

/// Pushes a trimmed, non-empty token.
fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        tokens.push(trimmed.to_string());
    }
    current.clear();
}

/// Strips one level of matching quotes.
#[must_use]
pub fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Expands a `$<TARGET_FILE:tgt>` generator expression to the target name,
/// returning other tokens unchanged.
#[must_use]
pub fn expand_target_file_genex(token: &str) -> String {
    TARGET_FILE_GENEX
        .captures(token)
        .and_then(|capture| capture.get(1))
        .map_or_else(|| token.to_string(), |target| target.as_str().to_string())
}

/// Returns the 1-based line number of a byte offset.
fn line_of(content: &str, offset: usize) -> u32 {
    let newlines = content[..offset].bytes().filter(|byte| *byte == b'\n').count();
    u32::try_from(newlines + 1).unwrap_or(u32::MAX)
}
