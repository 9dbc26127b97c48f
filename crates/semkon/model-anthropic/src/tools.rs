//! Read-only repository tools offered to the checking agent.
//!
//! Every path argument is resolved against the scan root and must stay inside
//! it after symlinks are resolved.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use semkon_core::{split_lines, FileFilter, ToolContract};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::retry::truncate;

pub const READ_FILE: &str = "read_file";
pub const LIST_DIRECTORY: &str = "list_directory";
pub const SEARCH_FILES: &str = "search_files";

/// Longest tool output handed back to the model, in characters.
const MAX_OUTPUT_CHARS: usize = 60_000;
const MAX_SEARCH_MATCHES: usize = 200;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid input for {tool}: {reason}")]
    InvalidInput { tool: &'static str, reason: String },

    #[error("path escapes the repository: {0}")]
    OutsideRoot(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadFileInput {
    path: String,
    #[serde(default)]
    start_line: Option<usize>,
    #[serde(default)]
    end_line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListDirectoryInput {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchFilesInput {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
}

/// Repository tools bound to one scan root.
#[derive(Debug, Clone)]
pub struct RepoTools {
    root: PathBuf,
}

impl RepoTools {
    pub fn new(root: &Path) -> Result<Self, ToolError> {
        let root = root.canonicalize().map_err(|source| ToolError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn contracts() -> Vec<ToolContract> {
        vec![
            ToolContract {
                name: READ_FILE.into(),
                description: "Read a text file from the repository. Lines are prefixed with \
                    their 1-based line numbers. Optionally restrict to an inclusive line range."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "required": ["path"],
                    "properties": {
                        "path": {"type": "string", "description": "Path relative to the repository root"},
                        "start_line": {"type": "integer", "minimum": 1},
                        "end_line": {"type": "integer", "minimum": 1}
                    },
                    "additionalProperties": false
                }),
            },
            ToolContract {
                name: LIST_DIRECTORY.into(),
                description: "List the entries of a repository directory. Directories end with '/'."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Directory relative to the repository root; defaults to the root"}
                    },
                    "additionalProperties": false
                }),
            },
            ToolContract {
                name: SEARCH_FILES.into(),
                description: "Search repository text files for a regular expression. \
                    Returns matching lines as path:line: text. Ignored files are skipped."
                    .into(),
                input_schema: json!({
                    "type": "object",
                    "required": ["pattern"],
                    "properties": {
                        "pattern": {"type": "string"},
                        "path": {"type": "string", "description": "Restrict the search to this subdirectory"}
                    },
                    "additionalProperties": false
                }),
            },
        ]
    }

    /// Run one tool call and return its text output.
    pub fn execute(&self, name: &str, input: &Value) -> Result<String, ToolError> {
        let output = match name {
            READ_FILE => self.read_file(parse_input(READ_FILE, input)?)?,
            LIST_DIRECTORY => self.list_directory(parse_input(LIST_DIRECTORY, input)?)?,
            SEARCH_FILES => self.search_files(parse_input(SEARCH_FILES, input)?)?,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(truncate(&output, MAX_OUTPUT_CHARS))
    }

    fn resolve(&self, rel: &str) -> Result<PathBuf, ToolError> {
        let rel = rel.trim();
        if Path::new(rel).is_absolute() {
            return Err(ToolError::OutsideRoot(rel.to_string()));
        }
        let joined = self.root.join(rel);
        let resolved = joined.canonicalize().map_err(|source| ToolError::Io {
            path: rel.to_string(),
            source,
        })?;
        if !resolved.starts_with(&self.root) {
            return Err(ToolError::OutsideRoot(rel.to_string()));
        }
        Ok(resolved)
    }

    fn read_file(&self, input: ReadFileInput) -> Result<String, ToolError> {
        let path = self.resolve(&input.path)?;
        let content = fs::read_to_string(&path).map_err(|source| ToolError::Io {
            path: input.path.clone(),
            source,
        })?;

        let lines = split_lines(&content);
        let start = input.start_line.unwrap_or(1).max(1);
        let end = input.end_line.unwrap_or(lines.len()).min(lines.len());
        if lines.is_empty() || start > end {
            return Ok(format!("{} has {} lines; nothing in range", input.path, lines.len()));
        }

        let width = end.to_string().len();
        Ok(lines[start - 1..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>width$} | {}", start + i, line))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn list_directory(&self, input: ListDirectoryInput) -> Result<String, ToolError> {
        let rel = input.path.unwrap_or_else(|| ".".to_string());
        let dir = self.resolve(&rel)?;
        let io_err = |source| ToolError::Io {
            path: rel.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();
        Ok(entries.join("\n"))
    }

    fn search_files(&self, input: SearchFilesInput) -> Result<String, ToolError> {
        let regex = Regex::new(&input.pattern)?;
        let scope = match input.path.as_deref() {
            Some(p) if !p.trim().is_empty() => Some(self.resolve(p)?),
            _ => None,
        };

        let files = FileFilter::new(&self.root, &[] as &[&str])
            .and_then(|filter| filter.eligible_files())
            .map_err(|e| ToolError::InvalidInput {
                tool: SEARCH_FILES,
                reason: e.to_string(),
            })?;

        let mut matches = Vec::new();
        'files: for rel in files {
            let abs = self.root.join(&rel);
            if scope.as_ref().is_some_and(|s| !abs.starts_with(s)) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&abs) else {
                continue;
            };
            for (i, line) in split_lines(&content).into_iter().enumerate() {
                if regex.is_match(line) {
                    matches.push(format!("{}:{}: {}", rel.display(), i + 1, line));
                    if matches.len() >= MAX_SEARCH_MATCHES {
                        matches.push(format!("(stopped after {MAX_SEARCH_MATCHES} matches)"));
                        break 'files;
                    }
                }
            }
        }

        if matches.is_empty() {
            return Ok("no matches".to_string());
        }
        Ok(matches.join("\n"))
    }
}

fn parse_input<T: serde::de::DeserializeOwned>(
    tool: &'static str,
    input: &Value,
) -> Result<T, ToolError> {
    T::deserialize(input).map_err(|e| ToolError::InvalidInput {
        tool,
        reason: e.to_string(),
    })
}
