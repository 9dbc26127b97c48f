//! Boundary to the external reasoning service.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::OracleResult;
use crate::prompts;
use crate::types::{CorrectnessExplanation, PropertyLocation, Proposition};

/// One extraction call: a single file, already rendered into a prompt.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub rel_path: PathBuf,
    pub prompt: String,
}

impl ExtractionRequest {
    pub fn new(rel_path: &Path, content: &str, topic_filter: Option<&str>) -> Self {
        Self {
            rel_path: rel_path.to_path_buf(),
            prompt: prompts::extraction_prompt(content, Some(rel_path), topic_filter),
        }
    }
}

/// One checking call for a single location.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// Scan root; repository tools are confined to it.
    pub root: PathBuf,
    pub location: PropertyLocation,
    pub prompt: String,
}

impl CheckRequest {
    pub fn new(root: &Path, location: PropertyLocation) -> Self {
        let prompt = prompts::correctness_prompt(&location);
        Self {
            root: root.to_path_buf(),
            location,
            prompt,
        }
    }
}

/// Capability trait implemented by every LLM backend.
///
/// Implementations must validate responses with [`crate::schema`] and
/// return an error instead of fabricating data.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Extract propositions from one file.
    async fn extract(&self, request: &ExtractionRequest) -> OracleResult<Vec<Proposition>>;

    /// Judge the proof at one location.
    async fn check(&self, request: &CheckRequest) -> OracleResult<CorrectnessExplanation>;
}
