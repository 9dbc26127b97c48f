//! Per-file proposition extraction.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{SemkonError, SemkonResult};
use crate::oracle::{ExtractionRequest, Oracle};
use crate::types::PropertyLocation;

/// Cheap gate: does the text contain the whole word "proof" (any case)?
pub fn mentions_proof(content: &str) -> bool {
    static PROOF_WORD: OnceLock<Regex> = OnceLock::new();
    PROOF_WORD
        .get_or_init(|| Regex::new(r"(?i)\bproof\b").expect("static regex compiles"))
        .is_match(content)
}

/// Sends eligible files to the oracle and collects proposition locations.
pub struct Extractor<'a> {
    oracle: &'a dyn Oracle,
    topic_filter: Option<String>,
}

impl<'a> Extractor<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self {
            oracle,
            topic_filter: None,
        }
    }

    /// Narrow extraction to propositions matching a natural-language topic.
    pub fn with_topic_filter(mut self, filter: Option<String>) -> Self {
        self.topic_filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Extract from already-loaded content.
    ///
    /// Returns an empty list without calling the oracle when the content
    /// never mentions a proof.
    pub async fn extract_content(
        &self,
        rel_path: &Path,
        content: &str,
    ) -> SemkonResult<Vec<PropertyLocation>> {
        if !mentions_proof(content) {
            debug!(file = %rel_path.display(), "no proof keyword, skipping");
            return Ok(Vec::new());
        }

        let request = ExtractionRequest::new(rel_path, content, self.topic_filter.as_deref());
        let propositions = self
            .oracle
            .extract(&request)
            .await
            .map_err(|e| SemkonError::oracle(rel_path.display(), e))?;

        debug!(
            file = %rel_path.display(),
            found = propositions.len(),
            oracle = self.oracle.name(),
            "extracted propositions"
        );

        Ok(propositions
            .into_iter()
            .map(|p| PropertyLocation::new(rel_path, p.line_number))
            .collect())
    }

    /// Read `root/rel_path` and extract from it.
    pub async fn extract_file(
        &self,
        root: &Path,
        rel_path: &Path,
    ) -> SemkonResult<Vec<PropertyLocation>> {
        let abs = root.join(rel_path);
        let content = fs::read_to_string(&abs).map_err(|e| SemkonError::io(&abs, e))?;
        self.extract_content(rel_path, &content).await
    }
}
