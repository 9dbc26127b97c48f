//! Data model shared by every stage of a scan.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a proposition's statement begins inside the scanned tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyLocation {
    /// Path relative to the scan root.
    #[serde(rename = "rel_path")]
    pub relative_path: PathBuf,
    /// 1-based line number, as reported by the extraction oracle.
    #[serde(rename = "line_num")]
    pub line_number: u64,
}

impl PropertyLocation {
    pub fn new(relative_path: impl Into<PathBuf>, line_number: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            line_number,
        }
    }
}

impl fmt::Display for PropertyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.relative_path.display(), self.line_number)
    }
}

/// A proposition as returned by the extraction oracle.
///
/// Only the line number survives past extraction; statement and proof text
/// are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Proposition {
    #[serde(rename = "line_num")]
    pub line_number: u64,
    #[serde(rename = "statement")]
    pub statement_text: String,
    #[serde(rename = "proof")]
    pub proof_text: String,
}

/// Verdict on a single proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correctness {
    Correct,
    Incorrect,
    Unknown,
}

impl Correctness {
    pub const ALL: [Correctness; 3] = [
        Correctness::Correct,
        Correctness::Incorrect,
        Correctness::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Correctness::Correct => "correct",
            Correctness::Incorrect => "incorrect",
            Correctness::Unknown => "unknown",
        }
    }

    pub fn is_correct(self) -> bool {
        matches!(self, Correctness::Correct)
    }
}

impl fmt::Display for Correctness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checker output for exactly one [`PropertyLocation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrectnessExplanation {
    pub correctness: Correctness,
    pub explanation: String,
}

impl CorrectnessExplanation {
    pub fn new(correctness: Correctness, explanation: impl Into<String>) -> Self {
        Self {
            correctness,
            explanation: explanation.into(),
        }
    }
}

/// One record of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyResult {
    pub property_location: PropertyLocation,
    pub correctness_explanation: CorrectnessExplanation,
}

/// Aggregated scan output, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    pub results: Vec<PropertyResult>,
}

impl Report {
    /// Pair locations with verdicts by position.
    ///
    /// Both slices must have the same length; the orchestrator guarantees it.
    pub fn from_pairs(
        locations: Vec<PropertyLocation>,
        verdicts: Vec<CorrectnessExplanation>,
    ) -> Self {
        debug_assert_eq!(locations.len(), verdicts.len());
        let results = locations
            .into_iter()
            .zip(verdicts)
            .map(|(property_location, correctness_explanation)| PropertyResult {
                property_location,
                correctness_explanation,
            })
            .collect();
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when every verdict is "correct". An empty report passes.
    pub fn all_correct(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.correctness_explanation.correctness.is_correct())
    }

    /// Process exit code for this report: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_correct() {
            0
        } else {
            1
        }
    }

    /// Count of verdicts per correctness value.
    pub fn tally(&self) -> [(Correctness, usize); 3] {
        Correctness::ALL.map(|c| {
            let n = self
                .results
                .iter()
                .filter(|r| r.correctness_explanation.correctness == c)
                .count();
            (c, n)
        })
    }
}
