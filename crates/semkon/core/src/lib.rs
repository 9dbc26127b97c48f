//! Scan a repository for informally proven propositions and have an oracle
//! judge each proof.
//!
//! Pipeline, each stage consuming the previous stage's output:
//! - [`filter`]: eligible files under the root, honoring inherited gitignore rules.
//! - [`extract`]: per-file proposition locations, gated by a keyword pre-filter.
//! - [`check`]: one verdict per location, dispatched on a bounded worker pool.
//! - [`orchestrator`]: drives the stages and pairs verdicts with locations.
//!
//! All semantic judgment happens behind the [`Oracle`] trait.

pub mod check;
pub mod error;
pub mod extract;
pub mod filter;
pub mod format;
pub mod oracle;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod types;

pub use check::{Checker, DEFAULT_CONCURRENCY};
pub use error::{
    OracleError, OracleErrorKind, OracleResult, SchemaError, SemkonError, SemkonResult,
};
pub use extract::{mentions_proof, Extractor};
pub use filter::{eligible_files, FileFilter, IgnoreRuleSet, MAX_FILE_SIZE_BYTES};
pub use format::{format_file, split_lines};
pub use oracle::{CheckRequest, ExtractionRequest, Oracle};
pub use orchestrator::{NoProgress, ScanOptions, ScanProgress, Scanner};
pub use prompts::ToolContract;
pub use types::{
    Correctness, CorrectnessExplanation, PropertyLocation, PropertyResult, Proposition, Report,
};
