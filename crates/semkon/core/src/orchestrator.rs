//! End-to-end scan: filter, extract, check, aggregate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::check::{Checker, DEFAULT_CONCURRENCY};
use crate::error::SemkonResult;
use crate::extract::Extractor;
use crate::filter::FileFilter;
use crate::oracle::Oracle;
use crate::types::{CorrectnessExplanation, PropertyLocation, Report};

/// Observer for operational progress. All methods default to no-ops.
pub trait ScanProgress: Send + Sync {
    fn files_discovered(&self, _count: usize) {}
    fn file_scanned(&self, _rel_path: &Path, _found: usize) {}
    fn checks_started(&self, _count: usize) {}
    fn check_finished(&self, _location: &PropertyLocation, _verdict: &CorrectnessExplanation) {}
    fn finished(&self, _report: &Report) {}
}

/// Progress observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ScanProgress for NoProgress {}

/// Knobs for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Gitignore-style patterns relative to the root.
    pub filter_paths: Vec<String>,
    /// Natural-language topic narrowing extraction.
    pub topic_filter: Option<String>,
    /// Check pool size.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            filter_paths: Vec::new(),
            topic_filter: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Drives a full scan against one oracle.
pub struct Scanner {
    oracle: Arc<dyn Oracle>,
    options: ScanOptions,
    progress: Arc<dyn ScanProgress>,
}

impl Scanner {
    pub fn new(oracle: Arc<dyn Oracle>, options: ScanOptions) -> Self {
        Self {
            oracle,
            options,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ScanProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Eligible files under `root`.
    pub fn eligible_files(&self, root: &Path) -> SemkonResult<Vec<PathBuf>> {
        FileFilter::new(root, self.options.filter_paths.as_slice())?.eligible_files()
    }

    /// Filter and extract: every proposition location, in discovery order.
    pub async fn discover(&self, root: &Path) -> SemkonResult<Vec<PropertyLocation>> {
        let files = self.eligible_files(root)?;
        info!(files = files.len(), "searching for properties in files");
        self.progress.files_discovered(files.len());

        let extractor = Extractor::new(self.oracle.as_ref())
            .with_topic_filter(self.options.topic_filter.clone());

        let mut locations = Vec::new();
        for rel_path in &files {
            let found = extractor.extract_file(root, rel_path).await?;
            self.progress.file_scanned(rel_path, found.len());
            locations.extend(found);
        }
        Ok(locations)
    }

    /// Run the whole pipeline and build the report.
    pub async fn run(&self, root: &Path) -> SemkonResult<Report> {
        let locations = self.discover(root).await?;

        info!(propositions = locations.len(), "checking proofs");
        self.progress.checks_started(locations.len());

        let checker = Checker::new(Arc::clone(&self.oracle), root)
            .with_concurrency(self.options.concurrency);
        let verdicts = checker.check_all(&locations, self.progress.as_ref()).await?;

        let report = Report::from_pairs(locations, verdicts);
        self.progress.finished(&report);
        Ok(report)
    }
}
