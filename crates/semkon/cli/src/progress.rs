//! Terminal progress for a scan

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use semkon_core::{CorrectnessExplanation, PropertyLocation, Report, ScanProgress};

const TEMPLATE: &str = "{spinner:.green} {prefix:>9} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}";

/// Progress bar on stderr, reused for the scanning and checking phases.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    /// Remove the bar, e.g. before reporting a fatal error.
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress for BarProgress {
    fn files_discovered(&self, count: usize) {
        self.bar.set_prefix("scanning");
        self.bar.set_length(count as u64);
        self.bar.set_position(0);
    }

    fn file_scanned(&self, rel_path: &Path, found: usize) {
        if found > 0 {
            self.bar
                .set_message(format!("{} ({found} found)", rel_path.display()));
        }
        self.bar.inc(1);
    }

    fn checks_started(&self, count: usize) {
        self.bar.set_prefix("checking");
        self.bar.set_length(count as u64);
        self.bar.set_position(0);
        self.bar.set_message("");
    }

    fn check_finished(&self, location: &PropertyLocation, verdict: &CorrectnessExplanation) {
        self.bar
            .set_message(format!("{location}: {}", verdict.correctness));
        self.bar.inc(1);
    }

    fn finished(&self, _report: &Report) {
        self.clear();
    }
}
