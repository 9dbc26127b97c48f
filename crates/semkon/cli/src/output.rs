//! Report rendering

use anyhow::Context;
use semkon_core::Report;
use serde::{Deserialize, Serialize};

/// Output format for the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// YAML list, one record per proposition
    #[default]
    Yaml,
    /// Pretty-printed JSON array
    Json,
}

/// Render the report, ready to be written to stdout
pub fn render(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).context("failed to serialize report as YAML")
        }
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(report)
                .context("failed to serialize report as JSON")?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// One-line summary for the log
pub fn summary(report: &Report) -> String {
    let counts = report
        .tally()
        .iter()
        .map(|(correctness, n)| format!("{n} {correctness}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} propositions checked: {}", report.len(), counts)
}
