//! JSON export of a processed batch.

use crate::error::ScorecardResult;
use crate::scorecard::ScorecardReport;
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One input of a batch and what became of it.
#[derive(Debug, Serialize)]
pub struct ReportItem {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScorecardReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportItem {
    pub fn new(source: impl Into<String>, outcome: ScorecardResult<ScorecardReport>) -> Self {
        let (report, error) = match outcome {
            Ok(report) => (Some(report), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            source: source.into(),
            report,
            error,
        }
    }
}

/// Everything written to the report file.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub processed: usize,
    pub failed: usize,
    pub items: Vec<ReportItem>,
}

impl BatchReport {
    pub fn new(items: Vec<ReportItem>) -> Self {
        let failed = items.iter().filter(|i| i.error.is_some()).count();
        Self {
            generated_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            processed: items.len(),
            failed,
            items,
        }
    }
}

/// Writes the report as pretty-printed JSON.
pub fn export_to_json(report: &BatchReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}
