//! CSV log of processed scorecards.
//!
//! Rows are appended one at a time so results already written survive a
//! crash partway through a batch.

use crate::scorecard::ScorecardReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const CSV_HEADER: &str =
    "timestamp,source,format,difficulty,score,combo,song_id,rating,grade,clear_type";

/// Creates the CSV with its header unless the file already has content.
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Quotes a field containing a comma, quote or newline.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(processed_at: DateTime<Local>, source: &str, report: &ScorecardReport) -> String {
    let result = &report.result;
    let song_id = report
        .song
        .as_ref()
        .map(|m| m.entry.song_id.as_str())
        .unwrap_or("");
    let (rating, grade, clear) = match &report.analysis {
        Some(a) => (
            format!("{:.3}", a.rating),
            a.grade.to_string(),
            a.clear_type.to_string(),
        ),
        None => Default::default(),
    };

    format!(
        "{},{},{},{},{},{},{},{},{},{}",
        processed_at.format("%Y-%m-%dT%H:%M:%S"),
        escape_field(source),
        result.format(),
        result.difficulty(),
        result.score(),
        result.combo(),
        escape_field(song_id),
        rating,
        grade,
        clear,
    )
}

/// Appends one processed scorecard to the CSV file.
pub fn append_to_csv(path: &Path, source: &str, report: &ScorecardReport) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    writeln!(file, "{}", format_row(Local::now(), source, report))
        .context("Failed to write CSV row")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorecard::test_support::sample_report;
    use tempfile::tempdir;

    #[test]
    fn test_init_csv_creates_header() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_init_csv_preserves_existing() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        std::fs::write(&csv_path, "existing,data\n1,2,3\n").unwrap();

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with("existing,data"));
    }

    #[test]
    fn test_append_rows() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        init_csv(&csv_path).unwrap();

        let report = sample_report(true);
        append_to_csv(&csv_path, "shots/one.png", &report).unwrap();
        append_to_csv(&csv_path, "shots/two.png", &sample_report(false)).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",shots/one.png,modern,Future,9876543,1000,testsong,"));
        assert!(lines[1].ends_with(",EX,Clear"));
        assert!(lines[2].ends_with(",1000,,,,"));
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain.png"), "plain.png");
        assert_eq!(escape_field("a,b.png"), "\"a,b.png\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
