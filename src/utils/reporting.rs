use std::collections::BTreeMap;
use std::path::Path;
use csv::Writer;
use crate::pipeline::{ConversionReport, RunReport};
use crate::{RenameStatus, Result};

pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn counts(report: &RunReport) -> BTreeMap<RenameStatus, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &report.outcomes {
            *counts.entry(outcome.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn print_summary(&self, report: &RunReport) {
        println!("\nTracks found: {}", report.tracks_found);
        if report.batches > 0 {
            println!(
                "Oracle batches: {} ({} failed), records parsed: {}",
                report.batches, report.failed_batches, report.records_parsed
            );
        }
        for (status, count) in Self::counts(report) {
            println!("  {}: {}", status, count);
        }

        for outcome in &report.outcomes {
            if matches!(outcome.status, RenameStatus::Renamed | RenameStatus::Planned) {
                continue;
            }
            println!(
                "  [{}] {}: {}",
                outcome.status,
                outcome.path.display(),
                outcome.reason.as_deref().unwrap_or("-")
            );
        }
        for unmatched in &report.unmatched_records {
            println!("  [unmatched record] '{}': {}", unmatched.record.raw_title, unmatched.reason);
        }
    }

    pub fn print_conversion_summary(&self, report: &ConversionReport) {
        println!("\nFiles found: {}", report.found);
        println!("Converted: {}", report.converted);
        for (path, reason) in &report.failed {
            println!("  [failed] {}: {}", path.display(), reason);
        }
        match report.cleaned {
            Some(count) => println!("Downloads cleaned: {} files", count),
            None => println!("Downloads kept for retry"),
        }
    }

    pub fn write_csv(&self, report: &RunReport, output_path: impl AsRef<Path>) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        writer.write_record(["path", "new_path", "status", "reason"])?;
        for outcome in &report.outcomes {
            writer.write_record([
                outcome.path.display().to_string(),
                outcome.new_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
                outcome.status.to_string(),
                outcome.reason.clone().unwrap_or_default(),
            ])?;
        }

        writer.flush()?;
        log::info!("Report generated: {}", output_path_ref.display());
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenameOutcome;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn sample_report() -> RunReport {
        RunReport {
            tracks_found: 3,
            outcomes: vec![
                RenameOutcome::new(Path::new("a.wav"), Some(PathBuf::from("a_(C_1bpm).wav")), RenameStatus::Renamed),
                RenameOutcome::new(Path::new("b.wav"), None, RenameStatus::SkippedNoMatch).with_reason("no record"),
                RenameOutcome::new(Path::new("c.wav"), None, RenameStatus::SkippedNoMatch).with_reason("no record"),
            ],
            ..RunReport::default()
        }
    }

    #[test]
    fn counts_per_status() {
        let counts = Reporter::counts(&sample_report());
        assert_eq!(counts.get(&RenameStatus::Renamed), Some(&1));
        assert_eq!(counts.get(&RenameStatus::SkippedNoMatch), Some(&2));
        assert_eq!(counts.get(&RenameStatus::Failed), None);
    }

    #[test]
    fn writes_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        Reporter::new().write_csv(&sample_report(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "path,new_path,status,reason");
        assert_eq!(lines[1], "a.wav,a_(C_1bpm).wav,renamed,");
        assert_eq!(lines.len(), 4);
    }
}
