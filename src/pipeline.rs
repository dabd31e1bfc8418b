//! End-to-end passes: convert downloads, tag through the oracle, or tag with
//! locally estimated keys. Per-file and per-batch failures land in the report;
//! only setup problems are returned as errors.

use std::path::PathBuf;
use serde::Serialize;
use crate::analyzers::key::KeyEstimator;
use crate::analyzers::matcher::{TrackMatcher, UnmatchedRecord};
use crate::audio::convert::Transcoder;
use crate::audio::scanner::TrackScanner;
use crate::config::TaggerConfig;
use crate::oracle::batch::BatchQueryBuilder;
use crate::oracle::{MetadataSource, Oracle};
use crate::utils::file_ops::{clean_downloads, RenameApplier};
use crate::{RenameOutcome, RenameStatus, Result};

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub tracks_found: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub records_parsed: usize,
    pub outcomes: Vec<RenameOutcome>,
    pub unmatched_records: Vec<UnmatchedRecord>,
}

impl RunReport {
    pub fn count(&self, status: RenameStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

#[derive(Debug, Default)]
pub struct ConversionReport {
    pub found: usize,
    pub converted: usize,
    pub failed: Vec<(PathBuf, String)>,
    /// Files removed from the downloads directory, `None` when cleanup was skipped.
    pub cleaned: Option<usize>,
}

pub struct Tagger {
    config: TaggerConfig,
}

impl Tagger {
    pub fn new(config: TaggerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn convert(&self) -> Result<ConversionReport> {
        let config = &self.config;
        let inputs = TrackScanner::new(&config.input_extensions).collect_paths(&config.downloads_dir)?;
        let mut report = ConversionReport { found: inputs.len(), ..Default::default() };
        if inputs.is_empty() {
            return Ok(report);
        }

        let jobs = Transcoder::plan(&inputs, &config.downloads_dir, &config.output_dir);
        let outcomes = Transcoder::new(config.dry_run).convert_all(jobs);
        for outcome in outcomes {
            match outcome.result {
                Ok(()) => report.converted += 1,
                Err(e) => report.failed.push((outcome.job.input, e.to_string())),
            }
        }

        // Keep sources around when anything failed so the run can be retried
        if report.failed.is_empty() {
            report.cleaned = Some(clean_downloads(&config.downloads_dir, config.dry_run)?);
        } else {
            log::warn!(
                "{} conversions failed; leaving {} untouched",
                report.failed.len(),
                config.downloads_dir.display()
            );
        }
        Ok(report)
    }

    pub fn tag_with_oracle<O: Oracle>(&self, oracle: O) -> Result<RunReport> {
        let config = &self.config;
        let tracks = TrackScanner::new(&config.track_extensions).scan(&config.output_dir)?;
        let mut report = RunReport { tracks_found: tracks.len(), ..Default::default() };
        if tracks.is_empty() {
            return Ok(report);
        }

        let titles: Vec<String> = tracks.iter().map(|t| t.display_title.clone()).collect();
        let builder = BatchQueryBuilder::new(config.batch_size, config.oracle.prompt_template.clone());
        let source = MetadataSource::new(builder, oracle)
            .with_parallel_batches(config.oracle.parallel_batches);
        let lookup = source.lookup_all(&titles)?;
        report.batches = lookup.batches;
        report.failed_batches = lookup.failed_batches;
        report.records_parsed = lookup.records.len();

        let matched = TrackMatcher::new(&config.matcher).match_records(&tracks, &lookup.records);
        let applier = RenameApplier::new(config.dry_run);

        report.outcomes = matched.matches.iter().map(|m| applier.apply_match(m)).collect();
        report.outcomes.extend(matched.unmatched_files.iter().map(|track| {
            RenameOutcome::new(&track.path, None, RenameStatus::SkippedNoMatch)
                .with_reason(format!("no oracle entry matched '{}'", track.display_title))
        }));
        report.unmatched_records = matched.unmatched_records;
        Ok(report)
    }

    pub fn tag_with_local_keys(&self) -> Result<RunReport> {
        let config = &self.config;
        let paths = TrackScanner::new(&config.track_extensions).collect_paths(&config.output_dir)?;
        let mut report = RunReport { tracks_found: paths.len(), ..Default::default() };

        // Tagged files are never decoded again, whichever pass tagged them
        let (tagged, pending): (Vec<PathBuf>, Vec<PathBuf>) =
            paths.into_iter().partition(|path| RenameApplier::has_any_tag(path));
        log::info!("{} files already tagged, {} to analyze", tagged.len(), pending.len());

        let estimates = KeyEstimator::new().estimate_all(&pending);
        let applier = RenameApplier::new(config.dry_run);

        report.outcomes = pending
            .iter()
            .zip(estimates)
            .map(|(path, estimate)| match estimate {
                Ok(tag) => applier.apply(path, &tag),
                Err(e) => RenameOutcome::new(path, None, RenameStatus::Failed)
                    .with_reason(format!("key analysis failed: {}", e)),
            })
            .collect();
        report.outcomes.extend(tagged.iter().map(|path| {
            RenameOutcome::new(path, None, RenameStatus::SkippedAlreadyTagged)
                .with_reason("name already carries a key tag")
        }));
        Ok(report)
    }
}
