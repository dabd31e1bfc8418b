use std::cmp::Ordering;
use serde::Serialize;
use crate::config::MatcherConfig;
use crate::{MatchResult, MetadataRecord, TrackFile};

/// Ranking value and reported confidence for one qualifying candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub rank: f64,
    pub confidence: f64,
}

/// One matching layer. `score` returns `None` for candidates the layer rejects.
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, record: &MetadataRecord, candidate: &TrackFile) -> Option<Score>;

    /// Pick the best qualifying candidate by rank. Equal ranks fall back to the
    /// similarity between the record title and the full file stem, then to
    /// enumeration order.
    fn select(&self, record: &MetadataRecord, candidates: &[&TrackFile]) -> Option<(usize, Score)> {
        let wanted = clean_for_match(&record.raw_title);
        let mut best: Option<(usize, Score, f64)> = None;

        for (i, candidate) in candidates.iter().enumerate() {
            let Some(score) = self.score(record, candidate) else {
                continue;
            };
            let stem_similarity = strsim::normalized_levenshtein(&wanted, &clean_for_match(&candidate.stem()));

            let better = match &best {
                None => true,
                Some((_, current, current_similarity)) => {
                    match score.rank.partial_cmp(&current.rank).unwrap_or(Ordering::Equal) {
                        Ordering::Greater => true,
                        Ordering::Less => false,
                        Ordering::Equal => stem_similarity > *current_similarity,
                    }
                }
            };
            if better {
                best = Some((i, score, stem_similarity));
            }
        }

        best.map(|(i, score, _)| (i, score))
    }
}

/// Every " - " separated part of the record title appears in the display title.
pub struct TokenContainment;

impl MatchStrategy for TokenContainment {
    fn name(&self) -> &'static str {
        "token containment"
    }

    fn score(&self, record: &MetadataRecord, candidate: &TrackFile) -> Option<Score> {
        let haystack = clean_for_match(&candidate.display_title);
        let tokens: Vec<String> = split_artist_title(&record.raw_title)
            .into_iter()
            .map(|t| clean_for_match(&t))
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() || !tokens.iter().all(|t| haystack.contains(t.as_str())) {
            return None;
        }
        Some(Score { rank: 1.0, confidence: 1.0 })
    }
}

/// Count of record words found among the display title's words.
pub struct TokenOverlap;

impl MatchStrategy for TokenOverlap {
    fn name(&self) -> &'static str {
        "token overlap"
    }

    fn score(&self, record: &MetadataRecord, candidate: &TrackFile) -> Option<Score> {
        let record_clean = clean_for_match(&record.raw_title);
        let record_words: Vec<&str> = record_clean.split_whitespace().collect();
        let candidate_clean = clean_for_match(&candidate.display_title);
        let candidate_words: Vec<&str> = candidate_clean.split_whitespace().collect();

        let hits = record_words
            .iter()
            .filter(|w| candidate_words.contains(w))
            .count();
        if hits == 0 {
            return None;
        }
        Some(Score {
            rank: hits as f64,
            confidence: hits as f64 / record_words.len() as f64,
        })
    }
}

/// Normalized Levenshtein similarity above a fixed threshold.
pub struct FuzzySimilarity {
    pub threshold: f64,
}

impl MatchStrategy for FuzzySimilarity {
    fn name(&self) -> &'static str {
        "fuzzy similarity"
    }

    fn score(&self, record: &MetadataRecord, candidate: &TrackFile) -> Option<Score> {
        let ratio = strsim::normalized_levenshtein(
            &clean_for_match(&record.raw_title),
            &clean_for_match(&candidate.display_title),
        );
        if ratio > self.threshold {
            Some(Score { rank: ratio, confidence: ratio })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedRecord {
    pub record: MetadataRecord,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct MatchReport {
    pub matches: Vec<MatchResult>,
    pub unmatched_files: Vec<TrackFile>,
    pub unmatched_records: Vec<UnmatchedRecord>,
}

/// Pairs oracle records with track files, one-to-one, through ordered layers.
pub struct TrackMatcher {
    strategies: Vec<Box<dyn MatchStrategy>>,
    max_comparisons: Option<usize>,
}

impl TrackMatcher {
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            strategies: vec![
                Box::new(TokenContainment),
                Box::new(TokenOverlap),
                Box::new(FuzzySimilarity { threshold: config.fuzzy_threshold }),
            ],
            max_comparisons: config.max_comparisons,
        }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self {
            strategies,
            max_comparisons: None,
        }
    }

    pub fn match_records(&self, files: &[TrackFile], records: &[MetadataRecord]) -> MatchReport {
        let mut available = vec![true; files.len()];
        let mut report = MatchReport::default();
        let mut comparisons = 0usize;

        for record in records {
            if self.max_comparisons.is_some_and(|max| comparisons >= max) {
                report.unmatched_records.push(UnmatchedRecord {
                    record: record.clone(),
                    reason: "scan budget exhausted".into(),
                });
                continue;
            }

            let indices: Vec<usize> = (0..files.len()).filter(|&i| available[i]).collect();
            let candidates: Vec<&TrackFile> = indices.iter().map(|&i| &files[i]).collect();

            let mut found = None;
            for strategy in &self.strategies {
                comparisons += candidates.len();
                if let Some((pos, score)) = strategy.select(record, &candidates) {
                    found = Some((indices[pos], score, strategy.name()));
                    break;
                }
            }

            match found {
                Some((file_idx, score, layer)) => {
                    available[file_idx] = false;
                    log::info!(
                        "Matched '{}' -> {} ({}, confidence {:.2})",
                        record.raw_title,
                        files[file_idx].file_name(),
                        layer,
                        score.confidence
                    );
                    report.matches.push(MatchResult {
                        track: files[file_idx].clone(),
                        record: record.clone(),
                        confidence: score.confidence,
                    });
                }
                None => {
                    log::warn!("No confident match for '{}'", record.raw_title);
                    report.unmatched_records.push(UnmatchedRecord {
                        record: record.clone(),
                        reason: "no candidate cleared any matching layer".into(),
                    });
                }
            }
        }

        report.unmatched_files = files
            .iter()
            .zip(available)
            .filter_map(|(file, free)| free.then(|| file.clone()))
            .collect();
        report
    }
}

/// Split on the artist/title delimiter, accepting hyphen, en and em dashes.
pub fn split_artist_title(title: &str) -> Vec<String> {
    title
        .split(" - ")
        .flat_map(|part| part.split(" \u{2013} "))
        .flat_map(|part| part.split(" \u{2014} "))
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn clean_for_match(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
