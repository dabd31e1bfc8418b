use std::fmt;
use std::path::{Path, PathBuf};
use serde::Serialize;

pub mod analyzers;
pub mod audio;
pub mod cli;
pub mod config;
pub mod oracle;
pub mod pipeline;
pub mod utils;

/// A track on disk together with the query title derived from its path.
///
/// `display_title` is computed once when the file is enumerated and never
/// changes; after a rename the file must be looked up again by its new path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackFile {
    pub path: PathBuf,
    pub display_title: String,
}

impl TrackFile {
    pub fn new(path: impl Into<PathBuf>, display_title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_title: display_title.into(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File stem as written on disk, parenthetical annotations included.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One fully parsed entry of an oracle reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub raw_title: String,
    pub key: String,
    pub tempo: String,
}

impl MetadataRecord {
    pub fn new(raw_title: impl Into<String>, key: impl Into<String>, tempo: impl Into<String>) -> Self {
        Self {
            raw_title: raw_title.into(),
            key: key.into(),
            tempo: tempo.into(),
        }
    }

    pub fn tag(&self) -> KeyTag {
        KeyTag::new(&self.key, Some(&self.tempo))
    }
}

/// Key and optional tempo to be encoded into a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyTag {
    pub key: String,
    pub tempo: Option<String>,
}

impl KeyTag {
    pub fn new(key: &str, tempo: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            tempo: tempo.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub track: TrackFile,
    pub record: MetadataRecord,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub enum RenameStatus {
    Renamed,
    Planned,
    SkippedAlreadyTagged,
    SkippedNoMatch,
    SkippedCollision,
    Failed,
}

impl RenameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameStatus::Renamed => "renamed",
            RenameStatus::Planned => "planned",
            RenameStatus::SkippedAlreadyTagged => "skipped_already_tagged",
            RenameStatus::SkippedNoMatch => "skipped_no_match",
            RenameStatus::SkippedCollision => "skipped_collision",
            RenameStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RenameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub path: PathBuf,
    pub new_path: Option<PathBuf>,
    pub status: RenameStatus,
    pub reason: Option<String>,
}

impl RenameOutcome {
    pub fn new(path: &Path, new_path: Option<PathBuf>, status: RenameStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            new_path,
            status,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaggerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Analysis error: {0}")]
    Analysis(String),
    #[error("Oracle error: {0}")]
    Oracle(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Transcode error: {0}")]
    Transcode(String),
}

pub type Result<T> = std::result::Result<T, TaggerError>;

// Re-exports for convenience
pub use analyzers::key::{KeyEstimator, PitchClass};
pub use analyzers::matcher::{MatchReport, TrackMatcher};
pub use analyzers::title::TitleNormalizer;
pub use audio::scanner::TrackScanner;
pub use config::TaggerConfig;
pub use oracle::{batch::BatchQueryBuilder, parser::parse_response, MetadataSource, OpenAiOracle, Oracle};
pub use pipeline::{RunReport, Tagger};
pub use utils::file_ops::RenameApplier;
