//! Run configuration.
//!
//! Loaded from an optional TOML file; every section falls back to defaults so a
//! partial file only overrides what it names. Command-line flags are applied on
//! top by the binary.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::{Result, TaggerError};

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are a music expert with knowledge of modern music. For each track name listed below, return the musical key and tempo (BPM) based on real metadata. Do not guess or invent.

Many names include the artist and the track title, sometimes with folder names or extra words. Clean up the names, infer the correct title and artist, and return exactly three lines per track:

Track Name: <clean artist - title>
Key: <key>
BPM: <bpm>

Only include entries you are confident about. Leave out any track you cannot identify.

Here is the list:
{songs}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful music metadata expert.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub downloads_dir: PathBuf,
    pub output_dir: PathBuf,
    pub input_extensions: Vec<String>,
    pub track_extensions: Vec<String>,
    pub batch_size: usize,
    pub dry_run: bool,
    /// Worker threads for conversion and key analysis, 0 means all cores.
    pub threads: usize,
    pub oracle: OracleConfig,
    pub matcher: MatcherConfig,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            output_dir: PathBuf::from("output"),
            input_extensions: vec!["m4a".into(), "opus".into(), "wav".into()],
            track_extensions: vec!["wav".into()],
            batch_size: 20,
            dry_run: false,
            threads: 0,
            oracle: OracleConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_key_env: String,
    /// Number of batch requests in flight at once; 1 keeps them sequential.
    pub parallel_batches: usize,
    pub system_prompt: String,
    pub prompt_template: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            api_key_env: "OPENAI_API_KEY".to_string(),
            parallel_batches: 1,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum similarity ratio (exclusive) for the fuzzy layer.
    pub fuzzy_threshold: f64,
    /// Upper bound on record/candidate comparisons per pass.
    pub max_comparisons: Option<usize>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.7,
            max_comparisons: None,
        }
    }
}

impl TaggerConfig {
    /// Load from `path` if given, otherwise return defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => TaggerConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TaggerError::Config("batch_size must be at least 1".into()));
        }
        if self.oracle.parallel_batches == 0 {
            return Err(TaggerError::Config("oracle.parallel_batches must be at least 1".into()));
        }
        if !self.oracle.prompt_template.contains("{songs}") {
            return Err(TaggerError::Config(
                "oracle.prompt_template must contain a {songs} placeholder".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.matcher.fuzzy_threshold) {
            return Err(TaggerError::Config(format!(
                "matcher.fuzzy_threshold must be within 0..=1, got {}",
                self.matcher.fuzzy_threshold
            )));
        }
        if self.track_extensions.is_empty() {
            return Err(TaggerError::Config("track_extensions must not be empty".into()));
        }
        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Read the oracle API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.oracle.api_key_env).map_err(|_| {
            TaggerError::Config(format!(
                "environment variable {} is not set",
                self.oracle.api_key_env
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = TaggerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.oracle.parallel_batches, 1);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batch_size = 5\n\n[matcher]\nfuzzy_threshold = 0.8").unwrap();

        let config = TaggerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.matcher.fuzzy_threshold, 0.8);
        assert_eq!(config.oracle.model, "gpt-4o");
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let mut config = TaggerConfig::default();
        config.oracle.prompt_template = "list keys please".into();
        assert!(matches!(config.validate(), Err(TaggerError::Config(_))));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let config = TaggerConfig { batch_size: 0, ..TaggerConfig::default() };
        assert!(config.validate().is_err());
    }
}
