use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use crate::utils::file_ops::ensure_directory;
use crate::utils::parallel::ParallelProcessor;
use crate::{Result, TaggerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct ConversionOutcome {
    pub job: ConversionJob,
    pub result: Result<()>,
}

/// Converts downloads to 16-bit 44.1 kHz WAV by shelling out to ffmpeg.
pub struct Transcoder {
    program: String,
    dry_run: bool,
}

impl ParallelProcessor for Transcoder {}

impl Transcoder {
    pub fn new(dry_run: bool) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            dry_run,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Pair every input with its `.wav` target, mirroring the relative layout.
    pub fn plan(inputs: &[PathBuf], input_root: &Path, output_root: &Path) -> Vec<ConversionJob> {
        inputs
            .iter()
            .map(|input| {
                let relative = input.strip_prefix(input_root).unwrap_or(input.as_path());
                ConversionJob {
                    input: input.clone(),
                    output: output_root.join(relative).with_extension("wav"),
                }
            })
            .collect()
    }

    pub fn convert(&self, job: &ConversionJob) -> Result<()> {
        log::info!("Converting: {}", job.input.display());
        if self.dry_run {
            log::info!("[dry-run] Would save to: {}", job.output.display());
            return Ok(());
        }

        if let Some(parent) = job.output.parent() {
            ensure_directory(parent)?;
        }

        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(&job.input)
            .args(["-acodec", "pcm_s16le", "-ar", "44100"])
            .arg(&job.output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| TaggerError::Transcode(format!("failed to start {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(TaggerError::Transcode(format!(
                "{} exited with {} for {}",
                self.program,
                status,
                job.input.display()
            )));
        }
        log::info!("Saved to: {}", job.output.display());
        Ok(())
    }

    /// Convert every job on the pool; one failure never stops the others.
    pub fn convert_all(&self, jobs: Vec<ConversionJob>) -> Vec<ConversionOutcome> {
        let results = Self::process_isolated(&jobs, "Conversion", |job| self.convert(job));
        jobs.into_iter()
            .zip(results)
            .map(|(job, result)| {
                if let Err(e) = &result {
                    log::warn!("Failed to convert {}: {}", job.input.display(), e);
                }
                ConversionOutcome { job, result }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plan_mirrors_layout() {
        let inputs = vec![
            PathBuf::from("downloads/Artist/01 Song.m4a"),
            PathBuf::from("downloads/Loose.opus"),
        ];
        let jobs = Transcoder::plan(&inputs, Path::new("downloads"), Path::new("output"));

        assert_eq!(jobs[0].output, PathBuf::from("output/Artist/01 Song.wav"));
        assert_eq!(jobs[1].output, PathBuf::from("output/Loose.wav"));
    }

    #[test]
    fn dry_run_does_not_spawn() {
        let transcoder = Transcoder::new(true).with_program("definitely-not-a-real-binary");
        let job = ConversionJob {
            input: PathBuf::from("in.m4a"),
            output: PathBuf::from("out/in.wav"),
        };
        assert!(transcoder.convert(&job).is_ok());
    }

    #[test]
    fn missing_program_is_isolated_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Transcoder::new(false).with_program("definitely-not-a-real-binary");
        let jobs = vec![
            ConversionJob { input: dir.path().join("a.m4a"), output: dir.path().join("out/a.wav") },
            ConversionJob { input: dir.path().join("b.m4a"), output: dir.path().join("out/b.wav") },
        ];

        let outcomes = transcoder.convert_all(jobs);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o.result, Err(TaggerError::Transcode(_)))));
    }
}
