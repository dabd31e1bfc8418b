//! Chroma-based tonic estimation.
//!
//! Picks the pitch class with the highest average chroma energy over the whole
//! signal. Mode and tonal context are ignored, so this is a coarse fallback for
//! when no oracle is available rather than a real key detector.

use std::f64::consts::PI;
use std::fmt;
use std::path::{Path, PathBuf};
use rustfft::{num_complex::Complex, FftPlanner};
use crate::audio::decoder::{decode_mono, DecodedAudio};
use crate::utils::parallel::ParallelProcessor;
use crate::{KeyTag, Result, TaggerError};

const FRAME_SIZE: usize = 4096;
const HOP_SIZE: usize = 2048;
// ~C2 to ~B6; outside this range harmonics and rumble dominate
const MIN_FREQ: f64 = 65.0;
const MAX_FREQ: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct KeyEstimator;

impl KeyEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate_file(&self, path: &Path) -> Result<PitchClass> {
        let audio = decode_mono(path)?;
        self.estimate(&audio)
    }

    pub fn estimate(&self, audio: &DecodedAudio) -> Result<PitchClass> {
        if audio.samples.len() < FRAME_SIZE {
            return Err(TaggerError::Analysis(format!(
                "signal too short ({:.3}s) for a {}-sample analysis frame",
                audio.duration_secs(),
                FRAME_SIZE
            )));
        }
        let averages = average_chroma(&chromagram(&audio.samples, audio.sample_rate)?);

        let (best, energy) = averages
            .iter()
            .enumerate()
            .fold((0, 0.0f64), |best, (i, &e)| if e > best.1 { (i, e) } else { best });

        if energy <= 0.0 {
            return Err(TaggerError::Analysis("no tonal energy in analysed range".into()));
        }
        Ok(PitchClass::from_index(best))
    }

    /// Estimate every file on the rayon pool. Results keep input order and a
    /// failure for one file never affects the others.
    pub fn estimate_all(&self, paths: &[PathBuf]) -> Vec<Result<KeyTag>> {
        Self::process_isolated(paths, "Key analysis", |path| {
            let result = self
                .estimate_file(path)
                .map(|pitch| KeyTag::new(pitch.as_str(), None));
            match &result {
                Ok(tag) => log::info!("Estimated key {} for {}", tag.key, path.display()),
                Err(e) => log::warn!("Failed to analyze key for {}: {}", path.display(), e),
            }
            result
        })
    }
}

impl ParallelProcessor for KeyEstimator {}

impl Default for KeyEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// One 12-bin power distribution per analysis frame.
pub fn chromagram(samples: &[f32], sample_rate: u32) -> Result<Vec<[f64; 12]>> {
    if sample_rate == 0 {
        return Err(TaggerError::Analysis("sample rate is zero".into()));
    }
    if samples.len() < FRAME_SIZE {
        return Err(TaggerError::Analysis(format!(
            "signal too short: {} samples, need at least {}",
            samples.len(),
            FRAME_SIZE
        )));
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);

    let window: Vec<f64> = (0..FRAME_SIZE)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (FRAME_SIZE - 1) as f64).cos()))
        .collect();

    let bin_to_pitch: Vec<Option<usize>> = (0..FRAME_SIZE / 2 + 1)
        .map(|bin| {
            let freq = bin as f64 * sample_rate as f64 / FRAME_SIZE as f64;
            if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
                return None;
            }
            // Semitones from A4, shifted so C is index 0
            let semitones = 12.0 * (freq / 440.0).log2();
            Some(((semitones.round() as i64 + 9).rem_euclid(12)) as usize)
        })
        .collect();

    let frame_count = (samples.len() - FRAME_SIZE) / HOP_SIZE + 1;
    let mut frames = Vec::with_capacity(frame_count);
    let mut buffer = vec![Complex::new(0.0f64, 0.0); FRAME_SIZE];

    for frame_idx in 0..frame_count {
        let start = frame_idx * HOP_SIZE;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(samples[start + i] as f64 * window[i], 0.0);
        }
        fft.process(&mut buffer);

        let mut chroma = [0.0f64; 12];
        for (bin, pitch) in bin_to_pitch.iter().enumerate() {
            if let Some(pitch) = pitch {
                chroma[*pitch] += buffer[bin].norm_sqr();
            }
        }
        frames.push(chroma);
    }

    Ok(frames)
}

pub fn average_chroma(frames: &[[f64; 12]]) -> [f64; 12] {
    let mut avg = [0.0f64; 12];
    if frames.is_empty() {
        return avg;
    }
    for frame in frames {
        for (acc, value) in avg.iter_mut().zip(frame.iter()) {
            *acc += value;
        }
    }
    for value in avg.iter_mut() {
        *value /= frames.len() as f64;
    }
    avg
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sine(freq: f64, sample_rate: u32, seconds: f64) -> DecodedAudio {
        let len = (sample_rate as f64 * seconds) as usize;
        let samples = (0..len)
            .map(|n| (2.0 * PI * freq * n as f64 / sample_rate as f64).sin() as f32 * 0.5)
            .collect();
        DecodedAudio { samples, sample_rate }
    }

    #[test]
    fn a440_is_a() {
        let estimator = KeyEstimator::new();
        assert_eq!(estimator.estimate(&sine(440.0, 44100, 1.0)).unwrap(), PitchClass::A);
    }

    #[test]
    fn middle_c_is_c() {
        let estimator = KeyEstimator::new();
        assert_eq!(estimator.estimate(&sine(261.63, 44100, 1.0)).unwrap(), PitchClass::C);
    }

    #[test]
    fn short_signal_fails() {
        let estimator = KeyEstimator::new();
        let audio = DecodedAudio { samples: vec![0.1; 441], sample_rate: 44100 };
        match estimator.estimate(&audio) {
            Err(TaggerError::Analysis(msg)) => assert!(msg.contains("0.010s"), "{}", msg),
            other => panic!("expected analysis error, got {:?}", other),
        }
    }

    #[test]
    fn silence_fails() {
        let estimator = KeyEstimator::new();
        let audio = DecodedAudio { samples: vec![0.0; 44100], sample_rate: 44100 };
        assert!(estimator.estimate(&audio).is_err());
    }

    #[test]
    fn estimates_from_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in sine(392.0, 44100, 1.0).samples {
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(KeyEstimator::new().estimate_file(&path).unwrap(), PitchClass::G);
    }

    #[test]
    fn labels_cover_all_pitch_classes() {
        let labels: Vec<&str> = PitchClass::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(labels, vec!["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"]);
    }
}
