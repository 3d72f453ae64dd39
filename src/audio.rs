//! Audio feature extraction
//!
//! Turns one block of time-domain samples into loudness plus a pitch estimate.
//! Pitch comes from a plain time-domain autocorrelation: O(N²) per block, which
//! is fine for the small blocks a capture analyser hands over once per frame.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Outcome of acquiring the capture device, reported by the host on start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputStatus {
    Available { sample_rate: u32 },
    /// Device missing or permission denied
    Unavailable { reason: String },
}

/// One captured block of samples, nominally in [-1, 1].
///
/// Samples must be finite. Finite values outside [-1, 1] are accepted and
/// simply read as a louder signal.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> EngineResult<Self> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidSampleRate { rate: sample_rate });
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(EngineError::NonFiniteSample { index });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Build a block from unsigned 8-bit analyser data (128 = silence)
    pub fn from_u8_time_domain(bytes: &[u8], sample_rate: u32) -> EngineResult<Self> {
        let samples = bytes.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Features for a single block. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    /// RMS level after input gain (>= 0)
    pub loudness: f32,
    /// Fundamental frequency estimate, if any
    pub frequency_hz: Option<f32>,
    /// Peak strength relative to zero-lag energy, in [0, 1]
    pub confidence: f32,
}

impl FeatureSample {
    /// Sample used when no block arrived this tick
    pub fn silent() -> Self {
        Self {
            loudness: 0.0,
            frequency_hz: None,
            confidence: 0.0,
        }
    }

    fn unpitched(loudness: f32) -> Self {
        Self {
            loudness,
            frequency_hz: None,
            confidence: 0.0,
        }
    }

    /// Frequency if the estimate clears `threshold`, otherwise None
    pub fn pitch_above(&self, threshold: f32) -> Option<f32> {
        self.frequency_hz.filter(|_| self.confidence > threshold)
    }
}

/// Octave distance of `frequency_hz` above `reference_hz` (negative below it)
#[inline]
pub fn octave_of(frequency_hz: f32, reference_hz: f32) -> f32 {
    (frequency_hz / reference_hz).log2()
}

/// Block-wise loudness and pitch extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureExtractor {
    /// RMS below this (after gain) is treated as silence
    pub silence_threshold: f32,
    /// Multiplier applied to the raw RMS (microphone sensitivity)
    pub input_gain: f32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            input_gain: 1.0,
        }
    }
}

impl FeatureExtractor {
    pub fn new(silence_threshold: f32, input_gain: f32) -> Self {
        Self {
            silence_threshold,
            input_gain,
        }
    }

    /// Extract loudness, frequency and confidence from one block
    pub fn extract(&self, block: &AudioBlock) -> FeatureSample {
        let samples = block.samples();
        let loudness = rms(samples) * self.input_gain;

        if samples.len() < 2 || loudness < self.silence_threshold {
            return FeatureSample::unpitched(loudness);
        }

        let corr = autocorrelation(samples);
        let energy = corr[0];
        if energy <= 0.0 {
            return FeatureSample::unpitched(loudness);
        }

        // Walk down the zero-lag lobe before looking for the periodic peak
        let n = corr.len();
        let mut d = 0;
        while d + 1 < n && corr[d] > corr[d + 1] {
            d += 1;
        }
        if d + 1 >= n {
            // Monotonic decay all the way: nothing periodic in the block
            return FeatureSample::unpitched(loudness);
        }

        let mut best_lag = d;
        for lag in d + 1..n {
            if corr[lag] > corr[best_lag] {
                best_lag = lag;
            }
        }
        if best_lag == 0 {
            return FeatureSample::unpitched(loudness);
        }

        let confidence = (corr[best_lag] / energy).clamp(0.0, 1.0) as f32;
        let frequency = block.sample_rate() as f32 / best_lag as f32;
        log::trace!(
            "pitch: lag={} freq={:.1}Hz conf={:.3} rms={:.4}",
            best_lag,
            frequency,
            confidence,
            loudness
        );

        FeatureSample {
            loudness,
            frequency_hz: Some(frequency),
            confidence,
        }
    }
}

/// Root-mean-square of a block (0 for an empty block)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Unnormalized autocorrelation c[lag] for every lag in [0, N)
fn autocorrelation(samples: &[f32]) -> Vec<f64> {
    let n = samples.len();
    (0..n)
        .map(|lag| {
            samples[..n - lag]
                .iter()
                .zip(&samples[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(freq: f32, sample_rate: u32, len: usize, amp: f32) -> AudioBlock {
        let samples = (0..len)
            .map(|i| amp * (TAU * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioBlock::new(samples, sample_rate).unwrap()
    }

    #[test]
    fn test_pure_sine_440() {
        let block = sine(440.0, 44100, 1024, 0.5);
        let sample = FeatureExtractor::default().extract(&block);
        let freq = sample.frequency_hz.expect("pitch expected");
        assert!((freq - 440.0).abs() / 440.0 < 0.02, "freq = {}", freq);
        assert!(sample.confidence > 0.9, "confidence = {}", sample.confidence);
        assert!(sample.confidence <= 1.0);
    }

    #[test]
    fn test_lower_pitch_longer_block() {
        let block = sine(220.0, 44100, 2048, 0.5);
        let sample = FeatureExtractor::default().extract(&block);
        let freq = sample.frequency_hz.unwrap();
        assert!((freq - 220.0).abs() / 220.0 < 0.02, "freq = {}", freq);
    }

    #[test]
    fn test_silence_gate() {
        let block = sine(440.0, 44100, 1024, 0.001);
        let sample = FeatureExtractor::new(0.01, 1.0).extract(&block);
        assert_eq!(sample.frequency_hz, None);
        assert_eq!(sample.confidence, 0.0);
        assert!(sample.loudness < 0.01);
    }

    #[test]
    fn test_input_gain_scales_loudness() {
        let block = sine(440.0, 44100, 512, 0.2);
        let plain = FeatureExtractor::new(0.0, 1.0).extract(&block);
        let boosted = FeatureExtractor::new(0.0, 2.0).extract(&block);
        assert!((boosted.loudness - 2.0 * plain.loudness).abs() < 1e-5);
    }

    #[test]
    fn test_all_zero_block_is_finite() {
        let block = AudioBlock::new(vec![0.0; 512], 44100).unwrap();
        let sample = FeatureExtractor::new(0.0, 1.0).extract(&block);
        assert_eq!(sample.frequency_hz, None);
        assert_eq!(sample.confidence, 0.0);
        assert!(sample.loudness.is_finite());
    }

    #[test]
    fn test_dc_block_has_no_pitch() {
        let block = AudioBlock::new(vec![0.5; 256], 44100).unwrap();
        let sample = FeatureExtractor::new(0.0, 1.0).extract(&block);
        assert_eq!(sample.frequency_hz, None);
        assert_eq!(sample.confidence, 0.0);
        assert!((sample.loudness - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_short_blocks() {
        let extractor = FeatureExtractor::new(0.0, 1.0);
        for samples in [vec![], vec![0.7]] {
            let block = AudioBlock::new(samples, 8000).unwrap();
            let sample = extractor.extract(&block);
            assert_eq!(sample.frequency_hz, None);
            assert_eq!(sample.confidence, 0.0);
        }
    }

    #[test]
    fn test_u8_conversion() {
        let block = AudioBlock::from_u8_time_domain(&[128, 255, 0, 192], 8000).unwrap();
        assert_eq!(block.samples(), &[0.0, 127.0 / 128.0, -1.0, 0.5]);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(matches!(
            AudioBlock::new(vec![0.0; 4], 0),
            Err(EngineError::InvalidSampleRate { rate: 0 })
        ));
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        assert!(matches!(
            AudioBlock::new(vec![f32::INFINITY, 0.0, f32::INFINITY, 0.0], 8000),
            Err(EngineError::NonFiniteSample { index: 0 })
        ));
        assert!(matches!(
            AudioBlock::new(vec![0.1, 0.2, f32::NAN], 8000),
            Err(EngineError::NonFiniteSample { index: 2 })
        ));
        // Out of range but finite is still a valid block
        assert!(AudioBlock::new(vec![1.5, -2.0], 8000).is_ok());
    }

    #[test]
    fn test_pitch_above_threshold() {
        let sample = FeatureSample {
            loudness: 0.3,
            frequency_hz: Some(330.0),
            confidence: 0.8,
        };
        assert_eq!(sample.pitch_above(0.75), Some(330.0));
        assert_eq!(sample.pitch_above(0.85), None);
    }

    #[test]
    fn test_octave_of() {
        assert!((octave_of(440.0, 110.0) - 2.0).abs() < 1e-6);
        assert!((octave_of(55.0, 110.0) + 1.0).abs() < 1e-6);
    }
}
