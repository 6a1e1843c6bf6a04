//! Voice activity detection using RMS energy thresholding.
//!
//! The realtime provider runs its own server-side turn detection; this
//! detector is loaded once per worker process and shared by every job that
//! process runs.

use crate::config::TurnDetection;
use tracing::info;

/// Sample rate of the audio fed to the detector.
pub const SAMPLE_RATE: u32 = 16_000;

/// Tunables for [`VoiceActivityDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadSettings {
    /// Activation threshold in `0.0..=1.0`.
    pub threshold: f32,
    /// Audio kept before detected speech, in milliseconds.
    pub prefix_padding_ms: u32,
    /// Silence that ends a segment, in milliseconds.
    pub min_silence_duration_ms: u32,
    /// Segments shorter than this are dropped.
    pub min_speech_duration_ms: u32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self::from(&TurnDetection::default())
    }
}

impl From<&TurnDetection> for VadSettings {
    fn from(td: &TurnDetection) -> Self {
        Self {
            threshold: td.threshold,
            prefix_padding_ms: td.prefix_padding_ms,
            min_silence_duration_ms: td.silence_duration_ms,
            min_speech_duration_ms: 100,
        }
    }
}

/// A complete utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SpeechSegment {
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }
}

#[derive(Debug)]
pub struct VoiceActivityDetector {
    settings: VadSettings,
    speech_buffer: Vec<f32>,
    /// Recent silent audio, prepended when speech starts.
    padding: Vec<f32>,
    padding_samples: usize,
    in_speech: bool,
    silent_samples: usize,
    silence_limit: usize,
    min_speech_samples: usize,
}

impl VoiceActivityDetector {
    pub fn new(settings: VadSettings) -> Self {
        let per_ms = SAMPLE_RATE as usize / 1000;

        info!(
            threshold = settings.threshold,
            silence_ms = settings.min_silence_duration_ms,
            min_speech_ms = settings.min_speech_duration_ms,
            "VAD initialized"
        );

        Self {
            settings,
            speech_buffer: Vec::new(),
            padding: Vec::new(),
            padding_samples: settings.prefix_padding_ms as usize * per_ms,
            in_speech: false,
            silent_samples: 0,
            silence_limit: settings.min_silence_duration_ms as usize * per_ms,
            min_speech_samples: settings.min_speech_duration_ms as usize * per_ms,
        }
    }

    pub fn settings(&self) -> VadSettings {
        self.settings
    }

    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Feeds one chunk of mono 16 kHz audio. Returns a segment once an
    /// utterance has been followed by enough silence.
    pub fn process_chunk(&mut self, samples: &[f32]) -> Option<SpeechSegment> {
        let is_speech = rms_energy(samples) > self.settings.threshold * 0.01;

        if is_speech {
            if !self.in_speech {
                self.in_speech = true;
                self.speech_buffer.clear();
                self.speech_buffer.append(&mut self.padding);
            }
            self.silent_samples = 0;
            self.speech_buffer.extend_from_slice(samples);
            return None;
        }

        if !self.in_speech {
            self.padding.extend_from_slice(samples);
            if self.padding.len() > self.padding_samples {
                let excess = self.padding.len() - self.padding_samples;
                self.padding.drain(..excess);
            }
            return None;
        }

        self.silent_samples += samples.len();
        self.speech_buffer.extend_from_slice(samples);
        if self.silent_samples < self.silence_limit {
            return None;
        }

        self.in_speech = false;
        self.silent_samples = 0;
        let spoken = self.speech_buffer.len().saturating_sub(self.silence_limit);
        if spoken < self.min_speech_samples {
            self.speech_buffer.clear();
            return None;
        }
        Some(SpeechSegment {
            samples: std::mem::take(&mut self.speech_buffer),
            sample_rate: SAMPLE_RATE,
        })
    }

    pub fn reset(&mut self) {
        self.speech_buffer.clear();
        self.padding.clear();
        self.in_speech = false;
        self.silent_samples = 0;
    }
}

fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 32 ms at 16 kHz
    const CHUNK: usize = 512;

    fn tone() -> Vec<f32> {
        (0..CHUNK).map(|i| if i % 2 == 0 { 0.2 } else { -0.2 }).collect()
    }

    fn silence() -> Vec<f32> {
        vec![0.0; CHUNK]
    }

    #[test]
    fn settings_follow_turn_detection() {
        let settings = VadSettings::default();
        assert_eq!(settings.threshold, 0.5);
        assert_eq!(settings.prefix_padding_ms, 300);
        assert_eq!(settings.min_silence_duration_ms, 500);
    }

    #[test]
    fn silence_produces_nothing() {
        let mut vad = VoiceActivityDetector::new(VadSettings::default());
        for _ in 0..50 {
            assert!(vad.process_chunk(&silence()).is_none());
        }
        assert!(!vad.in_speech());
    }

    #[test]
    fn utterance_ends_after_silence() {
        let mut vad = VoiceActivityDetector::new(VadSettings::default());
        for _ in 0..4 {
            assert!(vad.process_chunk(&silence()).is_none());
        }
        for _ in 0..10 {
            assert!(vad.process_chunk(&tone()).is_none());
        }
        assert!(vad.in_speech());

        let segment = (0..20)
            .find_map(|_| vad.process_chunk(&silence()))
            .expect("segment after trailing silence");
        assert_eq!(segment.sample_rate, SAMPLE_RATE);
        // padding + speech + trailing silence
        assert!(segment.samples.len() >= 14 * CHUNK);
        assert!(!vad.in_speech());
    }

    #[test]
    fn short_blips_are_dropped() {
        let mut vad = VoiceActivityDetector::new(VadSettings::default());
        vad.process_chunk(&tone());
        assert!((0..20).all(|_| vad.process_chunk(&silence()).is_none()));
    }

    #[test]
    fn reset_clears_state() {
        let mut vad = VoiceActivityDetector::new(VadSettings::default());
        vad.process_chunk(&tone());
        vad.reset();
        assert!(!vad.in_speech());
    }

    #[test]
    fn rms_of_empty_is_zero() {
        assert_eq!(rms_energy(&[]), 0.0);
    }
}
