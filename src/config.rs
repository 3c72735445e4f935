//! Engine and session configuration.
//!
//! Every field has a default, so a host can supply a partial JSON document
//! (or none at all) and get the stock studio behaviour.

use serde::{Deserialize, Serialize};

use crate::error::HarmonicaError;

/// Top-level configuration for a [`crate::studio::Studio`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarmonicaConfig {
    pub synth: SynthConfig,
    pub session: SessionConfig,
}

/// Output and synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f64,
    /// Master bus gain applied before soft clipping.
    pub master_gain: f64,
    /// Reverb send level in 0..=1. Zero leaves the reverb off.
    pub reverb_wet: f64,
    /// Start the output context suspended until `unlock_output` is called,
    /// mirroring platforms that gate audio behind a user gesture.
    pub start_suspended: bool,
    /// Render block size in samples.
    pub block_size: usize,
    /// Seed for the noise generator.
    pub noise_seed: u64,
    /// Longest offline bounce, in seconds of audio.
    pub max_bounce_seconds: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: 44100.0,
            master_gain: 0.8,
            reverb_wet: 0.0,
            start_suspended: true,
            block_size: 128,
            noise_seed: 0x4841_524d,
            max_bounce_seconds: 600.0,
        }
    }
}

/// Recording and playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Tempo at which recorded offsets play back unscaled.
    pub reference_bpm: f64,
    /// Tempo a fresh session starts with.
    pub default_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Silence after the last event of a pass, so its decay stays audible.
    pub trailing_pad_seconds: f64,
    /// A scheduled event this far behind the clock when its tick finally
    /// arrives is skipped rather than played late.
    pub max_lateness_seconds: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            reference_bpm: 120.0,
            default_bpm: 120.0,
            min_bpm: 40.0,
            max_bpm: 240.0,
            trailing_pad_seconds: 0.5,
            max_lateness_seconds: 0.25,
        }
    }
}

impl HarmonicaConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(source: &str) -> Result<Self, HarmonicaError> {
        let config: HarmonicaConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarmonicaError> {
        self.synth.validate()?;
        self.session.validate()
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<(), HarmonicaError> {
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(HarmonicaError::Config(format!(
                "masterGain must be a non-negative number, got {}",
                self.master_gain
            )));
        }
        if !(0.0..=1.0).contains(&self.reverb_wet) {
            return Err(HarmonicaError::Config(format!(
                "reverbWet must be within [0, 1], got {}",
                self.reverb_wet
            )));
        }
        if self.block_size == 0 {
            return Err(HarmonicaError::Config("blockSize must be at least 1".to_string()));
        }
        if !self.max_bounce_seconds.is_finite() || self.max_bounce_seconds <= 0.0 {
            return Err(HarmonicaError::Config(format!(
                "maxBounceSeconds must be positive, got {}",
                self.max_bounce_seconds
            )));
        }
        // Sample rate is checked when the output context is built, which is
        // where an unusable rate actually fails.
        Ok(())
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), HarmonicaError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.reference_bpm) {
            return Err(HarmonicaError::Config(format!(
                "referenceBpm must be positive, got {}",
                self.reference_bpm
            )));
        }
        if !positive(self.min_bpm) || !positive(self.max_bpm) || self.min_bpm > self.max_bpm {
            return Err(HarmonicaError::Config(format!(
                "tempo range [{}, {}] is invalid",
                self.min_bpm, self.max_bpm
            )));
        }
        if !self.trailing_pad_seconds.is_finite() || self.trailing_pad_seconds < 0.0 {
            return Err(HarmonicaError::Config(format!(
                "trailingPadSeconds must be non-negative, got {}",
                self.trailing_pad_seconds
            )));
        }
        if !self.max_lateness_seconds.is_finite() || self.max_lateness_seconds < 0.0 {
            return Err(HarmonicaError::Config(format!(
                "maxLatenessSeconds must be non-negative, got {}",
                self.max_lateness_seconds
            )));
        }
        Ok(())
    }

    /// Clamp a requested tempo into the configured range. Never panics, even
    /// on an unvalidated range.
    pub fn clamp_tempo(&self, bpm: f64) -> f64 {
        bpm.max(self.min_bpm).min(self.max_bpm)
    }
}
