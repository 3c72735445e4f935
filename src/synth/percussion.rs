//! Drum voices. Kicks and toms are pitch-dropping sines; snares and cymbals
//! are filtered noise bursts.

use rand::rngs::SmallRng;

use crate::dsp::envelope::Envelope;
use crate::dsp::filter::BiquadFilter;
use crate::dsp::noise::NoiseBuffer;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::voice::{Partial, Voice};
use crate::event::DrumKit;

const FLOOR: f64 = 0.01;

/// Sine with an exponential pitch drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Punch {
    pub start_frequency: f64,
    pub decay: f64,
    pub gain: f64,
}

/// High-passed noise burst with its decay baked into the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    pub duration: f64,
    /// Time constant of the decay written into the noise buffer.
    pub tau: f64,
    pub cutoff: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrumPatch {
    Punch(Punch),
    Burst(Burst),
    /// Unknown voice: a plain decaying 200 Hz tone.
    Fallback,
}

impl DrumPatch {
    pub fn lookup(voice: &str, kit: DrumKit) -> Self {
        let electronic = kit == DrumKit::Electronic;
        let punch = |acoustic: (f64, f64), electro: (f64, f64), gain: f64| {
            let (start_frequency, decay) = if electronic { electro } else { acoustic };
            DrumPatch::Punch(Punch {
                start_frequency,
                decay,
                gain,
            })
        };
        let cymbal_cutoff = if electronic { 8000.0 } else { 7000.0 };

        match voice.trim().to_ascii_lowercase().as_str() {
            "kick" => punch((150.0, 0.5), (180.0, 0.35), 1.0),
            "tom1" => punch((200.0, 0.4), (240.0, 0.3), 0.7),
            "tom2" => punch((150.0, 0.45), (180.0, 0.32), 0.7),
            "snare" => DrumPatch::Burst(Burst {
                duration: if electronic { 0.12 } else { 0.25 },
                tau: 0.05,
                cutoff: if electronic { 1500.0 } else { 1000.0 },
                gain: 0.5,
            }),
            "hihat" => DrumPatch::Burst(Burst {
                duration: if electronic { 0.08 } else { 0.1 },
                tau: 0.03,
                cutoff: cymbal_cutoff,
                gain: 0.3,
            }),
            "crash" => DrumPatch::Burst(Burst {
                duration: if electronic { 0.6 } else { 0.8 },
                tau: 0.1,
                cutoff: cymbal_cutoff,
                gain: 0.5,
            }),
            "ride" => DrumPatch::Burst(Burst {
                duration: if electronic { 0.5 } else { 0.6 },
                tau: 0.1,
                cutoff: cymbal_cutoff,
                gain: 0.5,
            }),
            _ => DrumPatch::Fallback,
        }
    }

    /// Seconds until the voice stops.
    pub fn duration(&self) -> f64 {
        match self {
            DrumPatch::Punch(p) => p.decay,
            DrumPatch::Burst(b) => b.duration,
            DrumPatch::Fallback => FALLBACK_DURATION,
        }
    }
}

const FALLBACK_FREQUENCY: f64 = 200.0;
const FALLBACK_DURATION: f64 = 0.3;
const FALLBACK_GAIN: f64 = 0.5;

pub fn drum_voice(voice: &str, kit: DrumKit, rng: &mut SmallRng, sample_rate: f64) -> Voice {
    match DrumPatch::lookup(voice, kit) {
        DrumPatch::Punch(p) => {
            let pitch = Envelope::new(p.start_frequency).exponential_to(p.decay, FLOOR);
            Voice::new(sample_rate, p.decay)
                .with_partial(Partial::oscillator(Oscillator::with_frequency_curve(
                    Waveform::Sine,
                    pitch,
                    sample_rate,
                )))
                .with_amp(Envelope::new(p.gain).exponential_to(p.decay, FLOOR))
        }
        DrumPatch::Burst(b) => {
            let noise = NoiseBuffer::decaying(rng, b.duration, b.tau, sample_rate);
            Voice::new(sample_rate, b.duration)
                .with_partial(
                    Partial::noise(noise).filtered(BiquadFilter::highpass(b.cutoff, sample_rate)),
                )
                .with_amp(Envelope::new(b.gain).exponential_to(b.duration, FLOOR))
        }
        DrumPatch::Fallback => Voice::new(sample_rate, FALLBACK_DURATION)
            .with_partial(Partial::oscillator(Oscillator::new(
                Waveform::Sine,
                FALLBACK_FREQUENCY,
                sample_rate,
            )))
            .with_amp(Envelope::new(FALLBACK_GAIN).exponential_to(FALLBACK_DURATION, FLOOR)),
    }
}
