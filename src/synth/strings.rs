//! Plucked string voice: three detuned harmonics through a body filter,
//! layered with a short noise "pick".

use rand::rngs::SmallRng;

use crate::dsp::envelope::Envelope;
use crate::dsp::filter::BiquadFilter;
use crate::dsp::noise::NoiseBuffer;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::voice::{Partial, Voice};
use crate::event::{GuitarStyle, StringInput};
use crate::pitch::{self, A4_FREQUENCY};

/// Open strings of a standard-tuned guitar, low E first.
pub const OPEN_STRINGS: [f64; 6] = [82.41, 110.0, 146.83, 196.0, 246.94, 329.63];

const HARMONICS: [(f64, f64); 3] = [(1.0, 0.0), (2.0, 6.0), (3.0, -5.0)];
const BODY_Q: f64 = 1.0;

const PICK_LENGTH: f64 = 0.02;
const PICK_DECAY: f64 = 0.02;
const PICK_STOP: f64 = 0.03;

const ATTACK: f64 = 0.005;
const MIN_HELD: f64 = 0.3;
const FADE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringTone {
    pub waveforms: [Waveform; 3],
    pub gains: [f64; 3],
    pub body_cutoff: f64,
    pub pick_cutoff: f64,
    pub pick_gain: f64,
    pub decay: f64,
}

impl StringTone {
    pub fn for_style(style: GuitarStyle) -> Self {
        use Waveform::*;
        match style {
            GuitarStyle::Acoustic => StringTone {
                waveforms: [Triangle, Sine, Sine],
                gains: [0.6, 0.12, 0.06],
                body_cutoff: 4800.0,
                pick_cutoff: 1200.0,
                pick_gain: 0.35,
                decay: 1.8,
            },
            GuitarStyle::Electric => StringTone {
                waveforms: [Sawtooth, Square, Sine],
                gains: [0.55, 0.18, 0.08],
                body_cutoff: 5000.0,
                pick_cutoff: 2500.0,
                pick_gain: 0.35,
                decay: 1.8,
            },
            GuitarStyle::Clean => StringTone {
                waveforms: [Triangle, Triangle, Sine],
                gains: [0.5, 0.15, 0.06],
                body_cutoff: 5500.0,
                pick_cutoff: 2500.0,
                pick_gain: 0.35,
                decay: 1.8,
            },
            GuitarStyle::Distorted => StringTone {
                waveforms: [Sawtooth, Sawtooth, Square],
                gains: [0.6, 0.22, 0.10],
                body_cutoff: 6000.0,
                pick_cutoff: 2500.0,
                pick_gain: 0.65,
                decay: 1.4,
            },
        }
    }
}

fn open_string(index: usize) -> f64 {
    OPEN_STRINGS.get(index).copied().unwrap_or(A4_FREQUENCY)
}

/// Fundamental for a pluck. An explicit playable frequency wins, then the
/// semitone offset from the indexed string. The octave shift applies to both.
pub fn string_frequency(input: StringInput, octave_shift: i32) -> f64 {
    let base = match input {
        StringInput::Index(i) => open_string(i),
        StringInput::Tuned {
            string_index,
            semitone_offset,
            frequency,
        } => match frequency.filter(|&f| pitch::is_playable(f)) {
            Some(f) => f,
            None => {
                let semis = semitone_offset.filter(|s| s.is_finite()).unwrap_or(0.0);
                pitch::transpose(open_string(string_index), semis)
            }
        },
    };
    base * 2.0_f64.powi(octave_shift)
}

/// Amplitude curve ending in a short fade at `stop`.
fn amp_curve(decay: f64, stop: f64) -> Envelope {
    let attack = Envelope::new(0.0001).linear_to(ATTACK, 1.0);
    if stop > decay {
        return attack.exponential_to(decay, 0.02).linear_to(stop, 0.0);
    }
    // Cut short: follow the same decay until the fade starts.
    let full = Envelope::new(0.0001)
        .linear_to(ATTACK, 1.0)
        .exponential_to(decay, 0.02);
    let fade_start = (stop - FADE).max(ATTACK);
    attack
        .exponential_to(fade_start, full.value_at(fade_start))
        .linear_to(stop, 0.0)
}

/// `held` is how long the string was held when the pluck was recorded;
/// without it the voice rings for the style's full decay.
pub fn pluck_voice(
    input: StringInput,
    style: GuitarStyle,
    octave_shift: i32,
    held: Option<f64>,
    rng: &mut SmallRng,
    sample_rate: f64,
) -> Voice {
    let tone = StringTone::for_style(style);
    let fundamental = string_frequency(input, octave_shift);
    let stop = match held.filter(|h| h.is_finite() && *h > 0.0) {
        Some(h) => h.max(MIN_HELD),
        None => tone.decay,
    };

    let mut voice = Voice::new(sample_rate, stop)
        .with_body(BiquadFilter::lowpass(tone.body_cutoff, BODY_Q, sample_rate))
        .with_amp(amp_curve(tone.decay, stop));

    for (i, &(multiple, cents)) in HARMONICS.iter().enumerate() {
        let osc = Oscillator::new(tone.waveforms[i], fundamental * multiple, sample_rate)
            .detuned(cents);
        voice = voice.with_partial(
            Partial::oscillator(osc).gain(Envelope::constant(tone.gains[i])),
        );
    }

    let pick = NoiseBuffer::decaying(rng, PICK_LENGTH, PICK_DECAY, sample_rate);
    voice.with_partial(
        Partial::noise(pick)
            .filtered(BiquadFilter::highpass(tone.pick_cutoff, sample_rate))
            .gain(Envelope::constant(tone.pick_gain))
            .stop_at(PICK_STOP),
    )
}
