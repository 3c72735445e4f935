//! Keyboard voice: a single sine tone with a four-stage envelope.

use crate::dsp::envelope::Envelope;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::voice::{Partial, Voice};
use crate::event::KeyNote;
use crate::pitch::{self, A4_FREQUENCY};

pub const DEFAULT_KEY_DURATION: f64 = 0.5;

/// Loudest velocity a held key accepts.
pub const MAX_VELOCITY: f64 = 1.0;

const PEAK: f64 = 0.3;
const ATTACK: f64 = 0.01;
const SUSTAIN: f64 = 0.1;
const FLOOR: f64 = 0.01;

/// `frequency`, then `midi`, then the note name (a bare name like "C#" is in
/// octave 4); anything unusable is A4.
pub fn key_frequency(note: &KeyNote) -> f64 {
    if let Some(f) = note.frequency.filter(|&f| pitch::is_playable(f)) {
        return f;
    }
    if let Some(midi) = note.midi {
        return pitch::midi_to_frequency(midi, A4_FREQUENCY);
    }
    pitch::note_to_frequency(&note.note).unwrap_or(A4_FREQUENCY)
}

pub fn key_voice(note: &KeyNote, duration: f64, sample_rate: f64) -> Voice {
    let duration = if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        DEFAULT_KEY_DURATION
    };
    let amp = Envelope::new(0.0)
        .linear_to(ATTACK, PEAK)
        .exponential_to(duration * 0.3, SUSTAIN)
        .exponential_to(duration, FLOOR);

    Voice::new(sample_rate, duration)
        .with_partial(Partial::oscillator(Oscillator::new(
            Waveform::Sine,
            key_frequency(note),
            sample_rate,
        )))
        .with_amp(amp)
}

/// A held keyboard voice: a triangle at `velocity` gain that sounds until
/// released. Velocity is clamped to `0..=MAX_VELOCITY`.
pub fn held_key_voice(midi: i32, velocity: f64, sample_rate: f64) -> Voice {
    let velocity = if velocity.is_nan() { MAX_VELOCITY } else { velocity.clamp(0.0, MAX_VELOCITY) };
    Voice::held(sample_rate)
        .with_partial(Partial::oscillator(Oscillator::new(
            Waveform::Triangle,
            pitch::midi_to_frequency(midi, A4_FREQUENCY),
            sample_rate,
        )))
        .with_amp(Envelope::constant(velocity))
}
