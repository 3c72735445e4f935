//! Pad voice: three slightly spread oscillators, a swell and a fade.

use crate::dsp::envelope::Envelope;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::voice::{Partial, Voice};

const ROOT: f64 = 220.0;
const LAYERS: [Waveform; 3] = [Waveform::Sawtooth, Waveform::Square, Waveform::Sine];
const SPREAD: f64 = 0.01;
pub const PAD_DURATION: f64 = 0.8;

/// `220 * 2^(index / 4)`, kept inside the audible range for the sample rate.
pub fn pad_frequency(pad_index: i32, sample_rate: f64) -> f64 {
    let f = ROOT * 2.0_f64.powf(pad_index as f64 / 4.0);
    f.clamp(20.0, sample_rate * 0.45)
}

pub fn pad_voice(pad_index: i32, sample_rate: f64) -> Voice {
    let base = pad_frequency(pad_index, sample_rate);
    LAYERS
        .iter()
        .enumerate()
        .fold(Voice::new(sample_rate, PAD_DURATION), |voice, (i, &waveform)| {
            let gain = Envelope::new(0.2)
                .linear_to(0.1, 0.3)
                .exponential_to(PAD_DURATION, 0.01);
            let osc = Oscillator::new(waveform, base * (1.0 + i as f64 * SPREAD), sample_rate);
            voice.with_partial(Partial::oscillator(osc).gain(gain))
        })
}
