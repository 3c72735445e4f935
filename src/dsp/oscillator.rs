//! Anti-aliased oscillators using PolyBLEP, with automatable frequency.

use std::f64::consts::PI;

use super::envelope::Envelope;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// A band-limited oscillator. Frequency follows an [`Envelope`], so pitch
/// drops (kick drums, toms) use the same machinery as gain envelopes.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    frequency: Envelope,
    /// Detune in cents.
    pub detune: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Oscillator::with_frequency_curve(waveform, Envelope::constant(frequency), sample_rate)
    }

    pub fn with_frequency_curve(waveform: Waveform, frequency: Envelope, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            frequency,
            detune: 0.0,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn detuned(mut self, cents: f64) -> Self {
        self.detune = cents;
        self
    }

    /// Frequency at voice-local time `t`, accounting for detune.
    pub fn frequency_at(&self, t: f64) -> f64 {
        self.frequency.value_at(t) * 2.0_f64.powf(self.detune / 1200.0)
    }

    /// Generate the sample at voice-local time `t` and advance the phase.
    pub fn next_sample(&mut self, t: f64) -> f64 {
        let freq = self.frequency.next_value(t) * 2.0_f64.powf(self.detune / 1200.0);
        let inc = (freq / self.sample_rate).clamp(0.0, 0.5);
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            Waveform::Square => {
                let naive = if self.phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(self.phase, inc) - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
            // Piecewise linear: -1 → +1 over the first half, back down over the second.
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}

/// PolyBLEP (Polynomial Band-Limited Step) correction at a discontinuity.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn run(osc: &mut Oscillator, samples: usize) -> Vec<f64> {
        (0..samples).map(|i| osc.next_sample(i as f64 / SR)).collect()
    }

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, SR);
        let sample = osc.next_sample(0.0);
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            let mut osc = Oscillator::new(waveform, 440.0, SR);
            for s in run(&mut osc, 44100) {
                assert!(s.abs() <= 1.5, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn detune_shifts_frequency() {
        let osc = Oscillator::new(Waveform::Sine, 440.0, SR).detuned(1200.0);
        assert!((osc.frequency_at(0.0) - 880.0).abs() < 1e-9);
    }

    #[test]
    fn frequency_curve_drops() {
        let curve = Envelope::new(150.0).exponential_to(0.5, 0.01);
        let osc = Oscillator::with_frequency_curve(Waveform::Sine, curve, SR);
        assert!((osc.frequency_at(0.0) - 150.0).abs() < 1e-9);
        assert!(osc.frequency_at(0.25) < 150.0);
        assert!((osc.frequency_at(0.5) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn sine_period_matches_frequency() {
        // 441 Hz at 44.1 kHz: exactly 100 samples per cycle.
        let mut osc = Oscillator::new(Waveform::Sine, 441.0, SR);
        let samples = run(&mut osc, 201);
        assert!(samples[100].abs() < 1e-6, "one period later should be ~0, got {}", samples[100]);
        assert!((samples[25] - 1.0).abs() < 1e-6, "quarter period should peak, got {}", samples[25]);
    }
}
