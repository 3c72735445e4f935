//! Biquad filter: WebAudio `BiquadFilterNode` coefficients for the two
//! responses the instruments use.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// Second-order IIR filter, Direct Form II Transposed.
/// Coefficients from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    pub cutoff: f64,
    pub q: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

/// Butterworth Q, WebAudio's default for both responses here.
pub const DEFAULT_Q: f64 = 0.707;

impl BiquadFilter {
    pub fn new(filter_type: FilterType, cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            cutoff,
            q,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        f.compute(sample_rate);
        f
    }

    pub fn lowpass(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        BiquadFilter::new(FilterType::Lowpass, cutoff, q, sample_rate)
    }

    pub fn highpass(cutoff: f64, sample_rate: f64) -> Self {
        BiquadFilter::new(FilterType::Highpass, cutoff, DEFAULT_Q, sample_rate)
    }

    fn compute(&mut self, sample_rate: f64) {
        // Keep the cutoff strictly inside (0, Nyquist) so the coefficients stay finite.
        let nyquist = sample_rate / 2.0;
        let cutoff = self.cutoff.clamp(1.0, nyquist * 0.999);
        let q = if self.q > 0.0 { self.q } else { DEFAULT_Q };

        let w0 = 2.0 * PI * cutoff / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn peak_after_transient(f: &mut BiquadFilter, freq: f64) -> f64 {
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / SR;
            let out = f.process((2.0 * PI * freq * t).sin());
            if i > 1000 {
                max_out = max_out.max(out.abs());
            }
        }
        max_out
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = BiquadFilter::lowpass(4800.0, 1.0, SR);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = BiquadFilter::highpass(1200.0, SR);
        let mut output = 1.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Highpass should block DC, got {output}");
    }

    #[test]
    fn cymbal_highpass_attenuates_low_tones() {
        let mut f = BiquadFilter::highpass(7000.0, SR);
        let peak = peak_after_transient(&mut f, 200.0);
        assert!(peak < 0.01, "7kHz highpass should kill 200Hz, got {peak}");
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = BiquadFilter::lowpass(200.0, DEFAULT_Q, SR);
        let peak = peak_after_transient(&mut f, 10000.0);
        assert!(peak < 0.01, "Lowpass@200Hz should strongly attenuate 10kHz, got {peak}");
    }

    #[test]
    fn cutoff_above_nyquist_stays_finite() {
        let mut f = BiquadFilter::lowpass(30000.0, 1.0, 22050.0);
        for i in 0..2000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            let out = f.process(input);
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
