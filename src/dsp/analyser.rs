//! Analyser tap on the output: the most recent block of samples, their
//! level, and a magnitude spectrum for meters and visualisers.

use std::fmt;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

/// Samples kept by the tap, and the spectrum's FFT size.
pub const ANALYSER_SIZE: usize = 1024;

/// Spectrum floor, reported for silent bins.
const MIN_DECIBELS: f32 = -100.0;

#[derive(Clone)]
pub struct Analyser {
    ring: Vec<f32>,
    /// Next slot to overwrite, which is also the oldest sample.
    pos: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("size", &self.ring.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Analyser::new()
    }
}

impl Analyser {
    pub fn new() -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(ANALYSER_SIZE);
        let n = ANALYSER_SIZE as f32;
        // Blackman window.
        let window = (0..ANALYSER_SIZE)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();
        Analyser {
            ring: vec![0.0; ANALYSER_SIZE],
            pos: 0,
            fft,
            window,
        }
    }

    pub fn push_block(&mut self, block: &[f32]) {
        for &s in block {
            self.ring[self.pos] = s;
            self.pos = (self.pos + 1) % self.ring.len();
        }
    }

    /// The last [`ANALYSER_SIZE`] samples, oldest first.
    pub fn waveform(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.ring.len());
        out.extend_from_slice(&self.ring[self.pos..]);
        out.extend_from_slice(&self.ring[..self.pos]);
        out
    }

    /// RMS of the last [`ANALYSER_SIZE`] samples.
    pub fn level(&self) -> f32 {
        let sum: f32 = self.ring.iter().map(|s| s * s).sum();
        (sum / self.ring.len() as f32).sqrt()
    }

    /// Magnitude per bin in dB, `ANALYSER_SIZE / 2` bins from DC upward.
    pub fn spectrum(&self) -> Vec<f32> {
        let bins = ANALYSER_SIZE / 2;
        let mut input: Vec<f32> = self
            .waveform()
            .iter()
            .zip(&self.window)
            .map(|(s, w)| s * w)
            .collect();
        let mut output = self.fft.make_output_vec();
        if self.fft.process(&mut input, &mut output).is_err() {
            return vec![MIN_DECIBELS; bins];
        }
        let scale = 1.0 / ANALYSER_SIZE as f32;
        output
            .iter()
            .take(bins)
            .map(|c| {
                let mag = c.norm() * scale;
                if mag > 0.0 {
                    (20.0 * mag.log10()).max(MIN_DECIBELS)
                } else {
                    MIN_DECIBELS
                }
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.ring.fill(0.0);
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SR).sin() * 0.5)
            .collect()
    }

    #[test]
    fn waveform_is_oldest_first() {
        let mut a = Analyser::new();
        let ramp: Vec<f32> = (0..ANALYSER_SIZE + 10).map(|i| i as f32).collect();
        a.push_block(&ramp);
        let wave = a.waveform();
        assert_eq!(wave.len(), ANALYSER_SIZE);
        assert_eq!(wave[0], 10.0);
        assert_eq!(wave[ANALYSER_SIZE - 1], (ANALYSER_SIZE + 9) as f32);
    }

    #[test]
    fn silence_has_no_level() {
        let a = Analyser::new();
        assert_eq!(a.level(), 0.0);
        assert!(a.spectrum().iter().all(|&db| db == MIN_DECIBELS));
    }

    #[test]
    fn sine_level_is_its_rms() {
        let mut a = Analyser::new();
        a.push_block(&sine(1000.0, 4096));
        let rms = a.level();
        assert!((rms - 0.5 / 2f32.sqrt()).abs() < 0.01, "rms {rms}");
    }

    #[test]
    fn spectrum_peaks_at_the_tone() {
        let mut a = Analyser::new();
        a.push_block(&sine(2000.0, ANALYSER_SIZE));
        let spectrum = a.spectrum();
        assert_eq!(spectrum.len(), ANALYSER_SIZE / 2);
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|x, y| x.1.total_cmp(y.1))
            .map(|(i, _)| i)
            .unwrap();
        let expected = (2000.0 * ANALYSER_SIZE as f32 / SR).round() as usize;
        assert!(peak.abs_diff(expected) <= 1, "peak bin {peak}, expected near {expected}");
    }
}
