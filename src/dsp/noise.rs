//! Noise bursts: pre-rendered buffers of white noise with the decay baked in.

use rand::Rng;
use rand::rngs::SmallRng;

/// A one-shot buffer of noise samples, read front to back.
#[derive(Debug, Clone)]
pub struct NoiseBuffer {
    data: Vec<f64>,
    position: usize,
}

impl NoiseBuffer {
    /// Fill `length_seconds` of noise, each sample scaled by
    /// `exp(-t / decay_seconds)`. A `decay_seconds` of zero or less gives
    /// flat, undecayed noise.
    pub fn decaying(
        rng: &mut SmallRng,
        length_seconds: f64,
        decay_seconds: f64,
        sample_rate: f64,
    ) -> Self {
        let len = (length_seconds.max(0.0) * sample_rate) as usize;
        let decay_samples = decay_seconds * sample_rate;
        let data = (0..len)
            .map(|i| {
                let white: f64 = rng.gen_range(-1.0..1.0);
                if decay_samples > 0.0 {
                    white * (-(i as f64) / decay_samples).exp()
                } else {
                    white
                }
            })
            .collect();
        NoiseBuffer { data, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Next sample, or silence once the buffer is exhausted.
    pub fn next_sample(&mut self) -> f64 {
        match self.data.get(self.position) {
            Some(&s) => {
                self.position += 1;
                s
            }
            None => 0.0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.data.len()
    }
}
