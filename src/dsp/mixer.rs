//! Mixer: the master bus. Sums every live voice, adds the reverb send,
//! applies master gain and soft clipping, and retires voices once they have
//! stopped.

use super::reverb::Reverb;
use super::voice::Voice;

const ROOM_SIZE: f64 = 0.5;
const DAMPING: f64 = 0.5;

#[derive(Debug, Clone)]
struct Slot {
    /// Set while the voice is held under a key.
    key: Option<i32>,
    voice: Voice,
}

#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    reverb_wet: f64,
    reverb: Reverb,
    voices: Vec<Slot>,
}

impl Mixer {
    pub fn new(master_gain: f64, sample_rate: f64) -> Self {
        Mixer {
            master_gain,
            reverb_wet: 0.0,
            reverb: Reverb::new(sample_rate, ROOM_SIZE, DAMPING),
            voices: Vec::new(),
        }
    }

    /// Add a voice. There is no polyphony limit; every trigger gets its own voice.
    pub fn add(&mut self, voice: Voice) {
        self.voices.push(Slot { key: None, voice });
    }

    /// Add a voice held under `key`, releasing whatever held that key before.
    pub fn hold(&mut self, key: i32, voice: Voice, tau: f64, tail: f64) {
        self.release(key, tau, tail);
        self.voices.push(Slot {
            key: Some(key),
            voice,
        });
    }

    /// Release the voice held under `key`. False if nothing held it.
    pub fn release(&mut self, key: i32, tau: f64, tail: f64) -> bool {
        match self.voices.iter_mut().find(|s| s.key == Some(key)) {
            Some(slot) => {
                slot.key = None;
                slot.voice.release(tau, tail);
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self, tau: f64, tail: f64) -> usize {
        let mut released = 0;
        for slot in self.voices.iter_mut().filter(|s| s.key.is_some()) {
            slot.key = None;
            slot.voice.release(tau, tail);
            released += 1;
        }
        released
    }

    pub fn held_keys(&self) -> Vec<i32> {
        self.voices.iter().filter_map(|s| s.key).collect()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn reverb_wet(&self) -> f64 {
        self.reverb_wet
    }

    /// Reverb send level, clamped to 0..=1. Zero bypasses the network.
    pub fn set_reverb_wet(&mut self, wet: f64) {
        let wet = if wet.is_nan() { 0.0 } else { wet.clamp(0.0, 1.0) };
        if self.reverb_wet == 0.0 && wet > 0.0 {
            self.reverb.clear();
        }
        self.reverb_wet = wet;
    }

    /// Render one block, overwriting `out`, then drop finished voices.
    pub fn render(&mut self, out: &mut [f32]) {
        for slot in out.iter_mut() {
            let mut sum = 0.0;
            for s in self.voices.iter_mut() {
                sum += s.voice.next_sample();
            }
            if self.reverb_wet > 0.0 {
                sum += self.reverb.process(sum as f32) as f64 * self.reverb_wet;
            }
            *slot = soft_clip(sum * self.master_gain) as f32;
        }
        self.voices.retain(|s| !s.voice.is_finished());
    }

    pub fn clear(&mut self) {
        self.voices.clear();
        self.reverb.clear();
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}
