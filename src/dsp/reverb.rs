//! Reverb send: a mono Schroeder/Freeverb network fed from the master bus.
//!
//! Eight damped feedback combs in parallel, then four allpasses in series.
//! The network returns only the wet signal; the mixer decides how much of
//! it to add back.

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp: f32,
    store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Comb {
            buffer: vec![0.0; len.max(1)],
            index: 0,
            feedback: 0.0,
            damp: 0.0,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let out = self.buffer[self.index];
        self.store = out * (1.0 - self.damp) + self.store * self.damp;
        self.buffer[self.index] = input + self.store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.store = 0.0;
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    const FEEDBACK: f32 = 0.5;

    fn new(len: usize) -> Self {
        Allpass {
            buffer: vec![0.0; len.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * Self::FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

// Delay lengths in samples at 44.1 kHz.
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const INPUT_GAIN: f32 = 0.015;

#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Reverb {
    /// `room_size` and `damping` are in 0..=1.
    pub fn new(sample_rate: f64, room_size: f64, damping: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let scaled = |len: usize| (len as f64 * scale).round() as usize;
        let mut reverb = Reverb {
            combs: COMB_TUNING.iter().map(|&n| Comb::new(scaled(n))).collect(),
            allpasses: ALLPASS_TUNING.iter().map(|&n| Allpass::new(scaled(n))).collect(),
        };
        reverb.set_room(room_size, damping);
        reverb
    }

    pub fn set_room(&mut self, room_size: f64, damping: f64) {
        let feedback = (room_size.clamp(0.0, 1.0) * 0.28 + 0.7) as f32;
        let damp = (damping.clamp(0.0, 1.0) * 0.4) as f32;
        for comb in &mut self.combs {
            comb.feedback = feedback;
            comb.damp = damp;
        }
    }

    /// Feed one dry sample, get one wet sample back.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let input = input * INPUT_GAIN;
        let mut out: f32 = self.combs.iter_mut().map(|c| c.process(input)).sum();
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    pub fn clear(&mut self) {
        self.combs.iter_mut().for_each(Comb::clear);
        self.allpasses.iter_mut().for_each(Allpass::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    #[test]
    fn impulse_leaves_a_tail() {
        let mut reverb = Reverb::new(SR, 0.5, 0.5);
        reverb.process(1.0);
        let tail = (0..5000).any(|_| reverb.process(0.0).abs() > 1e-4);
        assert!(tail, "an impulse should ring through the combs");
    }

    #[test]
    fn tail_decays() {
        let mut reverb = Reverb::new(SR, 0.3, 0.5);
        reverb.process(1.0);
        let early = (0..4410).fold(0.0_f32, |m, _| m.max(reverb.process(0.0).abs()));
        for _ in 0..(3.0 * SR) as usize {
            reverb.process(0.0);
        }
        let late = (0..4410).fold(0.0_f32, |m, _| m.max(reverb.process(0.0).abs()));
        assert!(early > 0.0);
        assert!(late < early * 0.1, "tail should fade: early {early}, late {late}");
    }

    #[test]
    fn clear_silences() {
        let mut reverb = Reverb::new(SR, 0.9, 0.1);
        for _ in 0..2000 {
            reverb.process(0.5);
        }
        reverb.clear();
        assert!((0..3000).all(|_| reverb.process(0.0) == 0.0));
    }

    #[test]
    fn low_sample_rates_still_work() {
        let mut reverb = Reverb::new(3000.0, 0.5, 0.5);
        reverb.process(1.0);
        assert!((0..2000).any(|_| reverb.process(0.0) != 0.0));
    }
}
