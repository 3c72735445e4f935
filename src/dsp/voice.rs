//! Voice: one self-contained, self-stopping signal graph for a single
//! triggered note or hit.
//!
//! ```text
//! partial ─[filter]─[gain]─┐
//! partial ─[filter]─[gain]─┼─ sum ─[body filter]─[amp]─ out
//! partial ─[filter]─[gain]─┘
//! ```
//!
//! The stop time is fixed when the voice is built; once reached the voice
//! reports itself finished and the mixer drops it. A held voice is built
//! with no stop time and gets one when it is released.

use super::envelope::Envelope;
use super::filter::BiquadFilter;
use super::noise::NoiseBuffer;
use super::oscillator::Oscillator;

#[derive(Debug, Clone)]
pub enum Source {
    Oscillator(Oscillator),
    Noise(NoiseBuffer),
}

impl Source {
    fn next_sample(&mut self, t: f64) -> f64 {
        match self {
            Source::Oscillator(osc) => osc.next_sample(t),
            Source::Noise(buf) => buf.next_sample(),
        }
    }
}

/// One source in a voice with its own optional filter, gain curve and stop time.
#[derive(Debug, Clone)]
pub struct Partial {
    source: Source,
    filter: Option<BiquadFilter>,
    gain: Envelope,
    stop_at: f64,
}

impl Partial {
    pub fn new(source: Source) -> Self {
        Partial {
            source,
            filter: None,
            gain: Envelope::constant(1.0),
            stop_at: f64::INFINITY,
        }
    }

    pub fn oscillator(osc: Oscillator) -> Self {
        Partial::new(Source::Oscillator(osc))
    }

    pub fn noise(buf: NoiseBuffer) -> Self {
        Partial::new(Source::Noise(buf))
    }

    pub fn filtered(mut self, filter: BiquadFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn gain(mut self, gain: Envelope) -> Self {
        self.gain = gain;
        self
    }

    pub fn stop_at(mut self, seconds: f64) -> Self {
        self.stop_at = seconds;
        self
    }

    fn next_sample(&mut self, t: f64) -> f64 {
        if t >= self.stop_at {
            return 0.0;
        }
        let mut s = self.source.next_sample(t);
        if let Some(filter) = self.filter.as_mut() {
            s = filter.process(s);
        }
        s * self.gain.next_value(t)
    }
}

#[derive(Debug, Clone)]
pub struct Voice {
    partials: Vec<Partial>,
    body: Option<BiquadFilter>,
    amp: Envelope,
    stop_at: f64,
    /// Release start and decay time constant, once released.
    release: Option<(f64, f64)>,
    sample_rate: f64,
    elapsed: usize,
}

impl Voice {
    /// An empty voice that stops `stop_at` seconds after it starts.
    pub fn new(sample_rate: f64, stop_at: f64) -> Self {
        Voice {
            partials: Vec::new(),
            body: None,
            amp: Envelope::constant(1.0),
            stop_at: stop_at.max(0.0),
            release: None,
            sample_rate,
            elapsed: 0,
        }
    }

    /// An empty voice that sounds until [`Voice::release`] is called.
    pub fn held(sample_rate: f64) -> Self {
        Voice::new(sample_rate, f64::INFINITY)
    }

    pub fn with_partial(mut self, partial: Partial) -> Self {
        self.partials.push(partial);
        self
    }

    pub fn with_body(mut self, filter: BiquadFilter) -> Self {
        self.body = Some(filter);
        self
    }

    pub fn with_amp(mut self, amp: Envelope) -> Self {
        self.amp = amp;
        self
    }

    /// Seconds from start to the scheduled stop.
    pub fn duration(&self) -> f64 {
        self.stop_at
    }

    pub fn partial_count(&self) -> usize {
        self.partials.len()
    }

    /// Seconds rendered so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed as f64 / self.sample_rate
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed() >= self.stop_at
    }

    /// Decay toward silence from now with time constant `tau` and stop
    /// `tail` seconds later. An earlier stop already scheduled still wins.
    pub fn release(&mut self, tau: f64, tail: f64) {
        let now = self.elapsed();
        if self.release.is_none() {
            self.release = Some((now, tau.max(1e-4)));
        }
        self.stop_at = self.stop_at.min(now + tail.max(0.0));
    }

    pub fn is_released(&self) -> bool {
        self.release.is_some()
    }

    pub fn next_sample(&mut self) -> f64 {
        let t = self.elapsed();
        if t >= self.stop_at {
            return 0.0;
        }
        self.elapsed += 1;

        let mut sum: f64 = self.partials.iter_mut().map(|p| p.next_sample(t)).sum();
        if let Some(body) = self.body.as_mut() {
            sum = body.process(sum);
        }
        let mut gain = self.amp.next_value(t);
        if let Some((start, tau)) = self.release {
            gain *= (-(t - start).max(0.0) / tau).exp();
        }
        sum * gain
    }
}
