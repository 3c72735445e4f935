//! Output context: the sample clock, run state and master bus that every
//! voice plays into. Hosts (an AudioWorklet, a sound-card callback, the
//! offline renderer) pull mono blocks from it.

use tracing::debug;

use crate::config::SynthConfig;
use crate::error::OutputError;

use super::analyser::Analyser;
use super::mixer::Mixer;
use super::voice::Voice;

/// Time constant and tail for letting go of a held voice.
pub const RELEASE_TAU: f64 = 0.01;
pub const RELEASE_TAIL: f64 = 0.02;

const MIN_SAMPLE_RATE: f64 = 3000.0;
const MAX_SAMPLE_RATE: f64 = 768_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Not producing audio; the clock is frozen. Voices started now wait.
    Suspended,
    Running,
    /// Permanently shut down; cannot be resumed.
    Closed,
}

#[derive(Debug)]
pub struct OutputContext {
    sample_rate: f64,
    state: OutputState,
    mixer: Mixer,
    analyser: Analyser,
    frames_rendered: u64,
}

impl OutputContext {
    pub fn new(config: &SynthConfig) -> Result<Self, OutputError> {
        let rate = config.sample_rate;
        if !rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
            return Err(OutputError::InvalidSampleRate(rate));
        }
        let state = if config.start_suspended {
            OutputState::Suspended
        } else {
            OutputState::Running
        };
        debug!(sample_rate = rate, ?state, "output context created");
        let mut mixer = Mixer::new(config.master_gain, rate);
        mixer.set_reverb_wet(config.reverb_wet);
        Ok(OutputContext {
            sample_rate: rate,
            state,
            mixer,
            analyser: Analyser::new(),
            frames_rendered: 0,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn state(&self) -> OutputState {
        self.state
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate
    }

    /// Resume a suspended context. Resuming a running context is a no-op.
    pub fn resume(&mut self) -> Result<OutputState, OutputError> {
        match self.state {
            OutputState::Closed => Err(OutputError::Closed),
            OutputState::Running => Ok(OutputState::Running),
            OutputState::Suspended => {
                debug!("output context resumed");
                self.state = OutputState::Running;
                Ok(OutputState::Running)
            }
        }
    }

    pub fn suspend(&mut self) {
        if self.state == OutputState::Running {
            self.state = OutputState::Suspended;
        }
    }

    /// Shut the context down for good and drop every live voice.
    pub fn close(&mut self) {
        self.state = OutputState::Closed;
        self.mixer.clear();
        self.analyser.clear();
    }

    pub fn start_voice(&mut self, voice: Voice) {
        if self.state == OutputState::Closed {
            debug!("voice dropped: output context is closed");
            return;
        }
        self.mixer.add(voice);
    }

    /// Start a voice held under `key`. A voice already held under the same
    /// key is released first, so a key never sounds twice.
    pub fn hold_voice(&mut self, key: i32, voice: Voice) {
        if self.state == OutputState::Closed {
            debug!(key, "held voice dropped: output context is closed");
            return;
        }
        self.mixer.hold(key, voice, RELEASE_TAU, RELEASE_TAIL);
    }

    pub fn release_voice(&mut self, key: i32) -> bool {
        self.mixer.release(key, RELEASE_TAU, RELEASE_TAIL)
    }

    pub fn release_all(&mut self) -> usize {
        self.mixer.release_all(RELEASE_TAU, RELEASE_TAIL)
    }

    pub fn held_keys(&self) -> Vec<i32> {
        self.mixer.held_keys()
    }

    pub fn active_voices(&self) -> usize {
        self.mixer.active_voices()
    }

    pub fn master_gain(&self) -> f64 {
        self.mixer.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.mixer.master_gain = gain.max(0.0);
    }

    pub fn set_reverb_wet(&mut self, wet: f64) {
        self.mixer.set_reverb_wet(wet);
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    /// Fill `out` with the next block. Silence unless running.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.state != OutputState::Running {
            out.fill(0.0);
            return;
        }
        self.mixer.render(out);
        self.analyser.push_block(out);
        self.frames_rendered += out.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::Envelope;
    use crate::dsp::oscillator::{Oscillator, Waveform};
    use crate::dsp::voice::Partial;

    fn config(start_suspended: bool) -> SynthConfig {
        SynthConfig {
            start_suspended,
            ..SynthConfig::default()
        }
    }

    fn beep(sr: f64) -> Voice {
        Voice::new(sr, 0.05)
            .with_partial(Partial::oscillator(Oscillator::new(Waveform::Sine, 440.0, sr)))
            .with_amp(Envelope::constant(0.5))
    }

    #[test]
    fn rejects_bad_sample_rate() {
        for rate in [0.0, -44100.0, f64::NAN, 10.0, 1e9] {
            let cfg = SynthConfig {
                sample_rate: rate,
                ..SynthConfig::default()
            };
            assert!(
                matches!(OutputContext::new(&cfg), Err(OutputError::InvalidSampleRate(_))),
                "rate {rate} should be rejected"
            );
        }
    }

    #[test]
    fn suspended_renders_silence_and_freezes_clock() {
        let mut ctx = OutputContext::new(&config(true)).unwrap();
        ctx.start_voice(beep(ctx.sample_rate()));
        let mut out = vec![1.0_f32; 256];
        ctx.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(ctx.current_time(), 0.0);
        assert_eq!(ctx.active_voices(), 1, "voice waits for resume");
    }

    #[test]
    fn resume_is_idempotent() {
        let mut ctx = OutputContext::new(&config(true)).unwrap();
        assert_eq!(ctx.resume(), Ok(OutputState::Running));
        assert_eq!(ctx.resume(), Ok(OutputState::Running));
        assert_eq!(ctx.state(), OutputState::Running);
    }

    #[test]
    fn closed_refuses_resume() {
        let mut ctx = OutputContext::new(&config(false)).unwrap();
        ctx.close();
        assert_eq!(ctx.resume(), Err(OutputError::Closed));
        ctx.start_voice(beep(ctx.sample_rate()));
        assert_eq!(ctx.active_voices(), 0);
    }

    #[test]
    fn running_renders_and_advances() {
        let mut ctx = OutputContext::new(&config(false)).unwrap();
        ctx.start_voice(beep(ctx.sample_rate()));
        let mut out = vec![0.0_f32; 441];
        ctx.render(&mut out);
        assert!(out.iter().any(|s| s.abs() > 0.01));
        assert!((ctx.current_time() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn analyser_sees_what_was_rendered() {
        let mut ctx = OutputContext::new(&config(false)).unwrap();
        assert_eq!(ctx.analyser().level(), 0.0);
        ctx.start_voice(beep(ctx.sample_rate()));
        let mut out = vec![0.0_f32; 1024];
        ctx.render(&mut out);
        assert_eq!(ctx.analyser().waveform(), out);
        assert!(ctx.analyser().level() > 0.05);
    }

    #[test]
    fn reverb_send_comes_from_config() {
        let cfg = SynthConfig {
            reverb_wet: 0.4,
            ..config(false)
        };
        let ctx = OutputContext::new(&cfg).unwrap();
        assert_eq!(ctx.mixer.reverb_wet(), 0.4);
    }
}
