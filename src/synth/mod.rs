//! Synthesis engine: builds one self-stopping voice per trigger and plays it
//! into a lazily created output context.

pub mod keys;
pub mod pad;
pub mod percussion;
pub mod strings;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, warn};

use crate::config::SynthConfig;
use crate::dsp::output::{OutputContext, OutputState};
use crate::dsp::voice::Voice;
use crate::error::{HarmonicaError, OutputError};
use crate::event::{DrumKit, EventPayload, GuitarStyle, KeyNote, PerformanceEvent, StringInput};
use crate::recorder::EventRenderer;

pub use keys::DEFAULT_KEY_DURATION;

pub struct Synth {
    config: SynthConfig,
    output: Option<OutputContext>,
    rng: SmallRng,
}

impl Synth {
    pub fn new(config: SynthConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.noise_seed);
        Synth {
            config,
            output: None,
            rng,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// The output context, created on first use.
    fn ensure_output(&mut self) -> Result<&mut OutputContext, OutputError> {
        let ctx = match self.output.take() {
            Some(ctx) => ctx,
            None => OutputContext::new(&self.config)?,
        };
        Ok(self.output.insert(ctx))
    }

    /// Create the output context if needed and resume it if suspended.
    /// Calling this on a running context does nothing.
    pub fn unlock_output(&mut self) -> Result<OutputState, HarmonicaError> {
        Ok(self.ensure_output()?.resume()?)
    }

    /// `None` until something has needed the output.
    pub fn output_state(&self) -> Option<OutputState> {
        self.output.as_ref().map(OutputContext::state)
    }

    /// Seconds of audio rendered by the output so far.
    pub fn current_time(&self) -> f64 {
        self.output.as_ref().map_or(0.0, OutputContext::current_time)
    }

    pub fn active_voices(&self) -> usize {
        self.output.as_ref().map_or(0, OutputContext::active_voices)
    }

    /// Shut the output down. Later unlocks are refused.
    pub fn close_output(&mut self) -> Result<(), HarmonicaError> {
        self.ensure_output()?.close();
        Ok(())
    }

    pub fn master_gain(&self) -> f64 {
        self.config.master_gain
    }

    /// Master volume. Negative and NaN are treated as silence.
    pub fn set_master_gain(&mut self, gain: f64) {
        let gain = if gain.is_nan() { 0.0 } else { gain.max(0.0) };
        self.config.master_gain = gain;
        if let Some(ctx) = self.output.as_mut() {
            ctx.set_master_gain(gain);
        }
    }

    pub fn reverb_wet(&self) -> f64 {
        self.config.reverb_wet
    }

    /// Reverb send level, clamped to 0..=1.
    pub fn set_reverb_wet(&mut self, wet: f64) {
        let wet = if wet.is_nan() { 0.0 } else { wet.clamp(0.0, 1.0) };
        self.config.reverb_wet = wet;
        if let Some(ctx) = self.output.as_mut() {
            ctx.set_reverb_wet(wet);
        }
    }

    /// The last block of output samples, oldest first. Empty before the
    /// output exists.
    pub fn analyser_waveform(&self) -> Vec<f32> {
        self.output
            .as_ref()
            .map_or_else(Vec::new, |ctx| ctx.analyser().waveform())
    }

    /// Output spectrum in dB per bin. Empty before the output exists.
    pub fn analyser_spectrum(&self) -> Vec<f32> {
        self.output
            .as_ref()
            .map_or_else(Vec::new, |ctx| ctx.analyser().spectrum())
    }

    /// RMS level of the recent output.
    pub fn output_level(&self) -> f32 {
        self.output.as_ref().map_or(0.0, |ctx| ctx.analyser().level())
    }

    /// Pull the next block of mono samples. Silence before the output exists.
    pub fn render(&mut self, out: &mut [f32]) {
        match self.output.as_mut() {
            Some(ctx) => ctx.render(out),
            None => out.fill(0.0),
        }
    }

    fn start(&mut self, voice: Voice) -> Result<(), HarmonicaError> {
        self.ensure_output()?.start_voice(voice);
        Ok(())
    }

    pub fn play_key_note(&mut self, note: &KeyNote, duration_seconds: f64) -> Result<(), HarmonicaError> {
        let voice = keys::key_voice(note, duration_seconds, self.config.sample_rate);
        self.start(voice)
    }

    /// Start a held key that sounds until [`Synth::note_off`]. Pressing a
    /// key that is already down restarts it instead of doubling it.
    pub fn note_on(&mut self, midi: i32, velocity: f64) -> Result<(), HarmonicaError> {
        let voice = keys::held_key_voice(midi, velocity, self.config.sample_rate);
        self.ensure_output()?.hold_voice(midi, voice);
        Ok(())
    }

    /// Release a held key. False if it was not down.
    pub fn note_off(&mut self, midi: i32) -> bool {
        self.output.as_mut().is_some_and(|ctx| ctx.release_voice(midi))
    }

    /// Release every held key; returns how many were down.
    pub fn all_notes_off(&mut self) -> usize {
        self.output.as_mut().map_or(0, OutputContext::release_all)
    }

    pub fn held_notes(&self) -> Vec<i32> {
        self.output.as_ref().map_or_else(Vec::new, OutputContext::held_keys)
    }

    pub fn play_percussion_voice(&mut self, voice_id: &str, kit: DrumKit) -> Result<(), HarmonicaError> {
        let voice = percussion::drum_voice(voice_id, kit, &mut self.rng, self.config.sample_rate);
        self.start(voice)
    }

    pub fn play_plucked_string(
        &mut self,
        input: impl Into<StringInput>,
        style: GuitarStyle,
        octave_shift: i32,
    ) -> Result<(), HarmonicaError> {
        self.pluck(input.into(), style, octave_shift, None)
    }

    fn pluck(
        &mut self,
        input: StringInput,
        style: GuitarStyle,
        octave_shift: i32,
        held: Option<f64>,
    ) -> Result<(), HarmonicaError> {
        let voice = strings::pluck_voice(
            input,
            style,
            octave_shift,
            held,
            &mut self.rng,
            self.config.sample_rate,
        );
        self.start(voice)
    }

    pub fn play_pad_voice(&mut self, pad_index: i32) -> Result<(), HarmonicaError> {
        let voice = pad::pad_voice(pad_index, self.config.sample_rate);
        self.start(voice)
    }

    /// Play any recorded event with the instrument it names.
    pub fn trigger(&mut self, event: &PerformanceEvent) -> Result<(), HarmonicaError> {
        match &event.payload {
            EventPayload::Keys(note) => {
                let duration = event.duration_seconds.unwrap_or(DEFAULT_KEY_DURATION);
                self.play_key_note(note, duration)
            }
            EventPayload::Percussion(hit) => self.play_percussion_voice(&hit.voice, hit.kit),
            EventPayload::String(pluck) => self.pluck(
                pluck.input(),
                pluck.style,
                pluck.octave_shift,
                event.duration_seconds,
            ),
            EventPayload::Pad(pad) => self.play_pad_voice(pad.pad_index),
        }
    }
}

impl EventRenderer for Synth {
    fn render_event(&mut self, event: &PerformanceEvent) {
        if let Err(err) = self.trigger(event) {
            warn!(kind = ?event.kind(), %err, "scheduled event dropped");
        }
    }

    fn prepare_output(&mut self) -> Result<(), HarmonicaError> {
        let state = self.unlock_output()?;
        debug!(?state, "output prepared for playback");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> Synth {
        Synth::new(SynthConfig {
            start_suspended: false,
            ..SynthConfig::default()
        })
    }

    fn block(synth: &mut Synth, len: usize) -> Vec<f32> {
        let mut out = vec![0.0_f32; len];
        synth.render(&mut out);
        out
    }

    #[test]
    fn output_is_created_lazily() {
        let mut synth = Synth::new(SynthConfig::default());
        assert_eq!(synth.output_state(), None);
        assert!(block(&mut synth, 64).iter().all(|&s| s == 0.0));

        synth.play_pad_voice(0).unwrap();
        assert_eq!(synth.output_state(), Some(OutputState::Suspended));
        assert_eq!(synth.active_voices(), 1);
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut synth = Synth::new(SynthConfig::default());
        assert_eq!(synth.unlock_output().unwrap(), OutputState::Running);
        assert_eq!(synth.unlock_output().unwrap(), OutputState::Running);
    }

    #[test]
    fn closed_output_refuses_unlock() {
        let mut synth = running();
        synth.close_output().unwrap();
        assert!(matches!(
            synth.unlock_output(),
            Err(HarmonicaError::Output(OutputError::Closed))
        ));
    }

    #[test]
    fn invalid_sample_rate_surfaces_on_play() {
        let mut synth = Synth::new(SynthConfig {
            sample_rate: 0.0,
            ..SynthConfig::default()
        });
        let err = synth.play_key_note(&KeyNote::named("C4"), 0.5).unwrap_err();
        assert!(matches!(err, HarmonicaError::Output(OutputError::InvalidSampleRate(_))));
        assert_eq!(synth.output_state(), None);
    }

    #[test]
    fn every_instrument_is_audible() {
        let events = [
            PerformanceEvent::new(EventPayload::keys("C4"), 0.0),
            PerformanceEvent::new(EventPayload::percussion("kick", DrumKit::Acoustic), 0.0),
            PerformanceEvent::new(EventPayload::percussion("hihat", DrumKit::Electronic), 0.0),
            PerformanceEvent::new(EventPayload::string(0usize, GuitarStyle::Electric, 0), 0.0),
            PerformanceEvent::new(EventPayload::pad(2), 0.0),
        ];
        for event in &events {
            let mut synth = running();
            synth.trigger(event).unwrap();
            let out = block(&mut synth, 2048);
            assert!(
                out.iter().any(|s| s.abs() > 0.01),
                "{:?} should produce sound",
                event.kind()
            );
        }
    }

    #[test]
    fn voices_retire_after_they_stop() {
        let mut synth = running();
        synth.play_key_note(&KeyNote::named("A4"), 0.1).unwrap();
        synth.play_percussion_voice("hihat", DrumKit::Acoustic).unwrap();
        assert_eq!(synth.active_voices(), 2);
        block(&mut synth, 44100 / 5);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn polyphony_is_unbounded() {
        let mut synth = running();
        for i in 0..64 {
            synth.play_pad_voice(i).unwrap();
        }
        assert_eq!(synth.active_voices(), 64);
        let out = block(&mut synth, 512);
        assert!(out.iter().all(|s| s.abs() <= 1.0), "master bus should soft clip");
    }

    #[test]
    fn held_key_uses_event_duration() {
        let mut synth = running();
        let event = PerformanceEvent::new(EventPayload::keys("E4"), 0.0).held_for(1.0);
        synth.trigger(&event).unwrap();
        block(&mut synth, 44100 * 3 / 4);
        assert_eq!(synth.active_voices(), 1, "a 1 s note should outlive 0.75 s");
        block(&mut synth, 44100 / 2);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn same_seed_renders_identically() {
        let render = || {
            let mut synth = running();
            synth.play_percussion_voice("snare", DrumKit::Acoustic).unwrap();
            block(&mut synth, 4096)
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn note_on_holds_until_note_off() {
        let mut synth = running();
        synth.note_on(60, 0.8).unwrap();
        block(&mut synth, 44100);
        assert_eq!(synth.active_voices(), 1, "held key outlives any one-shot voice");
        assert_eq!(synth.held_notes(), vec![60]);

        assert!(synth.note_off(60));
        assert!(!synth.note_off(60), "already released");
        assert!(synth.held_notes().is_empty());
        block(&mut synth, 2048);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn repeated_note_on_keeps_one_voice_per_key() {
        let mut synth = running();
        synth.note_on(64, 1.0).unwrap();
        synth.note_on(64, 1.0).unwrap();
        synth.note_on(67, 1.0).unwrap();
        block(&mut synth, 2048);
        assert_eq!(synth.active_voices(), 2);
        assert_eq!(synth.held_notes().len(), 2);

        assert_eq!(synth.all_notes_off(), 2);
        block(&mut synth, 2048);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn note_off_without_output_is_false() {
        let mut synth = Synth::new(SynthConfig::default());
        assert!(!synth.note_off(60));
        assert_eq!(synth.all_notes_off(), 0);
        assert_eq!(synth.output_state(), None);
    }

    #[test]
    fn master_gain_scales_output() {
        let mut loud = running();
        let mut quiet = running();
        quiet.set_master_gain(0.1);
        for synth in [&mut loud, &mut quiet] {
            synth.note_on(69, 1.0).unwrap();
        }
        let a = block(&mut loud, 1024);
        let b = block(&mut quiet, 1024);
        let peak = |v: &[f32]| v.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak(&b) < peak(&a) * 0.2, "quiet {} vs loud {}", peak(&b), peak(&a));
        assert_eq!(quiet.master_gain(), 0.1);
        quiet.set_master_gain(-2.0);
        assert_eq!(quiet.master_gain(), 0.0);
    }

    #[test]
    fn settings_made_before_output_apply_later() {
        let mut synth = running();
        synth.set_master_gain(0.0);
        synth.set_reverb_wet(0.7);
        synth.note_on(60, 1.0).unwrap();
        assert!(block(&mut synth, 512).iter().all(|&s| s == 0.0));
        assert_eq!(synth.reverb_wet(), 0.7);
    }

    #[test]
    fn analyser_follows_output() {
        let mut synth = running();
        assert!(synth.analyser_waveform().is_empty());
        assert_eq!(synth.output_level(), 0.0);
        synth.play_pad_voice(0).unwrap();
        block(&mut synth, 2048);
        assert!(synth.output_level() > 0.01);
        assert_eq!(synth.analyser_spectrum().len(), crate::dsp::analyser::ANALYSER_SIZE / 2);
    }
}
