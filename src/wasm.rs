//! JavaScript bindings. JS owns the clock: every call that depends on time
//! takes `now`, in seconds (e.g. `performance.now() / 1000`).

use js_sys::Function;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::config::HarmonicaConfig;
use crate::dsp::renderer;
use crate::event::{DrumKit, EventPayload, GuitarStyle, KeyNote, StringPluck};
use crate::recorder::{ManualClock, SubscriptionId};
use crate::studio::Studio;
use crate::transcript;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

#[wasm_bindgen]
extern "C" {
    /// Defers a callback until the current call into Rust has returned, so
    /// it can call back into the studio.
    #[wasm_bindgen(js_name = queueMicrotask)]
    fn queue_microtask(callback: &Function);
}

#[wasm_bindgen]
pub struct WasmStudio {
    studio: Studio<ManualClock>,
    clock: ManualClock,
}

#[wasm_bindgen]
impl WasmStudio {
    /// `config` is an optional JSON document; omitted fields take defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<WasmStudio, JsValue> {
        let config = match config {
            Some(json) => HarmonicaConfig::from_json(&json).map_err(js_error)?,
            None => HarmonicaConfig::default(),
        };
        let clock = ManualClock::new();
        let studio = Studio::with_clock(config, clock.clone()).map_err(js_error)?;
        Ok(WasmStudio { studio, clock })
    }

    #[wasm_bindgen(js_name = unlockOutput)]
    pub fn unlock_output(&mut self) -> Result<(), JsValue> {
        self.studio.synth_mut().unlock_output().map_err(js_error)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = playKeyNote)]
    pub fn play_key_note(&mut self, now: f64, note: &str, duration: Option<f64>) -> Result<(), JsValue> {
        self.clock.set(now);
        let payload = EventPayload::Keys(KeyNote::named(note));
        self.studio.perform(payload, duration).map_err(js_error)
    }

    /// Press a held key. It sounds until `noteOff`.
    #[wasm_bindgen(js_name = noteOn)]
    pub fn note_on(&mut self, now: f64, midi: i32, velocity: Option<f64>) -> Result<(), JsValue> {
        self.clock.set(now);
        self.studio.note_on(midi, velocity.unwrap_or(1.0)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = noteOff)]
    pub fn note_off(&mut self, now: f64, midi: i32) -> bool {
        self.clock.set(now);
        self.studio.note_off(midi)
    }

    #[wasm_bindgen(js_name = allNotesOff)]
    pub fn all_notes_off(&mut self, now: f64) -> usize {
        self.clock.set(now);
        self.studio.all_notes_off()
    }

    #[wasm_bindgen(js_name = playPercussionVoice)]
    pub fn play_percussion_voice(&mut self, now: f64, voice: &str, kit: &str) -> Result<(), JsValue> {
        self.clock.set(now);
        let payload = EventPayload::percussion(voice, DrumKit::from_name(kit));
        self.studio.perform(payload, None).map_err(js_error)
    }

    #[wasm_bindgen(js_name = playPluckedString)]
    pub fn play_plucked_string(
        &mut self,
        now: f64,
        string_index: usize,
        style: &str,
        octave_shift: i32,
        semitone_offset: Option<f64>,
        frequency: Option<f64>,
        held: Option<f64>,
    ) -> Result<(), JsValue> {
        self.clock.set(now);
        let payload = EventPayload::String(StringPluck {
            string_index,
            semitone_offset,
            frequency,
            style: GuitarStyle::from_name(style),
            octave_shift,
        });
        self.studio.perform(payload, held).map_err(js_error)
    }

    #[wasm_bindgen(js_name = playPadVoice)]
    pub fn play_pad_voice(&mut self, now: f64, pad_index: i32) -> Result<(), JsValue> {
        self.clock.set(now);
        self.studio.perform(EventPayload::pad(pad_index), None).map_err(js_error)
    }

    #[wasm_bindgen(js_name = startRecording)]
    pub fn start_recording(&mut self, now: f64) {
        self.clock.set(now);
        self.studio.recorder_mut().start_recording();
    }

    #[wasm_bindgen(js_name = stopRecording)]
    pub fn stop_recording(&mut self, now: f64) {
        self.clock.set(now);
        self.studio.recorder_mut().stop_recording();
    }

    pub fn play(&mut self, now: f64) -> bool {
        self.clock.set(now);
        self.studio.play()
    }

    pub fn stop(&mut self) {
        self.studio.recorder_mut().stop();
    }

    /// Fire due playback callbacks. Call from `requestAnimationFrame` or the
    /// worklet message loop.
    pub fn tick(&mut self, now: f64) -> usize {
        self.clock.set(now);
        self.studio.tick()
    }

    /// Fill `out` with the next block of mono output.
    pub fn render(&mut self, out: &mut [f32]) {
        self.studio.synth_mut().render(out);
    }

    #[wasm_bindgen(js_name = setMasterVolume)]
    pub fn set_master_volume(&mut self, volume: f64) {
        self.studio.synth_mut().set_master_gain(volume);
    }

    #[wasm_bindgen(js_name = getMasterVolume)]
    pub fn master_volume(&self) -> f64 {
        self.studio.synth().master_gain()
    }

    #[wasm_bindgen(js_name = setReverbWet)]
    pub fn set_reverb_wet(&mut self, wet: f64) {
        self.studio.synth_mut().set_reverb_wet(wet);
    }

    #[wasm_bindgen(js_name = getReverbWet)]
    pub fn reverb_wet(&self) -> f64 {
        self.studio.synth().reverb_wet()
    }

    /// The most recent output samples, oldest first.
    #[wasm_bindgen(js_name = getWaveform)]
    pub fn waveform(&self) -> Vec<f32> {
        self.studio.synth().analyser_waveform()
    }

    /// Output magnitude spectrum in dB per bin.
    #[wasm_bindgen(js_name = getSpectrum)]
    pub fn spectrum(&self) -> Vec<f32> {
        self.studio.synth().analyser_spectrum()
    }

    #[wasm_bindgen(js_name = getOutputLevel)]
    pub fn output_level(&self) -> f32 {
        self.studio.synth().output_level()
    }

    /// Call `callback` (with no arguments) after every state change. It runs
    /// once the triggering call has returned, so it may read any getter.
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn on_state_change(&mut self, callback: Function) -> u32 {
        let id = self
            .studio
            .recorder_mut()
            .on_state_change(move || queue_microtask(&callback));
        id.into()
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        let removed = self.studio.recorder_mut().unsubscribe(SubscriptionId::from(id));
        if !removed {
            warn!(id, "unsubscribe: no such subscription");
        }
        removed
    }

    #[wasm_bindgen(js_name = toggleLoop)]
    pub fn toggle_loop(&mut self) -> bool {
        self.studio.recorder_mut().toggle_loop()
    }

    #[wasm_bindgen(js_name = setTempo)]
    pub fn set_tempo(&mut self, bpm: f64) {
        self.studio.recorder_mut().set_tempo(bpm);
    }

    #[wasm_bindgen(js_name = getTempo)]
    pub fn tempo(&self) -> f64 {
        self.studio.recorder().tempo()
    }

    #[wasm_bindgen(js_name = isRecording)]
    pub fn is_recording(&self) -> bool {
        self.studio.recorder().is_recording()
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.studio.recorder().is_playing()
    }

    #[wasm_bindgen(js_name = isLooping)]
    pub fn is_looping(&self) -> bool {
        self.studio.recorder().is_looping()
    }

    #[wasm_bindgen(js_name = hasRecording)]
    pub fn has_recording(&self) -> bool {
        self.studio.recorder().has_recording()
    }

    #[wasm_bindgen(js_name = clearCurrentTrack)]
    pub fn clear_current_track(&mut self) {
        self.studio.recorder_mut().clear_current_track();
    }

    #[wasm_bindgen(js_name = newTrack)]
    pub fn new_track(&mut self) -> u32 {
        self.studio.recorder_mut().new_track()
    }

    #[wasm_bindgen(js_name = switchTrack)]
    pub fn switch_track(&mut self, id: u32) -> bool {
        self.studio.recorder_mut().switch_track(id)
    }

    #[wasm_bindgen(js_name = trackIds)]
    pub fn track_ids(&self) -> Vec<u32> {
        self.studio.recorder().track_ids()
    }

    #[wasm_bindgen(js_name = currentTrackId)]
    pub fn current_track_id(&self) -> u32 {
        self.studio.recorder().current_track_id()
    }

    /// The current track's events as plain JS objects.
    #[wasm_bindgen(js_name = getCurrentTrack)]
    pub fn current_track(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.studio.recorder().current_track().events())
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = exportTrack)]
    pub fn export_track(&self) -> Result<String, JsValue> {
        self.studio.recorder().export_track().map_err(js_error)
    }

    #[wasm_bindgen(js_name = importTrack)]
    pub fn import_track(&mut self, json: &str) -> Result<usize, JsValue> {
        self.studio.recorder_mut().import_track(json).map_err(js_error)
    }
}

/// WASM-exposed: render a transcript to a WAV byte array.
#[wasm_bindgen]
pub fn bounce_track_wav(json: &str, bpm: f64, sample_rate: f64) -> Result<Vec<u8>, JsValue> {
    let events = transcript::import_events(json).map_err(js_error)?;
    let mut config = HarmonicaConfig::default();
    config.synth.sample_rate = sample_rate;
    renderer::render_wav(&events, bpm, &config).map_err(js_error)
}
