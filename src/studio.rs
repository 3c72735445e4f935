//! The composition root: one synth and one recording manager, wired together.
//! Hosts own a `Studio` and hand out references to whatever needs it.

use std::collections::HashMap;

use tracing::debug;

use crate::config::HarmonicaConfig;
use crate::error::HarmonicaError;
use crate::event::{EventPayload, KeyNote, PerformanceEvent};
use crate::recorder::{Clock, RecordingManager, SystemClock};
use crate::synth::Synth;

pub struct Studio<C: Clock = SystemClock> {
    synth: Synth,
    recorder: RecordingManager<C>,
    /// Clock time each held key went down.
    pressed: HashMap<i32, f64>,
}

impl Studio<SystemClock> {
    pub fn new(config: HarmonicaConfig) -> Result<Self, HarmonicaError> {
        Studio::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> Studio<C> {
    pub fn with_clock(config: HarmonicaConfig, clock: C) -> Result<Self, HarmonicaError> {
        config.validate()?;
        Ok(Studio {
            synth: Synth::new(config.synth),
            recorder: RecordingManager::with_clock(config.session, clock),
            pressed: HashMap::new(),
        })
    }

    pub fn synth(&self) -> &Synth {
        &self.synth
    }

    pub fn synth_mut(&mut self) -> &mut Synth {
        &mut self.synth
    }

    pub fn recorder(&self) -> &RecordingManager<C> {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut RecordingManager<C> {
        &mut self.recorder
    }

    /// A live note or hit from the player: sound it now and capture it if a
    /// take is running. A live gesture is also the moment to unlock output.
    pub fn perform(
        &mut self,
        payload: EventPayload,
        duration_seconds: Option<f64>,
    ) -> Result<(), HarmonicaError> {
        if let Err(err) = self.synth.unlock_output() {
            debug!(%err, "output still locked");
        }
        let mut event = PerformanceEvent::new(payload.clone(), 0.0);
        event.duration_seconds = duration_seconds;
        self.recorder.record_note(payload, duration_seconds);
        self.synth.trigger(&event)
    }

    /// A key pressed on a held keyboard. It sounds until [`Studio::note_off`].
    pub fn note_on(&mut self, midi: i32, velocity: f64) -> Result<(), HarmonicaError> {
        if let Err(err) = self.synth.unlock_output() {
            debug!(%err, "output still locked");
        }
        self.synth.note_on(midi, velocity)?;
        self.pressed.insert(midi, self.recorder.clock().now());
        Ok(())
    }

    /// Release a held key. While recording, the key is captured at its press
    /// time with the time it was held.
    pub fn note_off(&mut self, midi: i32) -> bool {
        let released = self.synth.note_off(midi);
        if let Some(pressed_at) = self.pressed.remove(&midi) {
            let held = self.recorder.clock().now() - pressed_at;
            let payload = EventPayload::Keys(KeyNote {
                midi: Some(midi),
                ..KeyNote::named("")
            });
            self.recorder.record_note_at(payload, pressed_at, Some(held));
        }
        released
    }

    /// Release every held key, recording each as [`Studio::note_off`] would.
    pub fn all_notes_off(&mut self) -> usize {
        let keys: Vec<i32> = self.pressed.keys().copied().collect();
        let released = keys.into_iter().filter(|&midi| self.note_off(midi)).count();
        released + self.synth.all_notes_off()
    }

    /// Play the current track through the synth.
    pub fn play(&mut self) -> bool {
        self.recorder.play(&mut self.synth)
    }

    /// Fire due playback callbacks. Call often: from the host's event loop,
    /// animation frame, or audio callback.
    pub fn tick(&mut self) -> usize {
        self.recorder.tick(&mut self.synth)
    }

    /// Fire due callbacks, then pull the next block of output.
    pub fn process(&mut self, out: &mut [f32]) -> usize {
        let fired = self.tick();
        self.synth.render(out);
        fired
    }
}
