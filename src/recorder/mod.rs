//! Recording manager: captures performances as timestamped events and plays
//! them back with tempo scaling and optional looping.
//!
//! Playback is cooperative: `play()` schedules one timer per event plus an
//! end-of-pass timer, and the host calls `tick()` from its event loop (or
//! audio callback) to fire whatever is due. A host that stops ticking for a
//! while (a background tab) does not get the missed events in one burst:
//! events later than `max_lateness_seconds` are skipped and a looping pass
//! restarts from the current time. Every state-affecting operation notifies
//! subscribers, who then read back whatever state they need.

pub mod clock;
pub mod schedule;

use std::collections::BTreeMap;
use std::mem;

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::HarmonicaError;
use crate::event::{EventPayload, PerformanceEvent, Track, TrackId};
use crate::transcript;

pub use clock::{Clock, ManualClock, SystemClock};
use schedule::{TimerAction, TimerQueue};

/// Something that can sound a recorded event, usually the synth.
pub trait EventRenderer {
    fn render_event(&mut self, event: &PerformanceEvent);

    /// Called at the start of `play()`. Failures are logged and ignored.
    fn prepare_output(&mut self) -> Result<(), HarmonicaError> {
        Ok(())
    }
}

/// Handle returned by `on_state_change`. Converts to and from `u32` so it
/// can cross into JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

impl From<SubscriptionId> for u32 {
    fn from(id: SubscriptionId) -> u32 {
        id.0
    }
}

impl From<u32> for SubscriptionId {
    fn from(raw: u32) -> SubscriptionId {
        SubscriptionId(raw)
    }
}

/// Shape of one playback run, fixed when `play()` is called.
#[derive(Debug, Clone)]
struct Pass {
    events: Vec<PerformanceEvent>,
    /// Seconds of playback per recorded second.
    multiplier: f64,
    /// Seconds from pass start to the end-of-pass timer.
    length: f64,
}

/// A pass must take some time or a looping pass would spin forever.
const MIN_PASS_SECONDS: f64 = 0.01;

pub struct RecordingManager<C: Clock = SystemClock> {
    clock: C,
    config: SessionConfig,
    /// The track subject to record, play and clear.
    track: Track,
    /// Every other track, by id.
    archive: BTreeMap<TrackId, Track>,
    next_track_id: TrackId,
    recording: bool,
    playing: bool,
    looping: bool,
    recording_started_at: f64,
    tempo: f64,
    timers: TimerQueue,
    pass: Option<Pass>,
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut()>)>,
    next_subscription: u32,
}

impl RecordingManager<SystemClock> {
    pub fn new(config: SessionConfig) -> Self {
        RecordingManager::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> RecordingManager<C> {
    pub fn with_clock(config: SessionConfig, clock: C) -> Self {
        let tempo = config.clamp_tempo(config.default_bpm);
        RecordingManager {
            clock,
            config,
            track: Track::new(0),
            archive: BTreeMap::new(),
            next_track_id: 1,
            recording: false,
            playing: false,
            looping: false,
            recording_started_at: 0.0,
            tempo,
            timers: TimerQueue::new(),
            pass: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Begin a fresh take on the current track. Cancels playback and throws
    /// away the track's previous events. Does nothing if already recording.
    pub fn start_recording(&mut self) {
        if self.recording {
            return;
        }
        self.cancel_playback();
        self.recording_started_at = self.clock.now();
        self.track.clear();
        self.recording = true;
        info!(track = self.track.id, "recording started");
        self.notify();
    }

    pub fn stop_recording(&mut self) {
        if self.recording {
            self.recording = false;
            info!(
                track = self.track.id,
                events = self.current_track().len(),
                "recording stopped"
            );
        }
        self.notify();
    }

    /// Append an event stamped with the time since recording started.
    /// Returns false (and records nothing) when not recording.
    pub fn record_note(&mut self, payload: EventPayload, duration_seconds: Option<f64>) -> bool {
        let now = self.clock.now();
        self.record_note_at(payload, now, duration_seconds)
    }

    /// Append an event that began at clock time `started_at`, for a held key
    /// whose length is only known once it is released. A start before the
    /// take began counts as the start of the take.
    pub fn record_note_at(
        &mut self,
        payload: EventPayload,
        started_at: f64,
        duration_seconds: Option<f64>,
    ) -> bool {
        if !self.recording {
            return false;
        }
        let offset = (started_at - self.recording_started_at).max(0.0);
        let mut event = PerformanceEvent::new(payload, offset);
        event.duration_seconds = duration_seconds.filter(|d| d.is_finite() && *d >= 0.0);
        debug!(kind = ?event.kind(), offset = event.timestamp_offset_seconds, "note recorded");
        self.track.push(event);
        true
    }

    /// Play the current track from the top. Returns false for an empty track.
    pub fn play(&mut self, renderer: &mut impl EventRenderer) -> bool {
        self.cancel_playback();

        if let Err(err) = renderer.prepare_output() {
            warn!(%err, "output unavailable, playback continues silently");
        }

        let track = &self.track;
        if track.is_empty() {
            debug!(track = track.id, "nothing to play");
            self.notify();
            return false;
        }

        let multiplier = self.config.reference_bpm / self.tempo;
        let length = (track.span_seconds() * multiplier + self.config.trailing_pad_seconds)
            .max(MIN_PASS_SECONDS);
        let pass = Pass {
            events: track.events().to_vec(),
            multiplier,
            length,
        };
        let start = self.clock.now();
        info!(
            track = self.track.id,
            events = pass.events.len(),
            tempo = self.tempo,
            pass_seconds = pass.length,
            "playback started"
        );
        self.schedule_pass(&pass, start);
        self.pass = Some(pass);
        self.playing = true;
        self.notify();
        true
    }

    /// Cancel every pending callback. Calling it again, or after playback
    /// ended on its own, has no further effect.
    pub fn stop(&mut self) {
        let was_playing = self.playing;
        self.cancel_playback();
        if was_playing {
            info!(track = self.track.id, "playback stopped");
            self.notify();
        }
    }

    /// Fire every callback due by now. Returns how many events were rendered.
    /// Events overdue by more than `max_lateness_seconds` are skipped.
    pub fn tick(&mut self, renderer: &mut impl EventRenderer) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        let mut skipped = 0;
        while let Some((due, action)) = self.timers.pop_due(now) {
            match action {
                TimerAction::Fire(_) if now - due > self.config.max_lateness_seconds => {
                    skipped += 1;
                }
                TimerAction::Fire(event) => {
                    renderer.render_event(&event);
                    fired += 1;
                }
                TimerAction::EndOfPass => self.end_pass(due, now),
            }
        }
        if skipped > 0 {
            debug!(skipped, "late events skipped");
        }
        fired
    }

    /// Callbacks still waiting to fire, end-of-pass included.
    pub fn pending_callbacks(&self) -> usize {
        self.timers.pending()
    }

    /// Flip looping. A pass already under way always runs to its end; the
    /// flag is read when it finishes.
    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        debug!(looping = self.looping, "loop toggled");
        self.notify();
        self.looping
    }

    /// Set the playback tempo, clamped to the configured range. Takes effect
    /// on the next `play()`. NaN is ignored.
    pub fn set_tempo(&mut self, bpm: f64) {
        if bpm.is_nan() {
            return;
        }
        self.tempo = self.config.clamp_tempo(bpm);
        self.notify();
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    fn schedule_pass(&mut self, pass: &Pass, start: f64) {
        for event in &pass.events {
            let due = start + event.timestamp_offset_seconds * pass.multiplier;
            self.timers.schedule(due, TimerAction::Fire(event.clone()));
        }
        self.timers.schedule(start + pass.length, TimerAction::EndOfPass);
    }

    /// A pass that ended on time restarts seamlessly at its due time. One
    /// whose whole successor would already be over restarts at `now`.
    fn end_pass(&mut self, due: f64, now: f64) {
        if self.looping {
            if let Some(pass) = self.pass.take() {
                let start = if due + pass.length <= now { now } else { due };
                debug!(at = start, late = now - due, "loop restart");
                self.schedule_pass(&pass, start);
                self.pass = Some(pass);
                return;
            }
        }
        self.playing = false;
        self.pass = None;
        info!(track = self.track.id, "playback finished");
        self.notify();
    }

    fn cancel_playback(&mut self) {
        self.timers.cancel_all();
        self.pass = None;
        self.playing = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn has_recording(&self) -> bool {
        !self.current_track().is_empty()
    }

    pub fn current_track(&self) -> &Track {
        &self.track
    }

    /// Stop playback, empty the current track and turn looping off.
    pub fn clear_current_track(&mut self) {
        self.cancel_playback();
        self.track.clear();
        self.looping = false;
        info!(track = self.track.id, "track cleared");
        self.notify();
    }

    /// Keep the current track and switch to a new, empty one.
    pub fn new_track(&mut self) -> TrackId {
        let id = self.next_track_id;
        self.next_track_id += 1;
        let previous = mem::replace(&mut self.track, Track::new(id));
        self.archive.insert(previous.id, previous);
        debug!(track = id, "new track");
        self.notify();
        id
    }

    /// Select a stored track. Unknown ids leave the selection alone.
    pub fn switch_track(&mut self, id: TrackId) -> bool {
        let known = id == self.track.id || self.archive.contains_key(&id);
        if let Some(next) = self.archive.remove(&id) {
            let previous = mem::replace(&mut self.track, next);
            self.archive.insert(previous.id, previous);
        }
        self.notify();
        known
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.archive.keys().copied().collect();
        ids.push(self.track.id);
        ids.sort_unstable();
        ids
    }

    pub fn current_track_id(&self) -> TrackId {
        self.track.id
    }

    pub fn export_track(&self) -> Result<String, HarmonicaError> {
        transcript::export_events(self.current_track().events())
    }

    /// Replace the current track with a parsed transcript. On any error the
    /// track and playback are left as they were.
    pub fn import_track(&mut self, source: &str) -> Result<usize, HarmonicaError> {
        let events = match transcript::import_events(source) {
            Ok(events) => events,
            Err(err) => {
                warn!(%err, "transcript rejected");
                return Err(err.into());
            }
        };
        let count = events.len();
        self.load_events(events);
        info!(track = self.track.id, events = count, "transcript imported");
        Ok(count)
    }

    /// Stop playback and replace the current track's events wholesale.
    pub fn load_events(&mut self, events: Vec<PerformanceEvent>) {
        self.cancel_playback();
        self.track.replace(events);
        self.notify();
    }

    /// Register a callback run after every state change. It receives nothing;
    /// read the manager for the new state.
    pub fn on_state_change(&mut self, callback: impl FnMut() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback();
        }
    }
}
