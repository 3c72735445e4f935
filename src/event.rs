//! Performance events and tracks.
//!
//! A [`PerformanceEvent`] is one played note or hit: which instrument family,
//! the kind-specific payload, when it happened relative to the start of the
//! recording, and (for held notes) how long it was held.

use serde::{Deserialize, Serialize};

pub type TrackId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Keys,
    Percussion,
    String,
    Pad,
}

/// A keyboard note. `frequency` wins over `midi`, which wins over `note`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyNote {
    /// Scientific pitch name, e.g. "C4" or "F#3".
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
}

impl KeyNote {
    pub fn named(note: impl Into<String>) -> Self {
        KeyNote {
            note: note.into(),
            midi: None,
            frequency: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumKit {
    #[default]
    Acoustic,
    Electronic,
}

impl DrumKit {
    /// Lenient lookup; anything unrecognised is the acoustic kit.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "electronic" | "electro" | "808" => DrumKit::Electronic,
            _ => DrumKit::Acoustic,
        }
    }
}

/// A drum hit. The voice stays a free-form identifier so unknown voices
/// survive a save/load cycle and still play the fallback tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercussionHit {
    pub voice: String,
    #[serde(default)]
    pub kit: DrumKit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuitarStyle {
    #[default]
    Acoustic,
    Electric,
    Clean,
    Distorted,
}

impl GuitarStyle {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "electric" => GuitarStyle::Electric,
            "clean" => GuitarStyle::Clean,
            "distorted" => GuitarStyle::Distorted,
            _ => GuitarStyle::Acoustic,
        }
    }
}

/// Which pitch a plucked string should sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringInput {
    /// An open string of a standard-tuned guitar, 0 = low E.
    Index(usize),
    /// An explicit frequency (wins if present) or a semitone offset from an
    /// open string.
    Tuned {
        string_index: usize,
        semitone_offset: Option<f64>,
        frequency: Option<f64>,
    },
}

impl From<usize> for StringInput {
    fn from(index: usize) -> Self {
        StringInput::Index(index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringPluck {
    pub string_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semitone_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub style: GuitarStyle,
    #[serde(default)]
    pub octave_shift: i32,
}

impl StringPluck {
    pub fn new(input: impl Into<StringInput>, style: GuitarStyle, octave_shift: i32) -> Self {
        let (string_index, semitone_offset, frequency) = match input.into() {
            StringInput::Index(i) => (i, None, None),
            StringInput::Tuned {
                string_index,
                semitone_offset,
                frequency,
            } => (string_index, semitone_offset, frequency),
        };
        StringPluck {
            string_index,
            semitone_offset,
            frequency,
            style,
            octave_shift,
        }
    }

    pub fn input(&self) -> StringInput {
        if self.semitone_offset.is_none() && self.frequency.is_none() {
            StringInput::Index(self.string_index)
        } else {
            StringInput::Tuned {
                string_index: self.string_index,
                semitone_offset: self.semitone_offset,
                frequency: self.frequency,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PadHit {
    pub pad_index: i32,
}

/// Kind-specific event data, tagged by instrument family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "instrumentKind", content = "payload", rename_all = "lowercase")]
pub enum EventPayload {
    Keys(KeyNote),
    Percussion(PercussionHit),
    String(StringPluck),
    Pad(PadHit),
}

impl EventPayload {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            EventPayload::Keys(_) => InstrumentKind::Keys,
            EventPayload::Percussion(_) => InstrumentKind::Percussion,
            EventPayload::String(_) => InstrumentKind::String,
            EventPayload::Pad(_) => InstrumentKind::Pad,
        }
    }

    pub fn keys(note: impl Into<String>) -> Self {
        EventPayload::Keys(KeyNote::named(note))
    }

    pub fn percussion(voice: impl Into<String>, kit: DrumKit) -> Self {
        EventPayload::Percussion(PercussionHit {
            voice: voice.into(),
            kit,
        })
    }

    pub fn string(input: impl Into<StringInput>, style: GuitarStyle, octave_shift: i32) -> Self {
        EventPayload::String(StringPluck::new(input, style, octave_shift))
    }

    pub fn pad(pad_index: i32) -> Self {
        EventPayload::Pad(PadHit { pad_index })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    /// Seconds since the recording started, never negative.
    pub timestamp_offset_seconds: f64,
    /// How long the note was held; `None` means the instrument default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl PerformanceEvent {
    pub fn new(payload: EventPayload, timestamp_offset_seconds: f64) -> Self {
        PerformanceEvent {
            payload,
            timestamp_offset_seconds: timestamp_offset_seconds.max(0.0),
            duration_seconds: None,
        }
    }

    pub fn held_for(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn kind(&self) -> InstrumentKind {
        self.payload.kind()
    }
}

/// An ordered list of events recorded into one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    events: Vec<PerformanceEvent>,
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        Track {
            id,
            events: Vec::new(),
        }
    }

    /// Events in the order they were recorded.
    pub fn events(&self) -> &[PerformanceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Largest offset in the track. Insertion order is not trusted to be
    /// time order.
    pub fn span_seconds(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.timestamp_offset_seconds)
            .fold(0.0, f64::max)
    }

    pub(crate) fn push(&mut self, event: PerformanceEvent) {
        self.events.push(event);
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    pub(crate) fn replace(&mut self, events: Vec<PerformanceEvent>) {
        self.events = events;
    }
}
