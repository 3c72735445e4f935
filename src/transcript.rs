//! JSON export/import of a track ("transcript").
//!
//! Export is a pretty-printed JSON array of [`PerformanceEvent`]s. Import is
//! deliberately forgiving about primitive types (numbers written as strings,
//! note names written as numbers, unknown kit or style names) but strict
//! about structure: the document must be an array and every element must be
//! understood, otherwise nothing is imported.
//!
//! Three older layouts are also read:
//!
//! - live-session records `{timestamp, instrument, data}`, with `timestamp`
//!   in milliseconds, `instrument` one of `piano`/`drums`/`guitar`/`synth`
//!   and `data` a note name, drum id, string index or pad index;
//! - keyboard transcripts `{midi, noteName, start, duration}` in seconds;
//! - guitar sessions `{stringIndex, noteName, start, duration, style}`.

use serde_json::{Map, Value};

use crate::error::{HarmonicaError, ImportError};
use crate::event::{
    DrumKit, EventPayload, GuitarStyle, KeyNote, PadHit, PercussionHit, PerformanceEvent,
    StringPluck,
};

pub fn export_events(events: &[PerformanceEvent]) -> Result<String, HarmonicaError> {
    Ok(serde_json::to_string_pretty(events)?)
}

pub fn import_events(source: &str) -> Result<Vec<PerformanceEvent>, ImportError> {
    let document: Value = serde_json::from_str(source)?;
    let Value::Array(items) = document else {
        return Err(ImportError::NotAnArray);
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            decode_event(item).map_err(|reason| ImportError::InvalidEvent { index, reason })
        })
        .collect()
}

fn decode_event(item: &Value) -> Result<PerformanceEvent, String> {
    let obj = item.as_object().ok_or("expected an object")?;
    if obj.contains_key("instrumentKind") || obj.contains_key("instrument") {
        decode_tagged(obj)
    } else if obj.contains_key("stringIndex") {
        decode_guitar_session(obj)
    } else if obj.contains_key("midi") || obj.contains_key("noteName") {
        decode_keyboard_transcript(obj)
    } else {
        Err("missing instrumentKind".to_string())
    }
}

fn decode_tagged(obj: &Map<String, Value>) -> Result<PerformanceEvent, String> {
    let (kind, live_session) = match obj.get("instrumentKind").and_then(text) {
        Some(kind) => (kind, false),
        None => (
            obj.get("instrument").and_then(text).ok_or("missing instrumentKind")?,
            true,
        ),
    };
    let payload = obj
        .get("payload")
        .or_else(|| obj.get("data"))
        .unwrap_or(&Value::Null);

    let payload = match kind.to_ascii_lowercase().as_str() {
        "keys" | "piano" if live_session => decode_keys(&live_session_note(payload))?,
        "keys" | "piano" => decode_keys(payload)?,
        "percussion" | "drums" => decode_percussion(payload)?,
        "string" | "guitar" => decode_string(payload)?,
        "pad" | "synth" => decode_pad(payload)?,
        other => return Err(format!("unknown instrumentKind '{other}'")),
    };

    let offset = match obj.get("timestampOffsetSeconds") {
        Some(v) => seconds(v, "timestampOffsetSeconds")?,
        None => match obj.get("timestamp") {
            Some(v) => seconds(v, "timestamp")? / 1000.0,
            None => return Err("missing or non-numeric timestampOffsetSeconds".to_string()),
        },
    };
    let duration = optional_seconds(obj, "durationSeconds")?;

    Ok(PerformanceEvent {
        payload,
        timestamp_offset_seconds: offset,
        duration_seconds: duration,
    })
}

/// Live-session keyboards named their upper octave `C2`..`G2` and the home
/// octave with bare names. Rewrite the former to scientific pitch.
fn live_session_note(payload: &Value) -> Value {
    let Some(name) = payload.as_str() else {
        return payload.clone();
    };
    match name.strip_suffix('2') {
        Some(base) if !base.is_empty() && !base.ends_with('-') => Value::String(format!("{base}5")),
        _ => payload.clone(),
    }
}

fn decode_keyboard_transcript(obj: &Map<String, Value>) -> Result<PerformanceEvent, String> {
    let note = KeyNote {
        note: obj.get("noteName").and_then(text).unwrap_or_default(),
        midi: optional_number(obj, "midi")?.map(|m| m.round() as i32),
        frequency: None,
    };
    if note.note.is_empty() && note.midi.is_none() {
        return Err("keyboard entry needs a midi number or noteName".to_string());
    }
    Ok(PerformanceEvent {
        payload: EventPayload::Keys(note),
        timestamp_offset_seconds: start_of(obj)?,
        duration_seconds: optional_seconds(obj, "duration")?,
    })
}

fn decode_guitar_session(obj: &Map<String, Value>) -> Result<PerformanceEvent, String> {
    let index = obj
        .get("stringIndex")
        .and_then(number)
        .ok_or("stringIndex is not a number")?;
    let style = obj
        .get("style")
        .and_then(text)
        .map(|s| GuitarStyle::from_name(&s))
        .unwrap_or_default();
    Ok(PerformanceEvent {
        payload: EventPayload::String(StringPluck::new(string_index(index)?, style, 0)),
        timestamp_offset_seconds: start_of(obj)?,
        duration_seconds: optional_seconds(obj, "duration")?,
    })
}

fn start_of(obj: &Map<String, Value>) -> Result<f64, String> {
    match obj.get("start") {
        Some(v) => seconds(v, "start"),
        None => Err("missing start".to_string()),
    }
}

/// A required non-negative time value.
fn seconds(value: &Value, field: &str) -> Result<f64, String> {
    let v = number(value).ok_or_else(|| format!("missing or non-numeric {field}"))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("{field} must be >= 0, got {v}"));
    }
    Ok(v)
}

fn optional_seconds(obj: &Map<String, Value>, field: &str) -> Result<Option<f64>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let d = number(v).ok_or_else(|| format!("non-numeric {field}"))?;
            if !d.is_finite() || d < 0.0 {
                return Err(format!("{field} must be >= 0, got {d}"));
            }
            Ok(Some(d))
        }
    }
}

fn decode_keys(payload: &Value) -> Result<EventPayload, String> {
    if let Some(note) = payload.as_str() {
        return Ok(EventPayload::keys(note));
    }
    let obj = as_object(payload, "keys")?;
    let midi = optional_number(obj, "midi")?.map(|m| m.round() as i32);
    let frequency = optional_number(obj, "frequency")?;
    let note = obj.get("note").and_then(text);
    if note.is_none() && midi.is_none() && frequency.is_none() {
        return Err("keys payload needs a note, midi number or frequency".to_string());
    }
    Ok(EventPayload::Keys(KeyNote {
        note: note.unwrap_or_default(),
        midi,
        frequency,
    }))
}

fn decode_percussion(payload: &Value) -> Result<EventPayload, String> {
    if let Some(voice) = payload.as_str() {
        return Ok(EventPayload::percussion(voice, DrumKit::Acoustic));
    }
    let obj = as_object(payload, "percussion")?;
    let voice = obj
        .get("voice")
        .and_then(text)
        .ok_or("percussion payload needs a voice")?;
    let kit = obj
        .get("kit")
        .and_then(text)
        .map(|k| DrumKit::from_name(&k))
        .unwrap_or_default();
    Ok(EventPayload::Percussion(PercussionHit { voice, kit }))
}

fn decode_string(payload: &Value) -> Result<EventPayload, String> {
    if let Some(index) = number(payload) {
        let index = string_index(index)?;
        return Ok(EventPayload::String(StringPluck::new(index, GuitarStyle::default(), 0)));
    }
    let obj = as_object(payload, "string")?;
    let frequency = optional_number(obj, "frequency")?;
    let string_index = match optional_number(obj, "stringIndex")? {
        Some(i) => string_index(i)?,
        None if frequency.is_some() => 0,
        None => return Err("string payload needs a stringIndex or frequency".to_string()),
    };
    let octave_shift = match optional_number(obj, "octaveShift")? {
        Some(o) => Some(o),
        None => optional_number(obj, "octave")?,
    };
    Ok(EventPayload::String(StringPluck {
        string_index,
        semitone_offset: optional_number(obj, "semitoneOffset")?,
        frequency,
        style: obj
            .get("style")
            .and_then(text)
            .map(|s| GuitarStyle::from_name(&s))
            .unwrap_or_default(),
        octave_shift: octave_shift.map_or(0, |o| o.round() as i32),
    }))
}

fn decode_pad(payload: &Value) -> Result<EventPayload, String> {
    let index = match number(payload) {
        Some(i) => i,
        None => as_object(payload, "pad")?
            .get("padIndex")
            .and_then(number)
            .ok_or("pad payload needs a padIndex")?,
    };
    if !index.is_finite() {
        return Err(format!("padIndex must be finite, got {index}"));
    }
    Ok(EventPayload::Pad(PadHit {
        pad_index: index.round() as i32,
    }))
}

fn as_object<'a>(payload: &'a Value, kind: &str) -> Result<&'a Map<String, Value>, String> {
    payload
        .as_object()
        .ok_or_else(|| format!("{kind} payload must be an object"))
}

fn string_index(value: f64) -> Result<usize, String> {
    if value.is_finite() && value >= 0.0 {
        Ok(value as usize)
    } else {
        Err(format!("stringIndex must be >= 0, got {value}"))
    }
}

/// Absent or null is `None`; present but not coercible is an error.
fn optional_number(obj: &Map<String, Value>, field: &str) -> Result<Option<f64>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => number(v)
            .map(Some)
            .ok_or_else(|| format!("{field} is not a number")),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{InstrumentKind, StringInput};

    fn sample_track() -> Vec<PerformanceEvent> {
        vec![
            PerformanceEvent::new(EventPayload::keys("C4"), 0.5).held_for(0.3),
            PerformanceEvent::new(EventPayload::percussion("kick", DrumKit::Electronic), 1.2),
            PerformanceEvent::new(
                EventPayload::string(
                    StringInput::Tuned {
                        string_index: 1,
                        semitone_offset: Some(2.0),
                        frequency: None,
                    },
                    GuitarStyle::Distorted,
                    -1,
                ),
                1.75,
            ),
            PerformanceEvent::new(EventPayload::pad(5), 2.0),
        ]
    }

    #[test]
    fn export_import_export_is_stable() {
        let first = export_events(&sample_track()).unwrap();
        let imported = import_events(&first).unwrap();
        assert_eq!(imported, sample_track());
        let second = export_events(&imported).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_array_is_an_empty_track() {
        assert!(import_events("[]").unwrap().is_empty());
        assert_eq!(export_events(&[]).unwrap(), "[]");
    }

    #[test]
    fn non_array_rejected() {
        assert!(matches!(import_events(r#"{"events": []}"#), Err(ImportError::NotAnArray)));
        assert!(matches!(import_events("not json"), Err(ImportError::Syntax(_))));
    }

    #[test]
    fn coerces_primitive_types() {
        let events = import_events(
            r#"[
                { "instrumentKind": "keys", "payload": { "note": "E4" },
                  "timestampOffsetSeconds": "0.25", "durationSeconds": "1" },
                { "instrumentKind": "string",
                  "payload": { "stringIndex": "3", "style": "clean", "octaveShift": "1" },
                  "timestampOffsetSeconds": 1 },
                { "instrumentKind": "percussion", "payload": { "voice": "snare", "kit": "trash can" },
                  "timestampOffsetSeconds": 2 },
                { "instrumentKind": "pad", "payload": { "padIndex": "7" },
                  "timestampOffsetSeconds": 3, "durationSeconds": null }
            ]"#,
        )
        .unwrap();

        assert_eq!(events[0].timestamp_offset_seconds, 0.25);
        assert_eq!(events[0].duration_seconds, Some(1.0));
        assert_eq!(
            events[1].payload,
            EventPayload::string(3usize, GuitarStyle::Clean, 1)
        );
        assert_eq!(events[2].payload, EventPayload::percussion("snare", DrumKit::Acoustic));
        assert_eq!(events[3].payload, EventPayload::pad(7));
        assert_eq!(events[3].duration_seconds, None);
    }

    #[test]
    fn reads_live_session_records() {
        let events = import_events(
            r#"[
                { "timestamp": 500, "instrument": "piano", "data": "C" },
                { "timestamp": 750, "instrument": "piano", "data": "D#2" },
                { "timestamp": 1000, "instrument": "drums", "data": "hihat" },
                { "timestamp": 1250, "instrument": "guitar", "data": 4 },
                { "timestamp": 1500, "instrument": "synth", "data": 2 }
            ]"#,
        )
        .unwrap();
        let kinds: Vec<InstrumentKind> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                InstrumentKind::Keys,
                InstrumentKind::Keys,
                InstrumentKind::Percussion,
                InstrumentKind::String,
                InstrumentKind::Pad
            ]
        );
        let offsets: Vec<f64> = events.iter().map(|e| e.timestamp_offset_seconds).collect();
        assert_eq!(offsets, vec![0.5, 0.75, 1.0, 1.25, 1.5], "milliseconds become seconds");
        assert_eq!(events[0].payload, EventPayload::keys("C"));
        assert_eq!(events[1].payload, EventPayload::keys("D#5"), "upper keyboard octave");
        assert_eq!(events[3].payload, EventPayload::string(4usize, GuitarStyle::Acoustic, 0));
    }

    #[test]
    fn reads_keyboard_transcripts() {
        let events = import_events(
            r#"[
                { "id": "a1", "midi": 60, "noteName": "C4", "start": 0.5, "duration": 0.3 },
                { "id": "a2", "midi": 64, "noteName": "E4", "start": 1.25, "duration": 0.1 }
            ]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp_offset_seconds, 0.5);
        assert_eq!(events[0].duration_seconds, Some(0.3));
        match &events[1].payload {
            EventPayload::Keys(note) => {
                assert_eq!(note.midi, Some(64));
                assert_eq!(note.note, "E4");
            }
            other => panic!("expected a key note, got {other:?}"),
        }
    }

    #[test]
    fn reads_guitar_sessions() {
        let events = import_events(
            r#"[
                { "id": "g1", "stringIndex": 2, "noteName": "D3", "start": 0.2, "duration": 0.6,
                  "style": "distorted" }
            ]"#,
        )
        .unwrap();
        assert_eq!(events[0].payload, EventPayload::string(2usize, GuitarStyle::Distorted, 0));
        assert_eq!(events[0].timestamp_offset_seconds, 0.2);
        assert_eq!(events[0].duration_seconds, Some(0.6));
    }

    #[test]
    fn older_layouts_still_validate() {
        assert!(import_events(r#"[{ "midi": 60, "duration": 1 }]"#).is_err(), "start is required");
        assert!(import_events(r#"[{ "timestamp": -5, "instrument": "drums", "data": "kick" }]"#).is_err());
        assert!(import_events(r#"[{ "stringIndex": -1, "start": 0 }]"#).is_err());
    }

    #[test]
    fn bad_element_reports_its_index() {
        let err = import_events(
            r#"[
                { "instrumentKind": "pad", "payload": 1, "timestampOffsetSeconds": 0 },
                { "instrumentKind": "pad", "payload": 1, "timestampOffsetSeconds": -1 }
            ]"#,
        )
        .unwrap_err();
        match err {
            ImportError::InvalidEvent { index, .. } => assert_eq!(index, 1),
            other => panic!("expected InvalidEvent, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = import_events(
            r#"[{ "instrumentKind": "theremin", "payload": {}, "timestampOffsetSeconds": 0 }]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("theremin"), "got {err}");
    }

    #[test]
    fn derived_deserialize_reads_export() {
        let json = export_events(&sample_track()).unwrap();
        let parsed: Vec<PerformanceEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_track());
    }
}
