//! Note names, MIDI numbers and frequencies.

/// Reference pitch for A4 (MIDI 69) in Hz, and the fallback for any note
/// that cannot be resolved.
pub const A4_FREQUENCY: f64 = 440.0;

/// Octave assumed for a note name written without one.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Parse a scientific pitch name (e.g. "C4", "F#3", "Bb5", "C-1") into a
/// MIDI note number. C4 = 60. A bare name ("C", "F#") is in octave 4, the
/// keyboard's home octave.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let note = note.trim();
    let mut chars = note.chars();

    let base = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (semitone, octave_str) = match rest.chars().next() {
        Some('#') => (base + 1, &rest[1..]),
        Some('b') => (base - 1, &rest[1..]),
        _ => (base, rest),
    };

    let octave: i32 = if octave_str.is_empty() {
        DEFAULT_OCTAVE
    } else {
        octave_str.parse().ok()?
    };
    Some((octave + 1) * 12 + semitone)
}

/// `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * 2.0_f64.powf((midi as f64 - 69.0) / 12.0)
}

pub fn note_to_frequency(note: &str) -> Option<f64> {
    note_to_midi(note).map(|midi| midi_to_frequency(midi, A4_FREQUENCY))
}

/// Shift a frequency by a (possibly fractional) number of semitones.
pub fn transpose(frequency: f64, semitones: f64) -> f64 {
    frequency * 2.0_f64.powf(semitones / 12.0)
}

/// True for a frequency an oscillator can be asked to play.
pub fn is_playable(frequency: f64) -> bool {
    frequency.is_finite() && frequency > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_to_midi_basic() {
        assert_eq!(note_to_midi("A4"), Some(69));
        assert_eq!(note_to_midi("C4"), Some(60));
        assert_eq!(note_to_midi("C0"), Some(12));
        assert_eq!(note_to_midi("C-1"), Some(0));
        assert_eq!(note_to_midi("c4"), Some(60));
    }

    #[test]
    fn bare_names_sit_in_octave_four() {
        assert_eq!(note_to_midi("C"), Some(60));
        assert_eq!(note_to_midi("C#"), Some(61));
        assert_eq!(note_to_midi("bb"), Some(70));
        let c = note_to_frequency("C").unwrap();
        assert!((c - 261.63).abs() < 0.01, "C should be middle C, got {c}");
        let d = note_to_frequency("D").unwrap();
        assert!((d - 293.66).abs() < 0.01, "D should be 293.66 Hz, got {d}");
    }

    #[test]
    fn accidentals_match() {
        assert_eq!(note_to_midi("F#4"), note_to_midi("Gb4"));
        assert_eq!(note_to_midi("Bb3"), Some(58));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(note_to_midi(""), None);
        assert_eq!(note_to_midi("H4"), None);
        assert_eq!(note_to_midi("C#x"), None);
        assert_eq!(note_to_frequency("not a note"), None);
    }

    #[test]
    fn frequencies() {
        let c4 = note_to_frequency("C4").unwrap();
        assert!((c4 - 261.63).abs() < 0.01, "C4 should be ~261.63Hz, got {c4}");
        assert!((midi_to_frequency(69, 432.0) - 432.0).abs() < 1e-9);
        assert!((transpose(110.0, 12.0) - 220.0).abs() < 1e-9);
        assert!((transpose(110.0, -12.0) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn playable_frequency() {
        assert!(is_playable(82.41));
        assert!(!is_playable(0.0));
        assert!(!is_playable(-3.0));
        assert!(!is_playable(f64::NAN));
    }
}
