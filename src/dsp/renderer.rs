//! Offline bounce: plays a track through the same synth and scheduler used
//! live, driven by a manual clock, and collects the output.

use tracing::debug;

use crate::config::{HarmonicaConfig, SessionConfig, SynthConfig};
use crate::error::HarmonicaError;
use crate::event::PerformanceEvent;
use crate::recorder::{ManualClock, RecordingManager};
use crate::synth::Synth;

/// Render `events` at `bpm` to mono samples. The result runs until the
/// playback pass has ended and every voice has stopped. An empty track
/// renders to nothing. Anything that would run past `max_bounce_seconds` is
/// refused with [`HarmonicaError::BounceTooLong`].
pub fn bounce_track(
    events: &[PerformanceEvent],
    bpm: f64,
    config: &HarmonicaConfig,
) -> Result<Vec<f32>, HarmonicaError> {
    config.validate()?;
    let synth_config = SynthConfig {
        start_suspended: false,
        ..config.synth.clone()
    };
    let sample_rate = synth_config.sample_rate;
    let block_size = synth_config.block_size;
    let limit = synth_config.max_bounce_seconds;
    // Blocks are ticked exactly on time; nothing may be skipped as late.
    let session = SessionConfig {
        max_lateness_seconds: f64::INFINITY,
        ..config.session.clone()
    };

    let clock = ManualClock::new();
    let mut synth = Synth::new(synth_config);
    let mut recorder = RecordingManager::with_clock(session, clock.clone());
    recorder.load_events(events.to_vec());
    recorder.set_tempo(bpm);

    let multiplier = config.session.reference_bpm / recorder.tempo();
    let estimate = estimated_seconds(events, multiplier) + config.session.trailing_pad_seconds;
    if estimate > limit {
        return Err(HarmonicaError::BounceTooLong {
            seconds: estimate,
            limit,
        });
    }
    let max_samples = (limit * sample_rate).ceil() as usize;

    // Surfaces an unusable sample rate before anything is scheduled.
    synth.unlock_output()?;
    if !recorder.play(&mut synth) {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let mut block = vec![0.0_f32; block_size];
    while recorder.is_playing() || synth.active_voices() > 0 {
        if out.len() >= max_samples {
            return Err(HarmonicaError::BounceTooLong {
                seconds: out.len() as f64 / sample_rate,
                limit,
            });
        }
        clock.set(out.len() as f64 / sample_rate);
        recorder.tick(&mut synth);
        synth.render(&mut block);
        out.extend_from_slice(&block);
    }
    debug!(
        events = events.len(),
        seconds = out.len() as f64 / sample_rate,
        "track bounced"
    );
    Ok(out)
}

/// Latest scheduled onset plus hold time, before any instrument tail.
fn estimated_seconds(events: &[PerformanceEvent], multiplier: f64) -> f64 {
    events
        .iter()
        .map(|e| e.timestamp_offset_seconds * multiplier + e.duration_seconds.unwrap_or(0.0))
        .fold(0.0, f64::max)
}

/// Render `events` to a WAV file as bytes (16-bit stereo PCM).
pub fn render_wav(
    events: &[PerformanceEvent],
    bpm: f64,
    config: &HarmonicaConfig,
) -> Result<Vec<u8>, HarmonicaError> {
    let mono = bounce_track(events, bpm, config)?;
    let mut stereo = Vec::with_capacity(mono.len() * 2);
    for &s in &mono {
        let sample = (s as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
        stereo.push(sample); // L
        stereo.push(sample); // R
    }
    Ok(encode_wav(&stereo, config.synth.sample_rate.round() as u32, 2))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
