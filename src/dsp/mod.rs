//! DSP: pure Rust audio synthesis primitives.
//!
//! All DSP runs in Rust for deterministic, cross-platform audio output.
//! The same code powers both live playback (AudioWorklet + WASM, or a native
//! audio callback) and the offline renderer (WAV bounce).

pub mod analyser;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod output;
pub mod renderer;
pub mod reverb;
pub mod voice;
