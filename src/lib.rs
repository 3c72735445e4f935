pub mod config;
pub mod dsp;
pub mod error;
pub mod event;
pub mod pitch;
pub mod recorder;
pub mod studio;
pub mod synth;
pub mod transcript;
pub mod wasm;

use wasm_bindgen::prelude::*;

pub use config::{HarmonicaConfig, SessionConfig, SynthConfig};
pub use error::HarmonicaError;
pub use event::{EventPayload, PerformanceEvent, Track, TrackId};
pub use recorder::{EventRenderer, RecordingManager};
pub use studio::Studio;
pub use synth::Synth;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the harmonica-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}
