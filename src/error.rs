use thiserror::Error;

/// Crate-level error type. Expected edge cases (unknown notes, empty tracks,
/// refused output unlocks) never surface here; they degrade to defaults.
#[derive(Debug, Error)]
pub enum HarmonicaError {
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
    #[error("Import error: {0}")]
    Import(#[from] ImportError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Bounce would run {seconds:.1} s, longer than the {limit:.1} s limit")]
    BounceTooLong { seconds: f64, limit: f64 },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OutputError {
    #[error("sample rate {0} Hz is not usable")]
    InvalidSampleRate(f64),
    #[error("output context is closed and cannot be resumed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("transcript is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("transcript must be a JSON array of events")]
    NotAnArray,
    #[error("event {index} is invalid: {reason}")]
    InvalidEvent { index: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_wraps_inner_error() {
        let err: HarmonicaError = OutputError::Closed.into();
        assert_eq!(
            err.to_string(),
            "Output error: output context is closed and cannot be resumed"
        );

        let err: HarmonicaError = ImportError::InvalidEvent {
            index: 3,
            reason: "missing instrumentKind".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Import error: event 3 is invalid: missing instrumentKind"
        );
    }
}
