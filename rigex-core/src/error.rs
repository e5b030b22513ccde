use thiserror::Error;

/// Invalid trial-manager or phase configuration. Raised at construction and
/// never corrected automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{owner}: parameter list `{field}` is empty")]
    EmptyList { owner: String, field: &'static str },

    #[error("{owner}: `{field}` has {found} options, expected {expected} to match deg_per_cycs")]
    LengthMismatch {
        owner: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{owner}: durations must be positive and finite, found {value}")]
    InvalidDuration { owner: String, value: f64 },

    #[error("{owner}: probability `{field}` must lie in [0, 1], found {value}")]
    InvalidProbability {
        owner: String,
        field: &'static str,
        value: f64,
    },

    #[error("invalid delay distribution: {0}")]
    InvalidDelay(String),

    #[error("phase `{phase}` has an unbounded frame budget but no response transition")]
    UnboundedPhase { phase: String },

    #[error("phase `{phase}` has a finite frame budget and transitions but no timeout transition")]
    MissingTimeout { phase: String },

    #[error("phase `{phase}` transitions to unknown phase `{target}`")]
    UnknownTarget { phase: String, target: String },

    #[error("phase sequence is empty")]
    NoPhases,
}

/// Station-side failures surfaced to callers that address hardware by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("station has no valve named `{0}`")]
    UnknownValve(String),

    #[error("station has no sound named `{0}`")]
    UnknownSound(String),
}
