// Error taxonomy for the generation pipeline.
//
// Scale lookups and artifact loads have their own error types at the
// boundary where they originate; everything converges on `GenerationError`
// for callers of the pipeline. Nothing is retried: every error aborts the
// request and is handed to the caller unchanged.

use crate::scale::UnknownScaleError;
use cadenza_model::{ArtifactLoadError, Mode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    UnknownScale(#[from] UnknownScaleError),

    #[error(transparent)]
    ArtifactLoad(#[from] ArtifactLoadError),

    /// The reference corpus has nothing to seed a melody in this mode.
    #[error("reference corpus has no usable {mode} entries to seed a melody")]
    InsufficientSeedData { mode: Mode },

    /// A total duration of zero where a ratio was needed. The timeline
    /// assembler recovers from this by skipping the rescale.
    #[error("cannot rescale durations that sum to zero")]
    DegenerateDuration,

    #[error("{what} length must be at least 1 (got {length})")]
    InvalidLength { what: &'static str, length: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("MIDI encoding failed: {0}")]
    Midi(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
