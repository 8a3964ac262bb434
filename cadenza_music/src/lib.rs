// Cadenza Music Generator
//
// Composes short two-voice pieces (block-chord accompaniment plus a melody)
// in any of the 24 major and natural-minor scales and writes them as MIDI.
// Chords come from a small catalogue of progression and rhythm templates;
// the melody comes from a trained sequence model that is seeded with
// transposed notes from a reference corpus and then fed its own output.
// Every generated melody note is snapped onto the target scale.
//
// Architecture:
// - scale.rs: the 24-scale table, note-name parsing, lookups by id
// - pitch.rs: pitch windows, octave folding, scale snapping, transposition
// - chords.rs: progression/duration templates and chord voicing
// - melody.rs: autoregressive melody generation over an inference session
// - timeline.rs: melody rescaling and merging both voices into one timeline
// - midi.rs: Standard MIDI File output from a timeline
// - extract.rs: building the reference corpus from tagged MIDI files
// - compose.rs: `Composer`, the end-to-end entry point
// - config.rs: `GenerationConfig` (JSON), defaults and validation
// - error.rs: `GenerationError`
//
// Model artifacts (weights, normalizers, corpus) are loaded through
// `cadenza_model`. Generation is deterministic given a seeded RNG and a
// deterministic model.

pub mod chords;
pub mod compose;
pub mod config;
pub mod error;
pub mod extract;
pub mod melody;
pub mod midi;
pub mod pitch;
pub mod scale;
pub mod timeline;

pub use compose::{Composer, Piece, PieceSummary, ScaleRequest};
pub use config::GenerationConfig;
pub use error::{GenerationError, Result};
