// Cadenza inference session
//
// Everything the melody generator needs from the trained model side, kept
// apart from the music-theory crate so the generator only sees a trait:
//
// - mode.rs: major/minor, the key for choosing an artifact set
// - window.rs: fixed-capacity FIFO context window of normalized rows
// - sequence.rs: `SequenceModel` trait and the JSON-weight LSTM evaluator
// - normalizer.rs: per-feature min-max normalizers
// - corpus.rs: reference corpus of historical note events by scale
// - session.rs: `InferenceSession` (model + normalizers + corpus) and the
//   per-mode `SessionRegistry`
// - error.rs: `ArtifactLoadError`
//
// Artifacts are produced by an external training pipeline and only read
// here.

pub mod corpus;
pub mod error;
pub mod mode;
pub mod normalizer;
pub mod sequence;
pub mod session;
pub mod window;

pub use corpus::{CorpusEvent, ReferenceCorpus};
pub use error::{ArtifactLoadError, ModelShapeError};
pub use mode::Mode;
pub use normalizer::{FeatureNormalizers, MinMaxNormalizer};
pub use sequence::{LstmModel, SequenceModel};
pub use session::{ArtifactPaths, InferenceSession, SessionRegistry};
pub use window::{ContextWindow, FeatureRow};
