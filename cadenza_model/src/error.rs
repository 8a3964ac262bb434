// Errors raised while loading model, normalizer and corpus artifacts.
//
// Every variant carries the path of the offending file. Loading happens once
// when a session is constructed; nothing in the inference loop can produce
// one of these.

use std::path::PathBuf;
use thiserror::Error;

/// A model, normalizer or corpus file could not be read, parsed or validated.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("invalid model weights {}: {source}", .path.display())]
    Shape {
        path: PathBuf,
        #[source]
        source: ModelShapeError,
    },
}

/// A layer stack whose weight shapes do not chain from 3 input features to
/// 3 outputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelShapeError {
    #[error("model has no layers")]
    NoLayers,

    #[error("layer {layer}: lstm needs a sequence input")]
    LstmNeedsSequence { layer: usize },

    #[error("layer {layer}: lstm has zero units")]
    ZeroUnits { layer: usize },

    #[error("layer {layer} {matrix}: {found} rows, expected {expected}")]
    MatrixRows {
        layer: usize,
        matrix: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("layer {layer} {matrix}: row of {found} columns, expected {expected}")]
    MatrixColumns {
        layer: usize,
        matrix: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("layer {layer}: bias has {found} entries, expected {expected}")]
    BiasLength {
        layer: usize,
        found: usize,
        expected: usize,
    },

    #[error("layer {layer}: dense needs a vector input (set return_sequences=false on the last lstm)")]
    DenseNeedsVector { layer: usize },

    #[error("layer {layer}: dense has no outputs")]
    NoOutputs { layer: usize },

    #[error("last lstm must not return sequences")]
    TrailingSequence,

    #[error("model emits {found} values, expected {expected}")]
    OutputWidth { found: usize, expected: usize },
}

impl ArtifactLoadError {
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtifactLoadError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Read and deserialize a JSON artifact.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
) -> Result<T, ArtifactLoadError> {
    let data = std::fs::read_to_string(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ArtifactLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
