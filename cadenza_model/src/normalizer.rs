// Per-feature min-max normalizers.
//
// The sequence model works in a normalized space where each of the three
// features (pitch, duration, velocity) was independently scaled onto [0, 1]
// by its own normalizer, fit on the training corpus. The fitted bounds are
// exported as small JSON files ({"data_min": .., "data_max": ..}) and loaded
// read-only next to the model weights.
//
// A feature whose training data had zero range maps with scale 1, the same
// convention the fitting library uses, so normalize/denormalize stay
// inverse to each other.

use crate::error::{ArtifactLoadError, read_json};
use crate::window::FeatureRow;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maps one feature between its natural units and [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    pub data_min: f64,
    pub data_max: f64,
}

impl MinMaxNormalizer {
    pub fn new(data_min: f64, data_max: f64) -> Self {
        MinMaxNormalizer { data_min, data_max }
    }

    /// Fit bounds to a set of sample values. Returns None for an empty set.
    pub fn fit(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut bounds: Option<(f64, f64)> = None;
        for v in values {
            bounds = Some(match bounds {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        bounds.map(|(lo, hi)| MinMaxNormalizer::new(lo, hi))
    }

    /// Load from a JSON file and check the bounds are usable.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let n: MinMaxNormalizer = read_json(path)?;
        if !n.data_min.is_finite() || !n.data_max.is_finite() {
            return Err(ArtifactLoadError::invalid(path, "non-finite bounds"));
        }
        if n.data_max < n.data_min {
            return Err(ArtifactLoadError::invalid(
                path,
                format!("data_max {} is below data_min {}", n.data_max, n.data_min),
            ));
        }
        Ok(n)
    }

    fn range(&self) -> f64 {
        let r = self.data_max - self.data_min;
        if r == 0.0 { 1.0 } else { r }
    }

    /// Natural units -> [0, 1] (values outside the fitted range extrapolate).
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.data_min) / self.range()
    }

    /// [0, 1] -> natural units.
    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.range() + self.data_min
    }
}

/// The three normalizers of a melody model, one per feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalizers {
    pub pitch: MinMaxNormalizer,
    pub duration: MinMaxNormalizer,
    pub velocity: MinMaxNormalizer,
}

impl FeatureNormalizers {
    /// Normalize a (pitch, duration, velocity) triple into a model row.
    pub fn normalize(&self, pitch: f64, duration: f64, velocity: f64) -> FeatureRow {
        [
            self.pitch.normalize(pitch) as f32,
            self.duration.normalize(duration) as f32,
            self.velocity.normalize(velocity) as f32,
        ]
    }

    /// Denormalize a model row back into (pitch, duration, velocity).
    pub fn denormalize(&self, row: &FeatureRow) -> (f64, f64, f64) {
        (
            self.pitch.denormalize(row[0] as f64),
            self.duration.denormalize(row[1] as f64),
            self.velocity.denormalize(row[2] as f64),
        )
    }
}
