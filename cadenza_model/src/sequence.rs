// Sequence-to-next-step melody model.
//
// `SequenceModel` is the seam between the melody generator and whatever
// produces predictions: given the current context window (W rows of
// normalized pitch/duration/velocity) it returns one predicted row in the
// same normalized space. Inference takes `&self` and must not mutate shared
// state, so one loaded model can serve concurrent generation requests
// without a lock.
//
// `LstmModel` is the production implementation. The trained network is
// exported as JSON weights and evaluated here in plain Rust:
//
//   {"layers": [
//     {"type": "lstm", "units": 256, "kernel": [[..]], "recurrent_kernel": [[..]],
//      "bias": [..], "return_sequences": true},
//     {"type": "lstm", "units": 256, ...},
//     {"type": "dense", "kernel": [[..]], "bias": [..], "activation": "relu"},
//     {"type": "dense", "kernel": [[..]], "bias": [..]}
//   ]}
//
// LSTM gates follow the Keras layout (input, forget, cell, output) packed
// along the second kernel axis. Dropout layers do nothing at inference and
// are simply omitted from the export. All shapes are checked at load time so
// `predict` never indexes out of bounds.

use crate::error::{ArtifactLoadError, ModelShapeError, read_json};
use crate::window::{ContextWindow, FeatureRow};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of features per timestep (pitch, duration, velocity).
pub const FEATURES: usize = 3;

/// Predicts the next normalized timestep from a context window.
pub trait SequenceModel: Send + Sync {
    fn predict(&self, window: &ContextWindow) -> FeatureRow;
}

/// Element-wise activation for dense layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

/// One LSTM layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub units: usize,
    /// `[input_width][4 * units]`
    pub kernel: Vec<Vec<f32>>,
    /// `[units][4 * units]`
    pub recurrent_kernel: Vec<Vec<f32>>,
    /// `[4 * units]`
    pub bias: Vec<f32>,
    /// Emit the hidden state at every step (feeding another LSTM) rather
    /// than only the last one.
    #[serde(default)]
    pub return_sequences: bool,
}

impl LstmLayer {
    /// Run the layer over a sequence, returning the hidden state after each step.
    fn run(&self, inputs: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let u = self.units;
        let mut h = vec![0.0f32; u];
        let mut c = vec![0.0f32; u];
        let mut z = vec![0.0f32; 4 * u];
        let mut outputs = Vec::with_capacity(inputs.len());

        for x in inputs {
            z.copy_from_slice(&self.bias);
            accumulate(&mut z, x, &self.kernel);
            accumulate(&mut z, &h, &self.recurrent_kernel);
            for j in 0..u {
                let input_gate = sigmoid(z[j]);
                let forget_gate = sigmoid(z[u + j]);
                let candidate = z[2 * u + j].tanh();
                let output_gate = sigmoid(z[3 * u + j]);
                c[j] = forget_gate * c[j] + input_gate * candidate;
                h[j] = output_gate * c[j].tanh();
            }
            outputs.push(h.clone());
        }
        outputs
    }
}

/// One fully connected layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `[input_width][output_width]`
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        accumulate(&mut out, input, &self.kernel);
        for v in &mut out {
            *v = self.activation.apply(*v);
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Layer {
    Lstm(LstmLayer),
    Dense(DenseLayer),
}

/// A stacked LSTM + dense network loaded from exported weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmModel {
    layers: Vec<Layer>,
}

impl LstmModel {
    /// Build from layers, checking every shape.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, ModelShapeError> {
        let model = LstmModel { layers };
        model.validate()?;
        Ok(model)
    }

    /// Load weights from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let model: LstmModel = read_json(path)?;
        model.validate().map_err(|source| ArtifactLoadError::Shape {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            layers = model.layers.len(),
            "loaded sequence model weights"
        );
        Ok(model)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn validate(&self) -> Result<(), ModelShapeError> {
        if self.layers.is_empty() {
            return Err(ModelShapeError::NoLayers);
        }
        let mut width = FEATURES;
        // The input is a sequence until an LSTM collapses it to its last state.
        let mut is_sequence = true;

        for (layer, l) in self.layers.iter().enumerate() {
            match l {
                Layer::Lstm(l) => {
                    if !is_sequence {
                        return Err(ModelShapeError::LstmNeedsSequence { layer });
                    }
                    if l.units == 0 {
                        return Err(ModelShapeError::ZeroUnits { layer });
                    }
                    let gates = 4 * l.units;
                    check_matrix(&l.kernel, width, gates, layer, "kernel")?;
                    check_matrix(&l.recurrent_kernel, l.units, gates, layer, "recurrent_kernel")?;
                    if l.bias.len() != gates {
                        return Err(ModelShapeError::BiasLength {
                            layer,
                            found: l.bias.len(),
                            expected: gates,
                        });
                    }
                    width = l.units;
                    is_sequence = l.return_sequences;
                }
                Layer::Dense(d) => {
                    if is_sequence {
                        return Err(ModelShapeError::DenseNeedsVector { layer });
                    }
                    let out = d.bias.len();
                    if out == 0 {
                        return Err(ModelShapeError::NoOutputs { layer });
                    }
                    check_matrix(&d.kernel, width, out, layer, "kernel")?;
                    width = out;
                }
            }
        }

        if is_sequence {
            return Err(ModelShapeError::TrailingSequence);
        }
        if width != FEATURES {
            return Err(ModelShapeError::OutputWidth {
                found: width,
                expected: FEATURES,
            });
        }
        Ok(())
    }
}

impl SequenceModel for LstmModel {
    fn predict(&self, window: &ContextWindow) -> FeatureRow {
        let mut sequence: Vec<Vec<f32>> = window.iter().map(|r| r.to_vec()).collect();
        let mut vector: Vec<f32> = Vec::new();

        for layer in &self.layers {
            match layer {
                Layer::Lstm(l) => {
                    let mut states = l.run(&sequence);
                    if l.return_sequences {
                        sequence = states;
                    } else {
                        vector = states.pop().unwrap_or_else(|| vec![0.0; l.units]);
                    }
                }
                Layer::Dense(d) => vector = d.forward(&vector),
            }
        }

        std::array::from_fn(|i| vector.get(i).copied().unwrap_or(0.0))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// out += input · kernel, with kernel laid out `[input][output]`.
fn accumulate(out: &mut [f32], input: &[f32], kernel: &[Vec<f32>]) {
    for (x, row) in input.iter().zip(kernel) {
        if *x == 0.0 {
            continue;
        }
        for (o, w) in out.iter_mut().zip(row) {
            *o += x * w;
        }
    }
}

fn check_matrix(
    m: &[Vec<f32>],
    rows: usize,
    cols: usize,
    layer: usize,
    matrix: &'static str,
) -> Result<(), ModelShapeError> {
    if m.len() != rows {
        return Err(ModelShapeError::MatrixRows {
            layer,
            matrix,
            found: m.len(),
            expected: rows,
        });
    }
    if let Some(row) = m.iter().find(|r| r.len() != cols) {
        return Err(ModelShapeError::MatrixColumns {
            layer,
            matrix,
            found: row.len(),
            expected: cols,
        });
    }
    Ok(())
}
