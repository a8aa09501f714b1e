//! Feed-forward classifier loaded from a JSON weights artifact.
//!
//! The artifact is the serialized [`DenseSpec`]: a stack of dense layers with
//! ReLU hidden activations and a single sigmoid output unit. Loading
//! validates the dimension chain once, so the forward pass can run without
//! per-request shape checks beyond the input row width.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ClassifyError;
use crate::model::GenderModel;

/// Activation applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// One dense layer: `out[j] = activation(weights[j] . in + bias[j])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `weights[j]` holds the input weights of output unit `j`.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

/// Serialized form of a [`DenseModel`] weights artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseSpec {
    pub layers: Vec<DenseLayer>,
}

/// Immutable feed-forward network. Weights never change after loading, so a
/// single instance serves concurrent inference without synchronization.
pub struct DenseModel {
    layers: Vec<DenseLayer>,
    input_width: usize,
}

impl DenseModel {
    /// Loads and validates a weights artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        let data = fs::read_to_string(path)?;
        let spec: DenseSpec = serde_json::from_str(&data).map_err(|e| {
            ClassifyError::Artifact(format!("cannot parse {}: {e}", path.display()))
        })?;
        let model = Self::from_spec(spec)?;
        info!(
            "loaded dense classifier ({} inputs, {} layers) from {}",
            model.input_width,
            model.layers.len(),
            path.display()
        );
        Ok(model)
    }

    /// Builds a model from an in-memory spec, validating the dimension chain.
    pub fn from_spec(spec: DenseSpec) -> Result<Self, ClassifyError> {
        let layers = spec.layers;
        if layers.is_empty() {
            return Err(ClassifyError::Artifact("no layers".into()));
        }

        let mut width = match layers[0].weights.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => return Err(ClassifyError::Artifact("layer 0 has no weights".into())),
        };

        for (i, layer) in layers.iter().enumerate() {
            if layer.weights.is_empty() {
                return Err(ClassifyError::Artifact(format!("layer {i} has no units")));
            }
            if layer.bias.len() != layer.weights.len() {
                return Err(ClassifyError::Artifact(format!(
                    "layer {i}: {} bias terms for {} units",
                    layer.bias.len(),
                    layer.weights.len()
                )));
            }
            for (j, row) in layer.weights.iter().enumerate() {
                if row.len() != width {
                    return Err(ClassifyError::Artifact(format!(
                        "layer {i} unit {j}: expected {width} weights, got {}",
                        row.len()
                    )));
                }
            }
            width = layer.weights.len();
        }

        if width != 1 {
            return Err(ClassifyError::Artifact(format!(
                "final layer must have 1 output unit, has {width}"
            )));
        }

        let input_width = layers[0].weights[0].len();
        Ok(Self {
            layers,
            input_width,
        })
    }

    /// Forward pass over one feature row. Accumulates in f64.
    fn forward(&self, row: &[f32]) -> Vec<f32> {
        let mut current: Vec<f64> = row.iter().map(|&x| x as f64).collect();
        for layer in &self.layers {
            let mut next = Vec::with_capacity(layer.weights.len());
            for (unit, &b) in layer.weights.iter().zip(&layer.bias) {
                let sum: f64 = unit
                    .iter()
                    .zip(&current)
                    .map(|(&w, &x)| w as f64 * x)
                    .sum();
                next.push(layer.activation.apply(sum + b as f64));
            }
            current = next;
        }
        current.into_iter().map(|x| x as f32).collect()
    }
}

impl GenderModel for DenseModel {
    fn predict(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, ClassifyError> {
        let mut out = Vec::with_capacity(batch.len());
        for row in batch {
            if row.len() != self.input_width {
                return Err(ClassifyError::ShapeMismatch {
                    expected: self.input_width,
                    got: row.len(),
                });
            }
            out.push(self.forward(row));
        }
        Ok(out)
    }

    fn input_width(&self) -> usize {
        self.input_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn single_layer(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> DenseSpec {
        DenseSpec {
            layers: vec![DenseLayer {
                weights,
                bias,
                activation: Activation::Sigmoid,
            }],
        }
    }

    #[test]
    fn forward_single_sigmoid_unit() {
        let model = DenseModel::from_spec(single_layer(vec![vec![1.0, -1.0]], vec![0.5])).unwrap();
        let out = model.predict(&[vec![2.0, 1.0]]).unwrap();
        // 2 - 1 + 0.5 = 1.5
        assert!((out[0][0] as f64 - sigmoid(1.5)).abs() < 1e-7);
    }

    #[test]
    fn forward_relu_then_sigmoid() {
        let spec = DenseSpec {
            layers: vec![
                DenseLayer {
                    weights: vec![vec![1.0, 0.0], vec![0.0, -1.0]],
                    bias: vec![0.0, 0.0],
                    activation: Activation::Relu,
                },
                DenseLayer {
                    weights: vec![vec![1.0, 1.0]],
                    bias: vec![-0.25],
                    activation: Activation::Sigmoid,
                },
            ],
        };
        let model = DenseModel::from_spec(spec).unwrap();
        let out = model.predict(&[vec![3.0, 2.0]]).unwrap();
        // hidden = [relu(3), relu(-2)] = [3, 0]; output = sigmoid(3 - 0.25)
        assert!((out[0][0] as f64 - sigmoid(2.75)).abs() < 1e-7);
    }

    #[test]
    fn zero_weights_yield_bias_sigmoid() {
        let model = DenseModel::from_spec(single_layer(vec![vec![0.0; 128]], vec![1.0])).unwrap();
        let out = model.predict(&[vec![42.0; 128]]).unwrap();
        assert!((out[0][0] as f64 - sigmoid(1.0)).abs() < 1e-7);
    }

    #[test]
    fn batch_of_rows() {
        let model = DenseModel::from_spec(single_layer(vec![vec![1.0]], vec![0.0])).unwrap();
        let out = model.predict(&[vec![0.0], vec![1.0]]).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0][0] - 0.5).abs() < 1e-7);
    }

    #[test]
    fn wrong_row_width_is_shape_mismatch() {
        let model = DenseModel::from_spec(single_layer(vec![vec![0.0; 128]], vec![0.0])).unwrap();
        let err = model.predict(&[vec![0.0; 40]]).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::ShapeMismatch {
                expected: 128,
                got: 40
            }
        ));
    }

    #[test]
    fn empty_spec_rejected() {
        let err = DenseModel::from_spec(DenseSpec { layers: vec![] }).unwrap_err();
        assert!(matches!(err, ClassifyError::Artifact(_)));
    }

    #[test]
    fn broken_dimension_chain_rejected() {
        let spec = DenseSpec {
            layers: vec![
                DenseLayer {
                    weights: vec![vec![1.0, 1.0], vec![1.0, 1.0]],
                    bias: vec![0.0, 0.0],
                    activation: Activation::Relu,
                },
                DenseLayer {
                    // Expects 2 inputs, declares 3.
                    weights: vec![vec![1.0, 1.0, 1.0]],
                    bias: vec![0.0],
                    activation: Activation::Sigmoid,
                },
            ],
        };
        assert!(matches!(
            DenseModel::from_spec(spec).unwrap_err(),
            ClassifyError::Artifact(_)
        ));
    }

    #[test]
    fn multi_output_final_layer_rejected() {
        let spec = single_layer(vec![vec![1.0], vec![1.0]], vec![0.0, 0.0]);
        assert!(matches!(
            DenseModel::from_spec(spec).unwrap_err(),
            ClassifyError::Artifact(_)
        ));
    }

    #[test]
    fn mismatched_bias_rejected() {
        let spec = single_layer(vec![vec![1.0]], vec![0.0, 0.0]);
        assert!(matches!(
            DenseModel::from_spec(spec).unwrap_err(),
            ClassifyError::Artifact(_)
        ));
    }

    #[test]
    fn load_artifact_roundtrip() {
        let spec = single_layer(vec![vec![0.0; 4]], vec![0.5]);
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(serde_json::to_string(&spec).unwrap().as_bytes())
            .unwrap();
        f.flush().unwrap();

        let model = DenseModel::load(f.path()).unwrap();
        assert_eq!(model.input_width(), 4);
        let out = model.predict(&[vec![9.0; 4]]).unwrap();
        assert!((out[0][0] as f64 - sigmoid(0.5)).abs() < 1e-7);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = DenseModel::load(Path::new("/nonexistent/weights.json")).unwrap_err();
        assert!(matches!(err, ClassifyError::Io(_)));
    }

    #[test]
    fn load_garbage_is_artifact_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not json").unwrap();
        f.flush().unwrap();
        assert!(matches!(
            DenseModel::load(f.path()).unwrap_err(),
            ClassifyError::Artifact(_)
        ));
    }
}
