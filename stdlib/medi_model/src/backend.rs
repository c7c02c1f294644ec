//! Backend trait and tensor types for model inference

use serde::{Deserialize, Serialize};
use thiserror::Error;

use medi_features::ImageTensor;

/// Errors that can occur during inference.
///
/// All of them mean the artifact and its caller disagree; none is
/// recoverable by resubmitting the same request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("input shape {found:?} does not match model input shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Inference failed: {0}")]
    InferenceError(String),
}

/// Tensor data wrapper for model inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(name: String, shape: Vec<usize>, data: Vec<f32>) -> Result<Self, BackendError> {
        let expected_size: usize = shape.iter().product();
        if data.len() != expected_size {
            return Err(BackendError::InvalidInput(format!(
                "Tensor {} data length {} does not match shape {:?} (expected {})",
                name,
                data.len(),
                shape,
                expected_size
            )));
        }
        Ok(Self { name, shape, data })
    }

    /// One-dimensional tensor over a feature row.
    pub fn vector(name: impl Into<String>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            shape: vec![data.len()],
            data,
        }
    }
}

impl From<ImageTensor> for Tensor {
    fn from(img: ImageTensor) -> Self {
        Self {
            name: "image".into(),
            shape: img.shape().to_vec(),
            data: img.data,
        }
    }
}

/// Raw output of a frozen model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ModelOutput {
    /// Index into the model's declared class list.
    Class(usize),
    /// Probability of the positive class.
    Probability(f64),
}

/// Inference interface shared by every frozen model.
pub trait ModelBackend: Send + Sync {
    /// Run inference on a single input.
    fn infer(&self, input: &Tensor) -> Result<ModelOutput, BackendError>;

    /// Shape of the single input this model accepts.
    fn input_shape(&self) -> Vec<usize>;

    /// Class labels in the order the model was trained with.
    fn classes(&self) -> &[String];

    /// Get backend name/identifier
    fn backend_name(&self) -> &str;

    /// Per-feature weights and bias, for models that are linear in their input.
    fn linear_terms(&self) -> Option<(Vec<f64>, f64)> {
        None
    }

    /// Internal consistency of the model parameters.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Reject inputs whose shape differs from `expected`.
pub fn check_shape(input: &Tensor, expected: &[usize]) -> Result<(), BackendError> {
    if input.shape != expected || input.data.len() != expected.iter().product::<usize>() {
        return Err(BackendError::ShapeMismatch {
            expected: expected.to_vec(),
            found: input.shape.clone(),
        });
    }
    Ok(())
}
