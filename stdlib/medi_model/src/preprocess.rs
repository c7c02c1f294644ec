//! Frozen preprocessing transforms.
//!
//! Parameters are fitted once at training time and reused verbatim; nothing
//! here ever refits from an inference-time sample.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medi_features::{FeatureValue, FeatureVector, ImageTensor};

use crate::backend::Tensor;

/// Configuration errors: the assembled features and the fitted transform
/// disagree. Never caused by user input that passed assembly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("feature vector does not match the fitted transform: {}", describe_mismatch(.expected, .found))]
    ShapeMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("feature '{name}' must be numeric for this transform")]
    NonNumeric { name: String },
    #[error("feature '{name}' has category '{value}' unseen at fit time")]
    UnknownCategory { name: String, value: String },
    #[error("invalid preprocessor: {0}")]
    Invalid(String),
}

fn describe_mismatch(expected: &[String], found: &[String]) -> String {
    let missing: Vec<&str> = expected
        .iter()
        .filter(|n| !found.contains(*n))
        .map(String::as_str)
        .collect();
    let extra: Vec<&str> = found
        .iter()
        .filter(|n| !expected.contains(*n))
        .map(String::as_str)
        .collect();
    if missing.is_empty() && extra.is_empty() {
        format!("same {} names in a different order", expected.len())
    } else {
        format!(
            "expected {} features, found {} (missing: [{}], unexpected: [{}])",
            expected.len(),
            found.len(),
            missing.join(", "),
            extra.join(", ")
        )
    }
}

fn check_names<'a>(
    expected: impl Iterator<Item = &'a str>,
    features: &FeatureVector,
) -> Result<(), PreprocessError> {
    let expected: Vec<&str> = expected.collect();
    if !expected.iter().copied().eq(features.names()) {
        return Err(PreprocessError::ShapeMismatch {
            expected: expected.iter().map(|s| s.to_string()).collect(),
            found: features.names().map(str::to_string).collect(),
        });
    }
    Ok(())
}

fn number(name: &str, value: &FeatureValue) -> Result<f64, PreprocessError> {
    value.as_number().ok_or_else(|| PreprocessError::NonNumeric {
        name: name.to_string(),
    })
}

/// `(x - mean) / scale`, with a zero scale treated as one.
fn standardize(x: f64, mean: f64, scale: f64) -> f64 {
    let scale = if scale == 0.0 { 1.0 } else { scale };
    (x - mean) / scale
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn validate(&self) -> Result<(), String> {
        let n = self.feature_names.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(format!(
                "scaler has {n} names, {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".into());
        }
        if self.scale.iter().any(|s| *s < 0.0) {
            return Err("scaler scales must not be negative".into());
        }
        Ok(())
    }

    fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, PreprocessError> {
        check_names(self.feature_names.iter().map(String::as_str), features)?;
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|((name, value), (mean, scale))| {
                Ok(standardize(number(name, value)?, *mean, *scale) as f32)
            })
            .collect()
    }
}

/// One step of an encoding pipeline; outputs are concatenated in step order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncodingStep {
    Scale {
        column: String,
        mean: f64,
        scale: f64,
    },
    Passthrough {
        column: String,
    },
    OneHot {
        column: String,
        categories: Vec<String>,
    },
}

impl EncodingStep {
    pub fn column(&self) -> &str {
        match self {
            EncodingStep::Scale { column, .. }
            | EncodingStep::Passthrough { column }
            | EncodingStep::OneHot { column, .. } => column,
        }
    }

    fn width(&self) -> usize {
        match self {
            EncodingStep::OneHot { categories, .. } => categories.len(),
            _ => 1,
        }
    }
}

/// Column-wise scaling and one-hot encoding over named inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingPipeline {
    pub input_names: Vec<String>,
    pub steps: Vec<EncodingStep>,
}

impl EncodingPipeline {
    fn validate(&self) -> Result<(), String> {
        for step in &self.steps {
            if !self.input_names.iter().any(|n| n == step.column()) {
                return Err(format!("step uses unknown column '{}'", step.column()));
            }
            match step {
                EncodingStep::Scale { mean, scale, .. } => {
                    if !mean.is_finite() || !scale.is_finite() || *scale < 0.0 {
                        return Err(format!("bad scaling for '{}'", step.column()));
                    }
                }
                EncodingStep::OneHot { categories, .. } if categories.is_empty() => {
                    return Err(format!("no categories for '{}'", step.column()));
                }
                _ => {}
            }
        }
        if let Some(unused) = self
            .input_names
            .iter()
            .find(|n| !self.steps.iter().any(|s| s.column() == n.as_str()))
        {
            return Err(format!("column '{unused}' is not used by any step"));
        }
        Ok(())
    }

    fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, PreprocessError> {
        check_names(self.input_names.iter().map(String::as_str), features)?;
        let mut out = Vec::with_capacity(self.steps.iter().map(EncodingStep::width).sum());
        for step in &self.steps {
            let column = step.column();
            let value = features
                .get(column)
                .ok_or_else(|| PreprocessError::Invalid(format!("no column '{column}'")))?;
            match step {
                EncodingStep::Scale { mean, scale, .. } => {
                    out.push(standardize(number(column, value)?, *mean, *scale) as f32);
                }
                EncodingStep::Passthrough { .. } => out.push(number(column, value)? as f32),
                EncodingStep::OneHot { categories, .. } => {
                    let label = match value {
                        FeatureValue::Category(s) => s.clone(),
                        FeatureValue::Number(x) => x.to_string(),
                    };
                    let hot = categories.iter().position(|c| *c == label).ok_or_else(|| {
                        PreprocessError::UnknownCategory {
                            name: column.to_string(),
                            value: label.clone(),
                        }
                    })?;
                    out.extend((0..categories.len()).map(|i| if i == hot { 1.0 } else { 0.0 }));
                }
            }
        }
        Ok(out)
    }
}

/// Fitted transform applied to an assembled feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preprocessor {
    StandardScaler(StandardScaler),
    EncodingPipeline(EncodingPipeline),
    /// Checks names and order only; the model consumes raw values.
    Passthrough { feature_names: Vec<String> },
}

impl Preprocessor {
    pub fn input_names(&self) -> &[String] {
        match self {
            Preprocessor::StandardScaler(s) => &s.feature_names,
            Preprocessor::EncodingPipeline(p) => &p.input_names,
            Preprocessor::Passthrough { feature_names } => feature_names,
        }
    }

    /// Width of the transformed vector handed to the model.
    pub fn output_width(&self) -> usize {
        match self {
            Preprocessor::EncodingPipeline(p) => p.steps.iter().map(EncodingStep::width).sum(),
            _ => self.input_names().len(),
        }
    }

    /// Names of the transformed columns; one-hot columns read `column=category`.
    pub fn output_names(&self) -> Vec<String> {
        match self {
            Preprocessor::EncodingPipeline(p) => p
                .steps
                .iter()
                .flat_map(|s| match s {
                    EncodingStep::OneHot { column, categories } => categories
                        .iter()
                        .map(|c| format!("{column}={c}"))
                        .collect::<Vec<_>>(),
                    other => vec![other.column().to_string()],
                })
                .collect(),
            _ => self.input_names().to_vec(),
        }
    }

    /// Categories a one-hot column was fitted with.
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        match self {
            Preprocessor::EncodingPipeline(p) => p.steps.iter().find_map(|s| match s {
                EncodingStep::OneHot {
                    column: c,
                    categories,
                } if c == column => Some(categories.as_slice()),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        let res = match self {
            Preprocessor::StandardScaler(s) => s.validate(),
            Preprocessor::EncodingPipeline(p) => p.validate(),
            Preprocessor::Passthrough { .. } => Ok(()),
        };
        res.map_err(PreprocessError::Invalid)?;
        let names = self.input_names();
        if let Some(dup) = names
            .iter()
            .enumerate()
            .find(|(i, n)| names[..*i].contains(*n))
        {
            return Err(PreprocessError::Invalid(format!(
                "duplicate feature name '{}'",
                dup.1
            )));
        }
        Ok(())
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, PreprocessError> {
        let out = match self {
            Preprocessor::StandardScaler(s) => s.transform(features)?,
            Preprocessor::EncodingPipeline(p) => p.transform(features)?,
            Preprocessor::Passthrough { feature_names } => {
                check_names(feature_names.iter().map(String::as_str), features)?;
                features
                    .iter()
                    .map(|(name, value)| Ok(number(name, value)? as f32))
                    .collect::<Result<_, _>>()?
            }
        };
        debug!("preprocessed {} features into {} values", features.len(), out.len());
        Ok(out)
    }
}

/// Pixel rescaling applied to image tensors before the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRescale {
    pub factor: f32,
}

impl Default for PixelRescale {
    fn default() -> Self {
        Self {
            factor: 1.0 / 255.0,
        }
    }
}

impl PixelRescale {
    pub fn apply(&self, image: ImageTensor) -> Tensor {
        let mut t = Tensor::from(image);
        for v in &mut t.data {
            *v *= self.factor;
        }
        t
    }
}
