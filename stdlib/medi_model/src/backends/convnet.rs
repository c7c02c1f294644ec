//! Feed-forward convolutional network for single-image binary classification.
//!
//! Tensors are height × width × channels, row-major. Weight layouts follow
//! Keras: a convolution kernel is `[kh][kw][in_channels][filters]` and a
//! dense kernel is `[inputs][units]`.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::backend::{check_shape, BackendError, ModelBackend, ModelOutput, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    Linear,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Linear => x,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    /// Valid padding, stride 1.
    Conv2d {
        filters: usize,
        kernel: [usize; 2],
        weights: Vec<f32>,
        bias: Vec<f32>,
        activation: Activation,
    },
    /// Non-overlapping window, stride equal to its size.
    MaxPool2d { size: [usize; 2] },
    Flatten,
    Dense {
        units: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
        activation: Activation,
    },
    /// Identity at inference time.
    Dropout { rate: f32 },
}

impl Layer {
    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>, String> {
        match self {
            Layer::Conv2d {
                filters,
                kernel: [kh, kw],
                weights,
                bias,
                ..
            } => {
                let [h, w, c] = hwc(input, "conv2d")?;
                if *kh == 0 || *kw == 0 || *kh > h || *kw > w {
                    return Err(format!("conv2d kernel {kh}x{kw} does not fit {h}x{w}"));
                }
                if weights.len() != kh * kw * c * filters {
                    return Err(format!(
                        "conv2d expects {} weights, found {}",
                        kh * kw * c * filters,
                        weights.len()
                    ));
                }
                if bias.len() != *filters {
                    return Err(format!(
                        "conv2d expects {filters} biases, found {}",
                        bias.len()
                    ));
                }
                Ok(vec![h - kh + 1, w - kw + 1, *filters])
            }
            Layer::MaxPool2d { size: [ph, pw] } => {
                let [h, w, c] = hwc(input, "max_pool2d")?;
                if *ph == 0 || *pw == 0 || *ph > h || *pw > w {
                    return Err(format!("pool {ph}x{pw} does not fit {h}x{w}"));
                }
                Ok(vec![h / ph, w / pw, c])
            }
            Layer::Flatten => Ok(vec![input.iter().product()]),
            Layer::Dense {
                units,
                weights,
                bias,
                ..
            } => {
                let [n] = input else {
                    return Err(format!("dense expects a flat input, found {input:?}"));
                };
                if weights.len() != n * units {
                    return Err(format!(
                        "dense expects {} weights, found {}",
                        n * units,
                        weights.len()
                    ));
                }
                if bias.len() != *units {
                    return Err(format!("dense expects {units} biases, found {}", bias.len()));
                }
                Ok(vec![*units])
            }
            Layer::Dropout { .. } => Ok(input.to_vec()),
        }
    }

    fn forward(&self, shape: &[usize], x: Vec<f32>) -> Vec<f32> {
        match self {
            Layer::Conv2d {
                filters,
                kernel: [kh, kw],
                weights,
                bias,
                activation,
            } => conv2d(shape, &x, *filters, [*kh, *kw], weights, bias, *activation),
            Layer::MaxPool2d { size } => max_pool2d(shape, &x, *size),
            Layer::Flatten | Layer::Dropout { .. } => x,
            Layer::Dense {
                units,
                weights,
                bias,
                activation,
            } => (0..*units)
                .map(|u| {
                    let z = x
                        .iter()
                        .enumerate()
                        .map(|(i, xi)| xi * weights[i * units + u])
                        .sum::<f32>()
                        + bias[u];
                    activation.apply(z)
                })
                .collect(),
        }
    }
}

fn hwc(shape: &[usize], layer: &str) -> Result<[usize; 3], String> {
    match shape {
        [h, w, c] => Ok([*h, *w, *c]),
        _ => Err(format!("{layer} expects a 3-d input, found {shape:?}")),
    }
}

fn conv2d(
    shape: &[usize],
    x: &[f32],
    filters: usize,
    [kh, kw]: [usize; 2],
    weights: &[f32],
    bias: &[f32],
    activation: Activation,
) -> Vec<f32> {
    let (h, w, c) = (shape[0], shape[1], shape[2]);
    let (oh, ow) = (h - kh + 1, w - kw + 1);
    let mut out = vec![0.0f32; oh * ow * filters];
    for oy in 0..oh {
        for ox in 0..ow {
            let o = (oy * ow + ox) * filters;
            out[o..o + filters].copy_from_slice(bias);
            for ky in 0..kh {
                for kx in 0..kw {
                    let px = ((oy + ky) * w + (ox + kx)) * c;
                    let wk = (ky * kw + kx) * c * filters;
                    for ci in 0..c {
                        let v = x[px + ci];
                        if v == 0.0 {
                            continue;
                        }
                        let row = &weights[wk + ci * filters..wk + (ci + 1) * filters];
                        for (acc, wf) in out[o..o + filters].iter_mut().zip(row) {
                            *acc += v * wf;
                        }
                    }
                }
            }
            for acc in &mut out[o..o + filters] {
                *acc = activation.apply(*acc);
            }
        }
    }
    out
}

fn max_pool2d(shape: &[usize], x: &[f32], [ph, pw]: [usize; 2]) -> Vec<f32> {
    let (w, c) = (shape[1], shape[2]);
    let (oh, ow) = (shape[0] / ph, w / pw);
    let mut out = vec![f32::NEG_INFINITY; oh * ow * c];
    for oy in 0..oh {
        for ox in 0..ow {
            let o = (oy * ow + ox) * c;
            for dy in 0..ph {
                for dx in 0..pw {
                    let p = ((oy * ph + dy) * w + (ox * pw + dx)) * c;
                    for ci in 0..c {
                        out[o + ci] = out[o + ci].max(x[p + ci]);
                    }
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvNet {
    pub input_shape: [usize; 3],
    pub layers: Vec<Layer>,
    pub classes: Vec<String>,
}

impl ConvNet {
    /// Sigmoid score of the positive class.
    ///
    /// `input` must hold `input_shape` values. Each layer's shape is checked
    /// before it runs, so a malformed network fails instead of indexing out
    /// of bounds.
    pub fn forward(&self, input: &[f32]) -> Result<f32, String> {
        let mut shape = self.input_shape.to_vec();
        let mut x = input.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            let next = layer
                .output_shape(&shape)
                .map_err(|e| format!("layer {i}: {e}"))?;
            x = layer.forward(&shape, x);
            shape = next;
            trace!("layer output shape {shape:?}");
        }
        x.first()
            .copied()
            .ok_or_else(|| "network produced no output".to_string())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() != 2 {
            return Err(format!(
                "binary network needs 2 classes, found {}",
                self.classes.len()
            ));
        }
        let mut shape = self.input_shape.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            shape = layer
                .output_shape(&shape)
                .map_err(|e| format!("layer {i}: {e}"))?;
        }
        if shape != [1] {
            return Err(format!("network must end in one unit, ends in {shape:?}"));
        }
        let head = self
            .layers
            .iter()
            .rev()
            .find(|l| !matches!(l, Layer::Dropout { .. }));
        match head {
            Some(Layer::Dense {
                activation: Activation::Sigmoid,
                ..
            }) => Ok(()),
            _ => Err("network must end in a sigmoid dense layer".into()),
        }
    }
}

impl ModelBackend for ConvNet {
    fn infer(&self, input: &Tensor) -> Result<ModelOutput, BackendError> {
        check_shape(input, &self.input_shape)?;
        let score = self
            .forward(&input.data)
            .map_err(BackendError::InferenceError)?;
        if !score.is_finite() {
            return Err(BackendError::InferenceError(format!(
                "non-finite network output {score}"
            )));
        }
        Ok(ModelOutput::Probability(f64::from(score)))
    }

    fn input_shape(&self) -> Vec<usize> {
        self.input_shape.to_vec()
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn backend_name(&self) -> &str {
        "conv_net"
    }

    fn validate(&self) -> Result<(), String> {
        ConvNet::validate(self)
    }
}
