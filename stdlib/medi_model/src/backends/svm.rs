//! Binary support-vector classifier.
//!
//! Parameters follow scikit-learn's `SVC` attributes: the decision value is
//! `Σ dual_coef[i] · K(support_vectors[i], x) + intercept` and a positive
//! value selects `classes[1]`.

use serde::{Deserialize, Serialize};

use crate::backend::{check_shape, BackendError, ModelBackend, ModelOutput, Tensor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn eval(&self, a: &[f64], b: &[f32]) -> f64 {
        match self {
            Kernel::Linear => dot(a, b),
            Kernel::Rbf { gamma } => {
                let d2: f64 = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| {
                        let d = x - f64::from(*y);
                        d * d
                    })
                    .sum();
                (-gamma * d2).exp()
            }
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * dot(a, b) + coef0).powi(*degree as i32),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }

    fn gamma(&self) -> Option<f64> {
        match self {
            Kernel::Linear => None,
            Kernel::Rbf { gamma } | Kernel::Poly { gamma, .. } | Kernel::Sigmoid { gamma, .. } => {
                Some(*gamma)
            }
        }
    }
}

fn dot(a: &[f64], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * f64::from(*y)).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmClassifier {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    pub classes: Vec<String>,
}

impl SvmClassifier {
    pub fn n_features(&self) -> usize {
        self.support_vectors.first().map_or(0, Vec::len)
    }

    /// Signed distance from the separating surface.
    pub fn decision_value(&self, x: &[f32]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, alpha)| alpha * self.kernel.eval(sv, x))
            .sum::<f64>()
            + self.intercept
    }

    /// Primal weights `Σ αᵢ·svᵢ`, only defined for the linear kernel.
    pub fn linear_weights(&self) -> Option<Vec<f64>> {
        if self.kernel != Kernel::Linear {
            return None;
        }
        let mut w = vec![0.0; self.n_features()];
        for (sv, alpha) in self.support_vectors.iter().zip(&self.dual_coef) {
            for (wi, s) in w.iter_mut().zip(sv) {
                *wi += alpha * s;
            }
        }
        Some(w)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() != 2 {
            return Err(format!(
                "binary SVM needs 2 classes, found {}",
                self.classes.len()
            ));
        }
        let width = self.n_features();
        if width == 0 {
            return Err("SVM has no support vectors".into());
        }
        if let Some(i) = self.support_vectors.iter().position(|sv| sv.len() != width) {
            return Err(format!(
                "support vector {i} has {} features, expected {width}",
                self.support_vectors[i].len()
            ));
        }
        if self.dual_coef.len() != self.support_vectors.len() {
            return Err(format!(
                "{} dual coefficients for {} support vectors",
                self.dual_coef.len(),
                self.support_vectors.len()
            ));
        }
        let finite = self.intercept.is_finite()
            && self.dual_coef.iter().all(|a| a.is_finite())
            && self.support_vectors.iter().flatten().all(|s| s.is_finite());
        if !finite {
            return Err("SVM parameters must be finite".into());
        }
        if let Some(gamma) = self.kernel.gamma() {
            if !(gamma > 0.0 && gamma.is_finite()) {
                return Err(format!("kernel gamma must be positive, got {gamma}"));
            }
        }
        Ok(())
    }
}

impl ModelBackend for SvmClassifier {
    fn infer(&self, input: &Tensor) -> Result<ModelOutput, BackendError> {
        check_shape(input, &[self.n_features()])?;
        let d = self.decision_value(&input.data);
        if !d.is_finite() {
            return Err(BackendError::InferenceError(format!(
                "non-finite decision value {d}"
            )));
        }
        Ok(ModelOutput::Class(usize::from(d > 0.0)))
    }

    fn input_shape(&self) -> Vec<usize> {
        vec![self.n_features()]
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn backend_name(&self) -> &str {
        "svm"
    }

    fn linear_terms(&self) -> Option<(Vec<f64>, f64)> {
        self.linear_weights().map(|w| (w, self.intercept))
    }

    fn validate(&self) -> Result<(), String> {
        SvmClassifier::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> SvmClassifier {
        SvmClassifier {
            kernel: Kernel::Linear,
            support_vectors: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            dual_coef: vec![1.0, -1.0],
            intercept: 0.0,
            classes: vec!["malignant".into(), "benign".into()],
        }
    }

    #[test]
    fn linear_decision_and_weights() {
        let svm = linear();
        assert!((svm.decision_value(&[2.0, 1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(svm.linear_weights(), Some(vec![1.0, -1.0]));
        assert_eq!(
            svm.infer(&Tensor::vector("x", vec![2.0, 1.0])).unwrap(),
            ModelOutput::Class(1)
        );
        assert_eq!(
            svm.infer(&Tensor::vector("x", vec![1.0, 2.0])).unwrap(),
            ModelOutput::Class(0)
        );
    }

    #[test]
    fn zero_decision_selects_first_class() {
        let svm = linear();
        assert_eq!(
            svm.infer(&Tensor::vector("x", vec![1.0, 1.0])).unwrap(),
            ModelOutput::Class(0)
        );
    }

    #[test]
    fn rbf_kernel_at_support_vector_is_one() {
        let k = Kernel::Rbf { gamma: 0.5 };
        assert!((k.eval(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-12);
        assert!(k.eval(&[0.0, 0.0], &[3.0, 4.0]) < 1e-5);
    }

    #[test]
    fn non_linear_has_no_weights() {
        let mut svm = linear();
        svm.kernel = Kernel::Rbf { gamma: 0.1 };
        assert_eq!(svm.linear_weights(), None);
        assert!(svm.linear_terms().is_none());
    }

    #[test]
    fn wrong_width_is_shape_mismatch() {
        let err = linear()
            .infer(&Tensor::vector("x", vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, BackendError::ShapeMismatch { .. }));
    }

    #[test]
    fn validate_catches_inconsistency() {
        let mut svm = linear();
        svm.dual_coef.pop();
        assert!(svm.validate().is_err());

        let mut svm = linear();
        svm.support_vectors[1].push(3.0);
        assert!(svm.validate().is_err());

        let mut svm = linear();
        svm.kernel = Kernel::Rbf { gamma: 0.0 };
        assert!(svm.validate().is_err());

        assert!(linear().validate().is_ok());
    }
}
