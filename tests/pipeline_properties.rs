//! Invariants of the predict path that hold for any frozen model.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use medi_diagnose::{DiagnoseError, LoadError, TabularPipeline, Tool};
use medi_features::{FeatureValue, FeatureVector, FieldKind, RawInput};
use medi_model::{
    BackendError, ModelBackend, ModelOutput, PreprocessError, Preprocessor, StandardScaler, Tensor,
};
use tests::{breast_cancer_input, fixture, heart_disease_input};

/// Returns the same probability for every input of width `width`.
struct Fixed {
    p: f64,
    width: usize,
    classes: Vec<String>,
}

impl ModelBackend for Fixed {
    fn infer(&self, input: &Tensor) -> Result<ModelOutput, BackendError> {
        medi_model::check_shape(input, &[self.width])?;
        Ok(ModelOutput::Probability(self.p))
    }

    fn input_shape(&self) -> Vec<usize> {
        vec![self.width]
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn backend_name(&self) -> &str {
        "fixed"
    }
}

fn heart_pipeline(p: f64) -> Result<TabularPipeline, LoadError> {
    let schema = Tool::HeartDisease.schema().unwrap();
    let names: Vec<String> = schema.names().map(str::to_string).collect();
    let model = Fixed {
        p,
        width: names.len(),
        classes: vec!["absence".into(), "presence".into()],
    };
    TabularPipeline::new(
        Tool::HeartDisease,
        schema,
        Preprocessor::Passthrough {
            feature_names: names,
        },
        Arc::new(model),
        Tool::HeartDisease.policy(),
    )
}

#[test]
fn score_of_exactly_half_is_negative() {
    let d = heart_pipeline(0.5)
        .unwrap()
        .predict(&heart_disease_input())
        .unwrap();
    assert_eq!(d.label, "Low");
    assert_eq!(d.score, Some(0.5));
}

#[test]
fn score_just_above_half_is_positive() {
    let d = heart_pipeline(0.500_001)
        .unwrap()
        .predict(&heart_disease_input())
        .unwrap();
    assert_eq!(d.label, "High");
}

#[test]
fn probability_outside_unit_interval_is_a_configuration_error() {
    let err = heart_pipeline(1.2)
        .unwrap()
        .predict(&heart_disease_input())
        .unwrap_err();
    assert!(matches!(err, DiagnoseError::Decision(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn model_with_wrong_width_is_rejected_at_construction() {
    let schema = Tool::HeartDisease.schema().unwrap();
    let names: Vec<String> = schema.names().map(str::to_string).collect();
    let model = Fixed {
        p: 0.1,
        width: names.len() - 1,
        classes: vec!["absence".into(), "presence".into()],
    };
    let err = TabularPipeline::new(
        Tool::HeartDisease,
        schema,
        Preprocessor::Passthrough {
            feature_names: names,
        },
        Arc::new(model),
        Tool::HeartDisease.policy(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::Mismatch { tool: Tool::HeartDisease, .. }));
}

#[test]
fn scaler_fitted_on_other_columns_is_rejected_at_construction() {
    let schema = Tool::HeartDisease.schema().unwrap();
    let mut names: Vec<String> = schema.names().map(str::to_string).collect();
    names.swap(0, 1);
    let n = names.len();
    let scaler = Preprocessor::StandardScaler(StandardScaler {
        feature_names: names,
        mean: vec![0.0; n],
        scale: vec![1.0; n],
    });
    let model = Fixed {
        p: 0.1,
        width: n,
        classes: vec!["absence".into(), "presence".into()],
    };
    let err = TabularPipeline::new(
        Tool::HeartDisease,
        schema,
        scaler,
        Arc::new(model),
        Tool::HeartDisease.policy(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::Mismatch { .. }));
}

#[test]
fn missing_or_extra_features_never_reach_the_model() {
    let scaler = Preprocessor::StandardScaler(StandardScaler {
        feature_names: vec!["a".into(), "b".into()],
        mean: vec![0.0, 0.0],
        scale: vec![1.0, 1.0],
    });
    let missing = FeatureVector::from_numbers([("a", 1.0)]);
    let mut extra = FeatureVector::from_numbers([("a", 1.0), ("b", 2.0)]);
    extra.push("c", FeatureValue::Number(3.0));

    for features in [missing, extra] {
        assert!(matches!(
            scaler.transform(&features),
            Err(PreprocessError::ShapeMismatch { .. })
        ));
    }
}

fn breast_cancer_fraction() -> impl Strategy<Value = f64> {
    0.0..0.99f64
}

fn heart_disease_form() -> impl Strategy<Value = RawInput> {
    (21i64..=77, 94i64..=200, 126i64..=564, 71i64..=202, 0.0..6.2f64, 0i64..=3)
        .prop_map(|(age, bp, chol, hr, st, vessels)| {
            heart_disease_input()
                .with("Age", age)
                .with("BP", bp)
                .with("Cholesterol", chol)
                .with("Max HR", hr)
                .with("ST depression", st)
                .with("Number of vessels fluro", vessels)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn breast_cancer_predictions_are_deterministic(t in breast_cancer_fraction()) {
        let fx = fixture();
        let input = breast_cancer_input(t);
        let first = fx.service.predict(Tool::BreastCancer, &input).unwrap();
        let second = fx.service.predict(Tool::BreastCancer, &input).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn heart_disease_labels_are_closed(input in heart_disease_form()) {
        let fx = fixture();
        let d = fx.service.predict(Tool::HeartDisease, &input).unwrap();
        let score = d.score.unwrap();
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert!(Tool::HeartDisease.policy().labels().contains(&d.label.as_str()));
        prop_assert_eq!(d.label == "High", score > 0.5);
    }

    #[test]
    fn every_field_in_range_assembles(t in 0.0..1.0f64) {
        let schema = Tool::BreastCancer.schema().unwrap();
        let input: RawInput = schema
            .fields
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::Numeric { min, max } => Some((f.name.clone(), (min + t * (max - min)).min(max))),
                _ => None,
            })
            .collect();
        prop_assert_eq!(schema.assemble(&input).unwrap().len(), 17);
    }
}
