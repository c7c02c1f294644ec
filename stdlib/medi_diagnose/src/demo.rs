//! Synthetic demonstration artifacts.
//!
//! These have the exact shapes of the published models (feature names,
//! widths, class order, image resolution) but hand-set weights. They exist
//! for trying the tools end to end and for tests; they are not trained and
//! carry no clinical meaning.

use log::info;
use std::path::Path;

use medi_features::{breast_cancer_schema, heart_disease_schema, stroke_schema, FieldKind};
use medi_model::{
    Activation, Aggregation, ArtifactMetadata, ConvNet, EncodingPipeline,
    EncodingStep, Kernel, Layer, ModelArtifact, ModelSpec, ModelVersion, Node, Preprocessor,
    PreprocessorArtifact, SplitRule, StandardScaler, SvmClassifier, Tree, TreeEnsemble,
};

use crate::config::DiagnoseConfig;
use crate::error::LoadError;

const DEMO_NOTE: &str = "synthetic demonstration weights, not trained";

fn meta(name: &str) -> ArtifactMetadata {
    ArtifactMetadata::new(name, ModelVersion::new(0, 1, 0)).with_description(DEMO_NOTE)
}

fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Node {
    Node::Split {
        feature,
        threshold,
        left,
        right,
        default_left: true,
    }
}

fn leaf(value: f64) -> Node {
    Node::Leaf { value }
}

fn stump(feature: usize, threshold: f64, below: f64, above: f64) -> Tree {
    Tree {
        nodes: vec![split(feature, threshold, 1, 2), leaf(below), leaf(above)],
    }
}

/// Linear SVM over standardized features plus the scaler it expects.
pub fn breast_cancer_artifacts() -> (ModelArtifact, PreprocessorArtifact) {
    let schema = breast_cancer_schema();
    let mut names = Vec::new();
    let mut mean = Vec::new();
    let mut scale = Vec::new();
    for field in &schema.fields {
        if let FieldKind::Numeric { min, max } = field.kind {
            names.push(field.name.clone());
            mean.push((min + max) / 2.0);
            scale.push((max - min) / 4.0);
        }
    }
    let n = names.len();

    // Larger, more irregular cells push towards class 0 (malignant).
    let malignant: Vec<f64> = (0..n).map(|i| 0.6 + 0.1 * (i % 4) as f64).collect();
    let benign: Vec<f64> = malignant.iter().map(|v| -v).collect();
    let svm = SvmClassifier {
        kernel: Kernel::Linear,
        support_vectors: vec![malignant, benign],
        dual_coef: vec![-0.5, 0.5],
        intercept: 0.4,
        classes: vec!["malignant".into(), "benign".into()],
    };

    let scaler = Preprocessor::StandardScaler(StandardScaler {
        feature_names: names,
        mean,
        scale,
    });
    (
        ModelArtifact::new(meta("breast cancer svm"), ModelSpec::Svm(svm)),
        PreprocessorArtifact::new(meta("breast cancer scaler"), scaler),
    )
}

/// Gradient-boosted stumps over the raw heart-disease features.
pub fn heart_disease_artifact() -> ModelArtifact {
    let n_features = heart_disease_schema().len();
    let trees = vec![
        stump(0, 55.0, -0.3, 0.4),
        stump(3, 240.0, -0.2, 0.3),
        stump(6, 140.0, 0.5, -0.4),
        stump(8, 1.5, -0.3, 0.5),
        stump(10, 1.0, -0.6, 0.7),
        stump(11, 6.0, -0.5, 0.6),
        stump(14, 0.5, -0.4, 0.7),
        // sex, then blood pressure for men
        Tree {
            nodes: vec![
                split(1, 0.5, 1, 2),
                leaf(-0.2),
                split(2, 140.0, 3, 4),
                leaf(0.1),
                leaf(0.4),
            ],
        },
    ];
    let ensemble = TreeEnsemble {
        n_features,
        split_rule: SplitRule::Less,
        aggregation: Aggregation::Logistic { base_margin: -0.2 },
        trees,
        classes: vec!["absence".into(), "presence".into()],
    };
    ModelArtifact::new(meta("heart disease gbdt"), ModelSpec::TreeEnsemble(ensemble))
}

/// Encoding pipeline in schema order, then a small random forest.
///
/// Transformed layout: gender 0..3, age 3, hypertension 4, heart_disease 5,
/// ever_married 6..8, work_type 8..13, Residence_type 13..15,
/// avg_glucose_level 15, smoking_status 16..20.
pub fn stroke_artifacts() -> (ModelArtifact, PreprocessorArtifact) {
    let schema = stroke_schema();
    let steps = schema
        .fields
        .iter()
        .map(|field| {
            let column = field.name.clone();
            match (&field.kind, field.name.as_str()) {
                (FieldKind::Category { choices }, _) => EncodingStep::OneHot {
                    column,
                    categories: choices.clone(),
                },
                (_, "age") => EncodingStep::Scale {
                    column,
                    mean: 43.2,
                    scale: 22.6,
                },
                (_, "avg_glucose_level") => EncodingStep::Scale {
                    column,
                    mean: 106.1,
                    scale: 45.3,
                },
                _ => EncodingStep::Passthrough { column },
            }
        })
        .collect();
    let pipeline = Preprocessor::EncodingPipeline(EncodingPipeline {
        input_names: schema.names().map(str::to_string).collect(),
        steps,
    });

    let forest = TreeEnsemble {
        n_features: pipeline.output_width(),
        split_rule: SplitRule::LessOrEqual,
        aggregation: Aggregation::Mean,
        trees: vec![
            stump(3, 1.0, 0.05, 0.65),
            stump(15, 1.5, 0.1, 0.55),
            stump(4, 0.5, 0.1, 0.5),
            // heart disease, then current smoking
            Tree {
                nodes: vec![
                    split(5, 0.5, 1, 2),
                    split(18, 0.5, 3, 4),
                    leaf(0.6),
                    leaf(0.05),
                    leaf(0.3),
                ],
            },
        ],
        classes: vec!["no stroke".into(), "stroke".into()],
    };
    (
        ModelArtifact::new(meta("stroke random forest"), ModelSpec::TreeEnsemble(forest)),
        PreprocessorArtifact::new(meta("stroke encoding pipeline"), pipeline),
    )
}

/// One convolution with a brightness and an edge filter, pooled and read
/// out by a single sigmoid unit. A black image scores exactly 0.5.
pub fn pneumonia_artifact() -> ModelArtifact {
    let (side, channels, filters) = (150, 3, 2);
    let (kh, kw) = (3, 3);
    let mut conv = Vec::with_capacity(kh * kw * channels * filters);
    for _ky in 0..kh {
        for kx in 0..kw {
            for _c in 0..channels {
                conv.push(1.0 / 27.0);
                conv.push((kx as f32 - 1.0) / 9.0);
            }
        }
    }
    let pooled = (side - kh + 1) / 4;
    let flat = pooled * pooled * filters;
    let dense = (0..flat)
        .map(|i| if i % filters == 0 { 0.004 } else { 0.02 })
        .collect();

    let net = ConvNet {
        input_shape: [side, side, channels],
        layers: vec![
            Layer::Conv2d {
                filters,
                kernel: [kh, kw],
                weights: conv,
                bias: vec![0.0; filters],
                activation: Activation::Relu,
            },
            Layer::MaxPool2d { size: [4, 4] },
            Layer::Flatten,
            Layer::Dropout { rate: 0.5 },
            Layer::Dense {
                units: 1,
                weights: dense,
                bias: vec![0.0],
                activation: Activation::Sigmoid,
            },
        ],
        classes: vec!["normal".into(), "pneumonia".into()],
    };
    ModelArtifact::new(meta("chest x-ray cnn"), ModelSpec::ConvNet(net))
}

/// Write every demo artifact under `dir` with the default file names, plus
/// a manifest naming them.
pub fn write_demo_artifacts(dir: impl AsRef<Path>) -> Result<DiagnoseConfig, LoadError> {
    let config = DiagnoseConfig::new(dir.as_ref());
    let files = &config.files;

    let (svm, scaler) = breast_cancer_artifacts();
    svm.save(config.path(&files.breast_cancer_model))?;
    scaler.save(config.path(&files.breast_cancer_scaler))?;
    heart_disease_artifact().save(config.path(&files.heart_disease_model))?;
    let (forest, pipeline) = stroke_artifacts();
    forest.save(config.path(&files.stroke_model))?;
    pipeline.save(config.path(&files.stroke_preprocessor))?;
    pneumonia_artifact().save(config.path(&files.pneumonia_model))?;
    config.write_manifest()?;

    info!("wrote demo artifacts to {}", config.artifact_dir.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MANIFEST_FILE;

    #[test]
    fn demo_artifacts_validate() {
        let (svm, scaler) = breast_cancer_artifacts();
        svm.validate().unwrap();
        scaler.validate().unwrap();
        heart_disease_artifact().validate().unwrap();
        let (forest, pipeline) = stroke_artifacts();
        forest.validate().unwrap();
        pipeline.validate().unwrap();
        pneumonia_artifact().validate().unwrap();
    }

    #[test]
    fn written_manifest_reloads_the_same_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_demo_artifacts(dir.path()).unwrap();
        assert!(dir.path().join(MANIFEST_FILE).is_file());
        assert_eq!(DiagnoseConfig::from_dir(dir.path()).unwrap(), config);
    }

    #[test]
    fn stroke_layout_matches_documented_indices() {
        let (_, pipeline) = stroke_artifacts();
        let names = pipeline.preprocessor.output_names();
        assert_eq!(names.len(), 20);
        assert_eq!(names[3], "age");
        assert_eq!(names[4], "hypertension");
        assert_eq!(names[5], "heart_disease");
        assert_eq!(names[15], "avg_glucose_level");
        assert_eq!(names[18], "smoking_status=Smokes");
    }

    #[test]
    fn breast_cancer_scaler_follows_schema_order() {
        let (_, scaler) = breast_cancer_artifacts();
        let schema = breast_cancer_schema();
        assert!(scaler
            .preprocessor
            .input_names()
            .iter()
            .map(String::as_str)
            .eq(schema.names()));
    }
}
