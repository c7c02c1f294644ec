use std::io::Cursor;
use std::sync::Arc;

use medi_ai::Severity;
use medi_diagnose::demo::{pneumonia_artifact, stroke_artifacts};
use medi_diagnose::{
    write_demo_artifacts, DiagnoseConfig, DiagnoseError, DiagnosisService, ImagePipeline,
    LoadError, Tool, MANIFEST_FILE,
};
use medi_features::{AssemblyError, ImageAssembler, ImageError, ImageTensor, RawInput};
use medi_model::{ArtifactError, EncodingStep, ModelSpec, PixelRescale, Preprocessor};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn demo_service() -> (tempfile::TempDir, DiagnosisService) {
    init();
    let dir = tempfile::tempdir().unwrap();
    let config = write_demo_artifacts(dir.path()).unwrap();
    let service = DiagnosisService::load(&config).unwrap();
    (dir, service)
}

fn breast_cancer_at(fraction: f64) -> RawInput {
    let schema = Tool::BreastCancer.schema().unwrap();
    schema
        .fields
        .iter()
        .map(|f| match f.kind {
            medi_features::FieldKind::Numeric { min, max } => {
                (f.name.clone(), min + fraction * (max - min))
            }
            ref other => panic!("unexpected kind {other:?}"),
        })
        .collect()
}

#[test]
fn loads_all_four_tools() {
    let (_dir, service) = demo_service();
    let tools: Vec<Tool> = service.tools().collect();
    assert_eq!(tools, Tool::ALL);
}

#[test]
fn breast_cancer_midpoint_is_benign_with_explanation() {
    let (_dir, service) = demo_service();
    let d = service
        .predict(Tool::BreastCancer, &breast_cancer_at(0.5))
        .unwrap();
    assert_eq!(d.label, "Benign");
    assert_eq!(d.severity, Severity::Low);
    assert_eq!(d.score, None);
    let explanation = d.explanation.expect("linear svm is explainable");
    assert_eq!(explanation.contributions.len(), 17);
    assert!(explanation.decision_value > 0.0);
}

#[test]
fn breast_cancer_extreme_values_are_malignant() {
    let (_dir, service) = demo_service();
    let d = service
        .predict(Tool::BreastCancer, &breast_cancer_at(0.99))
        .unwrap();
    assert_eq!(d.label, "Malignant");
    assert!(d.advisory.contains("medical professional"));
}

#[test]
fn heart_disease_form_values() {
    let (_dir, service) = demo_service();
    let input = RawInput::new()
        .with("Age", 40i64)
        .with("Sex", 1i64)
        .with("BP", 120i64)
        .with("Cholesterol", 200i64)
        .with("FBS over 120", false)
        .with("EKG results", 0i64)
        .with("Max HR", 150i64)
        .with("Exercise angina", false)
        .with("ST depression", 1.0)
        .with("Slope of ST", 1i64)
        .with("Number of vessels fluro", 0i64)
        .with("Thallium", 3i64)
        .with("Chest pain type_2", false)
        .with("Chest pain type_3", false)
        .with("Chest pain type_4", false);
    let d = service.predict(Tool::HeartDisease, &input).unwrap();
    assert!(["Low", "High"].contains(&d.label.as_str()));
    let score = d.score.unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert_eq!(d.label == "High", score > 0.5);
    assert!(d.explanation.is_none());
}

#[test]
fn missing_field_is_reported_not_defaulted() {
    let (_dir, service) = demo_service();
    let mut input = Tool::HeartDisease.schema().unwrap().defaults();
    input.remove("Thallium");
    let err = service.predict(Tool::HeartDisease, &input).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        DiagnoseError::Input(AssemblyError::MissingFeature { ref name }) if name == "Thallium"
    ));
}

#[test]
fn stroke_defaults_predict_and_unknown_label_fails() {
    let (_dir, service) = demo_service();
    let defaults = Tool::Stroke.schema().unwrap().defaults();
    let d = service.predict(Tool::Stroke, &defaults).unwrap();
    assert_eq!(d.label, "Low Stroke Risk");

    let input = defaults.with("smoking_status", "Sometimes");
    let err = service.predict(Tool::Stroke, &input).unwrap_err();
    assert!(matches!(
        err,
        DiagnoseError::Input(AssemblyError::InvalidChoice { .. })
    ));
}

#[test]
fn black_xray_scores_exactly_half_and_is_negative() {
    let (_dir, service) = demo_service();
    let d = service
        .image_pipeline()
        .predict_pixels(&[150, 150, 3], vec![0.0; 150 * 150 * 3])
        .unwrap();
    assert_eq!(d.score, Some(0.5));
    assert_eq!(d.label, "No Pneumonia Detected");
}

#[test]
fn bright_png_of_any_size_is_resized_and_scored() {
    let (_dir, service) = demo_service();
    let img = image::RgbImage::from_pixel(200, 120, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    let d = service.predict_image(&bytes).unwrap();
    assert_eq!(d.label, "Pneumonia Detected");
    assert!(d.score.unwrap() > 0.9);
}

#[test]
fn caller_built_tensor_with_wrong_channels_is_a_user_error() {
    let (_dir, service) = demo_service();
    let err = service
        .predict_image_tensor(ImageTensor {
            height: 150,
            width: 150,
            channels: 1,
            data: vec![0.0; 150 * 150],
        })
        .unwrap_err();
    assert!(matches!(err, DiagnoseError::Image(ImageError::Shape { .. })));
    assert!(err.is_recoverable());
}

#[test]
fn caller_built_tensor_with_out_of_range_pixels_is_rejected() {
    let (_dir, service) = demo_service();
    let err = service
        .predict_image_tensor(ImageTensor {
            height: 150,
            width: 150,
            channels: 3,
            data: vec![100_000.0; 150 * 150 * 3],
        })
        .unwrap_err();
    assert!(matches!(err, DiagnoseError::Image(ImageError::PixelRange { index: 0, .. })));
    assert!(err.is_recoverable());
}

#[test]
fn caller_built_tensor_in_range_is_scored() {
    let (_dir, service) = demo_service();
    let d = service
        .predict_image_tensor(ImageTensor {
            height: 150,
            width: 150,
            channels: 3,
            data: vec![0.0; 150 * 150 * 3],
        })
        .unwrap();
    assert_eq!(d.label, "No Pneumonia Detected");
}

#[test]
fn demo_directory_carries_a_manifest() {
    init();
    let dir = tempfile::tempdir().unwrap();
    write_demo_artifacts(dir.path()).unwrap();
    assert!(dir.path().join(MANIFEST_FILE).is_file());
    let config = DiagnoseConfig::resolve(Some(dir.path().to_path_buf())).unwrap();
    assert!(DiagnosisService::load(&config).is_ok());
}

#[test]
fn garbage_upload_is_a_user_error() {
    let (_dir, service) = demo_service();
    let err = service.predict_image(b"not an image").unwrap_err();
    assert!(matches!(err, DiagnoseError::Image(_)));
    assert!(err.is_recoverable());
}

#[test]
fn image_tool_rejects_form_input() {
    let (_dir, service) = demo_service();
    let err = service
        .predict(Tool::Pneumonia, &RawInput::new())
        .unwrap_err();
    assert!(matches!(err, DiagnoseError::ImageTool(Tool::Pneumonia)));
}

#[test]
fn missing_artifact_fails_at_load() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let config = write_demo_artifacts(dir.path()).unwrap();
    std::fs::remove_file(config.path(&config.files.stroke_model)).unwrap();
    let err = DiagnosisService::load(&config).unwrap_err();
    assert!(matches!(err, LoadError::Artifact(ArtifactError::Io { .. })));
}

#[test]
fn encoder_missing_a_form_choice_fails_at_load() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let config = write_demo_artifacts(dir.path()).unwrap();

    let (_, mut pipeline) = stroke_artifacts();
    if let Preprocessor::EncodingPipeline(p) = &mut pipeline.preprocessor {
        for step in &mut p.steps {
            if let EncodingStep::OneHot { column, categories } = step {
                if column.as_str() == "work_type" {
                    categories.retain(|c| c != "Never_worked");
                }
            }
        }
    }
    pipeline
        .save(config.path(&config.files.stroke_preprocessor))
        .unwrap();

    match DiagnosisService::load(&config).unwrap_err() {
        LoadError::Mismatch { tool, reason } => {
            assert_eq!(tool, Tool::Stroke);
            assert!(reason.contains("Never_worked"), "{reason}");
        }
        other => panic!("expected mismatch, got {other}"),
    }
}

#[test]
fn service_is_shared_across_threads() {
    let (_dir, service) = demo_service();
    let service = Arc::new(service);
    let input = Arc::new(breast_cancer_at(0.3));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let input = Arc::clone(&input);
            std::thread::spawn(move || service.predict(Tool::BreastCancer, &input).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn unvalidated_network_is_rejected_when_the_pipeline_is_built() {
    init();
    let ModelSpec::ConvNet(mut net) = pneumonia_artifact().model else {
        panic!("pneumonia model is a conv net");
    };
    net.layers.pop();
    let err = ImagePipeline::new(
        Tool::Pneumonia,
        ImageAssembler::default(),
        PixelRescale::default(),
        Arc::new(net),
        Tool::Pneumonia.policy(),
    )
    .unwrap_err();
    match err {
        LoadError::Mismatch { tool, reason } => {
            assert_eq!(tool, Tool::Pneumonia);
            assert!(reason.starts_with("invalid model"), "{reason}");
        }
        other => panic!("expected mismatch, got {other}"),
    }
}
