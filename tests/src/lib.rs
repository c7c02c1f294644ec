//! Shared fixtures for the end-to-end tests.

use medi_diagnose::{write_demo_artifacts, DiagnoseConfig, DiagnosisService, Tool};
use medi_features::{FieldKind, RawInput};
use tempfile::TempDir;

/// A loaded service over demo artifacts; keep the directory alive with it.
pub struct Fixture {
    pub dir: TempDir,
    pub config: DiagnoseConfig,
    pub service: DiagnosisService,
}

pub fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_demo_artifacts(dir.path()).expect("demo artifacts");
    let service = DiagnosisService::load(&config).expect("service loads");
    Fixture {
        dir,
        config,
        service,
    }
}

/// Every breast-cancer feature at `min + t·(max - min)`, `t` in [0, 1).
pub fn breast_cancer_input(t: f64) -> RawInput {
    let schema = Tool::BreastCancer.schema().expect("tabular tool");
    schema
        .fields
        .iter()
        .filter_map(|f| match f.kind {
            FieldKind::Numeric { min, max } => Some((f.name.clone(), min + t * (max - min))),
            _ => None,
        })
        .collect()
}

/// The heart-disease form filled as in the published example.
pub fn heart_disease_input() -> RawInput {
    RawInput::new()
        .with("Age", 40i64)
        .with("Sex", 1i64)
        .with("BP", 120i64)
        .with("Cholesterol", 200i64)
        .with("FBS over 120", false)
        .with("EKG results", "Normal")
        .with("Max HR", 150i64)
        .with("Exercise angina", false)
        .with("ST depression", 0.0)
        .with("Slope of ST", "Upsloping")
        .with("Number of vessels fluro", 0i64)
        .with("Thallium", 3i64)
        .with("Chest pain type_2", false)
        .with("Chest pain type_3", false)
        .with("Chest pain type_4", false)
}

pub fn stroke_input() -> RawInput {
    RawInput::new()
        .with("gender", "Female")
        .with("age", 67.0)
        .with("hypertension", true)
        .with("heart_disease", true)
        .with("ever_married", "Yes")
        .with("work_type", "Private")
        .with("Residence_type", "Urban")
        .with("avg_glucose_level", 228.7)
        .with("smoking_status", "Smokes")
}
