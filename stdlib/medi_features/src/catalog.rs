//! Built-in schemas of the diagnosis tools.
//!
//! Ranges and choices mirror the form widgets the models were published
//! with; the field names and their order are what the frozen artifacts
//! were fit on.

use crate::schema::{Choice, FieldSpec, Schema};

/// Breast-cancer features remaining after the correlation-based reduction,
/// with their observed `[min, max]` in the Wisconsin dataset.
const BREAST_CANCER_RANGES: [(&str, f64, f64); 17] = [
    ("mean texture", 9.71, 39.28),
    ("mean perimeter", 43.79, 188.5),
    ("mean smoothness", 0.05263, 0.1634),
    ("mean concavity", 0.0, 0.4268),
    ("mean symmetry", 0.106, 0.304),
    ("perimeter error", 0.757, 21.98),
    ("compactness error", 0.002252, 0.1354),
    ("concavity error", 0.0, 0.396),
    ("concave points error", 0.0, 0.05279),
    ("worst texture", 12.02, 49.54),
    ("worst perimeter", 50.41, 251.2),
    ("worst smoothness", 0.07117, 0.2226),
    ("worst compactness", 0.02729, 1.058),
    ("worst concavity", 0.0, 1.252),
    ("worst concave points", 0.0, 0.291),
    ("worst symmetry", 0.1565, 0.6638),
    ("worst fractal dimension", 0.05504, 0.2075),
];

pub fn breast_cancer_schema() -> Schema {
    let fields = BREAST_CANCER_RANGES
        .iter()
        .map(|&(name, min, max)| {
            FieldSpec::numeric(name, min, max)
                .with_label(format!("{name} ({min} - {max})"))
                .with_default((min + max) / 2.0)
        })
        .collect();
    Schema::new("breast_cancer", fields)
}

pub fn heart_disease_schema() -> Schema {
    Schema::new(
        "heart_disease",
        vec![
            FieldSpec::integer("Age", 21.0, 77.0)
                .with_label("Age (21-77)")
                .with_default(40.0),
            FieldSpec::coded(
                "Sex",
                vec![Choice::new("Female", 0.0), Choice::new("Male", 1.0)],
            )
            .with_default("Female"),
            FieldSpec::integer("BP", 94.0, 200.0)
                .with_label("Blood Pressure (mm Hg)")
                .with_default(120.0),
            FieldSpec::integer("Cholesterol", 126.0, 564.0).with_default(200.0),
            FieldSpec::flag("FBS over 120")
                .with_label("Fasting Blood Sugar > 120 mg/dl")
                .with_default(false),
            FieldSpec::coded(
                "EKG results",
                vec![
                    Choice::new("Normal", 0.0),
                    Choice::new("ST-T Wave Abnormality", 1.0),
                    Choice::new("Left Ventricular Hypertrophy", 2.0),
                ],
            )
            .with_default("Normal"),
            FieldSpec::integer("Max HR", 71.0, 202.0)
                .with_label("Maximum Heart Rate")
                .with_default(150.0),
            FieldSpec::flag("Exercise angina")
                .with_label("Exercise-Induced Angina")
                .with_default(false),
            FieldSpec::numeric("ST depression", 0.0, 6.2).with_default(2.0),
            FieldSpec::coded(
                "Slope of ST",
                vec![
                    Choice::new("Upsloping", 1.0),
                    Choice::new("Flat", 2.0),
                    Choice::new("Downsloping", 3.0),
                ],
            )
            .with_label("Slope of ST Segment")
            .with_default("Upsloping"),
            FieldSpec::integer("Number of vessels fluro", 0.0, 3.0)
                .with_label("Number of Vessels Colored by Fluoroscopy (0-3)")
                .with_default(0.0),
            FieldSpec::integer("Thallium", 3.0, 7.0).with_default(3.0),
            // Chest pain type 1 (typical angina) is the dropped dummy level.
            FieldSpec::flag("Chest pain type_2")
                .with_label("Atypical Angina")
                .with_default(false),
            FieldSpec::flag("Chest pain type_3")
                .with_label("Non-Anginal Pain")
                .with_default(false),
            FieldSpec::flag("Chest pain type_4")
                .with_label("Asymptomatic")
                .with_default(false),
        ],
    )
}

pub fn stroke_schema() -> Schema {
    Schema::new(
        "stroke",
        vec![
            FieldSpec::category("gender", ["Male", "Female", "Other"])
                .with_label("Gender")
                .with_default("Male"),
            FieldSpec::numeric("age", 0.0, 100.0)
                .with_label("Age")
                .with_default(50.0),
            FieldSpec::flag("hypertension")
                .with_label("Hypertension")
                .with_default(false),
            FieldSpec::flag("heart_disease")
                .with_label("Heart disease")
                .with_default(false),
            FieldSpec::category("ever_married", ["No", "Yes"])
                .with_label("Married")
                .with_default("No"),
            FieldSpec::category(
                "work_type",
                ["Children", "Govt_job", "Never_worked", "Private", "Self-employed"],
            )
            .with_label("Work type")
            .with_default("Children"),
            FieldSpec::category("Residence_type", ["Rural", "Urban"])
                .with_label("Residence type")
                .with_default("Rural"),
            FieldSpec::numeric("avg_glucose_level", 0.0, 500.0)
                .with_label("Average Glucose Level")
                .with_default(100.0),
            FieldSpec::category(
                "smoking_status",
                ["Formerly smoked", "Never smoked", "Smokes", "Unknown"],
            )
            .with_label("Smoking Status")
            .with_default("Formerly smoked"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn breast_cancer_has_seventeen_numeric_fields() {
        let schema = breast_cancer_schema();
        assert_eq!(schema.len(), 17);
        assert!(schema
            .fields
            .iter()
            .all(|f| matches!(f.kind, FieldKind::Numeric { .. })));
    }

    #[test]
    fn heart_disease_field_order() {
        let names: Vec<_> = heart_disease_schema().names().map(str::to_string).collect();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "Age");
        assert_eq!(names[4], "FBS over 120");
        assert_eq!(names[14], "Chest pain type_4");
    }

    #[test]
    fn every_builtin_schema_accepts_its_defaults() {
        for schema in [breast_cancer_schema(), heart_disease_schema(), stroke_schema()] {
            let v = schema.assemble(&schema.defaults());
            assert!(v.is_ok(), "{}: {:?}", schema.name, v.err());
        }
    }
}
