//! Built-in decision policies and advisory text for each diagnosis tool.

use crate::decision::{DecisionPolicy, Outcome, Severity};

pub const DISCLAIMER: &str = "This tool is not a substitute for professional medical advice, \
diagnosis, or treatment. Always seek the advice of your physician or other qualified health \
provider with any questions you may have regarding a medical condition.";

pub const HEART_DISEASE_REFERENCE: &str = "https://medlineplus.gov/ency/article/002203.htm";
pub const STROKE_REFERENCE: &str = "https://www.stroke.org/en/about-stroke/stroke-prevention";

/// Class 0 is malignant and class 1 benign, as in the training labels.
pub fn breast_cancer_policy() -> DecisionPolicy {
    DecisionPolicy::class_index(vec![
        Outcome::new(
            "Malignant",
            Severity::High,
            "Please consult with a medical professional for further evaluation and guidance.",
        ),
        Outcome::new(
            "Benign",
            Severity::Low,
            "The tumor is predicted to be benign. For peace of mind, please verify with a \
             healthcare provider.",
        ),
    ])
}

pub fn heart_disease_policy() -> DecisionPolicy {
    DecisionPolicy::threshold(
        Outcome::new(
            "Low",
            Severity::Low,
            "You appear to be at a low risk of heart disease. However, it's essential to \
             maintain a healthy lifestyle and consult with a healthcare professional for \
             regular check-ups and guidance.",
        ),
        Outcome::new(
            "High",
            Severity::High,
            "You may consider consulting a healthcare professional for further evaluation \
             and advice.",
        )
        .with_reference(HEART_DISEASE_REFERENCE),
    )
}

pub fn stroke_policy() -> DecisionPolicy {
    DecisionPolicy::threshold(
        Outcome::new(
            "Low Stroke Risk",
            Severity::Low,
            "Continue to maintain a healthy lifestyle.",
        ),
        Outcome::new(
            "High Stroke Risk",
            Severity::High,
            "Consult a healthcare professional for further evaluation and advice.",
        )
        .with_reference(STROKE_REFERENCE),
    )
}

pub fn pneumonia_policy() -> DecisionPolicy {
    DecisionPolicy::threshold(
        Outcome::new(
            "No Pneumonia Detected",
            Severity::Low,
            "However, for peace of mind, please verify with a healthcare provider.",
        ),
        Outcome::new(
            "Pneumonia Detected",
            Severity::High,
            "Please consult with a medical professional for further evaluation and guidance.",
        ),
    )
}
