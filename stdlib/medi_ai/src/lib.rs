//! Decision layer: turns raw model output into a labelled outcome with
//! advisory text, and explains linear models feature by feature.

pub mod decision;
pub mod decision_support;
pub mod explain;

pub use decision::{
    decide, Decision, DecisionError, DecisionPolicy, Outcome, Severity, DECISION_THRESHOLD,
};
pub use decision_support::{
    breast_cancer_policy, heart_disease_policy, pneumonia_policy, stroke_policy, DISCLAIMER,
};
pub use explain::{explain, Explanation, FeatureContribution};
