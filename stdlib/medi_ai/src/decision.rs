//! Mapping raw model output to a single declared outcome.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medi_model::ModelOutput;

/// Midpoint used by every probabilistic model. Scores strictly above it are
/// positive; a score of exactly 0.5 is negative.
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    High,
}

/// User-facing result attached to one label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    pub label: String,
    pub severity: Severity,
    pub advisory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Outcome {
    pub fn new(label: impl Into<String>, severity: Severity, advisory: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            severity,
            advisory: advisory.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, url: impl Into<String>) -> Self {
        self.reference = Some(url.into());
        self
    }
}

/// Errors here mean the policy and the model disagree; they are never
/// caused by user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error("model score {0} is not a probability in [0, 1]")]
    ScoreOutOfRange(f64),
    #[error("class index {index} has no outcome (policy declares {declared})")]
    UnknownClass { index: usize, declared: usize },
    #[error("{policy} policy cannot interpret {output:?}")]
    OutputMismatch {
        policy: &'static str,
        output: ModelOutput,
    },
    #[error("policy outcomes {outcomes:?} do not match model classes {classes:?}")]
    ClassMismatch {
        outcomes: Vec<String>,
        classes: Vec<String>,
    },
    #[error("explanation needs {weights} feature values, found {found}")]
    ExplanationWidth { weights: usize, found: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Binary decision on a positive-class probability.
    Threshold {
        threshold: f64,
        negative: Outcome,
        positive: Outcome,
    },
    /// Outcome by class index, in the model's declared class order.
    ClassIndex { outcomes: Vec<Outcome> },
}

impl DecisionPolicy {
    pub fn threshold(negative: Outcome, positive: Outcome) -> Self {
        DecisionPolicy::Threshold {
            threshold: DECISION_THRESHOLD,
            negative,
            positive,
        }
    }

    pub fn class_index(outcomes: Vec<Outcome>) -> Self {
        DecisionPolicy::ClassIndex { outcomes }
    }

    fn kind(&self) -> &'static str {
        match self {
            DecisionPolicy::Threshold { .. } => "threshold",
            DecisionPolicy::ClassIndex { .. } => "class-index",
        }
    }

    pub fn outcomes(&self) -> Vec<&Outcome> {
        match self {
            DecisionPolicy::Threshold {
                negative, positive, ..
            } => vec![negative, positive],
            DecisionPolicy::ClassIndex { outcomes } => outcomes.iter().collect(),
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.outcomes().into_iter().map(|o| o.label.as_str()).collect()
    }

    /// Startup check against the classes a model declares.
    ///
    /// Both policies need one outcome per class. A class-index policy must
    /// also name its outcomes in the model's class order (case-insensitive),
    /// so that index 0 cannot silently mean the opposite label.
    pub fn check_classes(&self, classes: &[String]) -> Result<(), DecisionError> {
        let outcomes = self.outcomes();
        let ordered = match self {
            DecisionPolicy::Threshold { .. } => true,
            DecisionPolicy::ClassIndex { .. } => outcomes
                .iter()
                .zip(classes)
                .all(|(o, c)| o.label.eq_ignore_ascii_case(c)),
        };
        if outcomes.len() != classes.len() || !ordered {
            return Err(DecisionError::ClassMismatch {
                outcomes: outcomes.iter().map(|o| o.label.clone()).collect(),
                classes: classes.to_vec(),
            });
        }
        Ok(())
    }
}

/// The outcome selected for one prediction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub outcome: Outcome,
    /// Positive-class probability, for probabilistic models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

pub fn decide(policy: &DecisionPolicy, output: ModelOutput) -> Result<Decision, DecisionError> {
    let decision = match (policy, output) {
        (
            DecisionPolicy::Threshold {
                threshold,
                negative,
                positive,
            },
            ModelOutput::Probability(p),
        ) => {
            if !(0.0..=1.0).contains(&p) {
                return Err(DecisionError::ScoreOutOfRange(p));
            }
            let outcome = if p > *threshold { positive } else { negative };
            Decision {
                outcome: outcome.clone(),
                score: Some(p),
            }
        }
        (DecisionPolicy::ClassIndex { outcomes }, ModelOutput::Class(index)) => {
            let outcome = outcomes.get(index).ok_or(DecisionError::UnknownClass {
                index,
                declared: outcomes.len(),
            })?;
            Decision {
                outcome: outcome.clone(),
                score: None,
            }
        }
        (policy, output) => {
            return Err(DecisionError::OutputMismatch {
                policy: policy.kind(),
                output,
            })
        }
    };
    debug!("{output:?} -> {}", decision.outcome.label);
    Ok(decision)
}
