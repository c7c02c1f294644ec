use serde::{Deserialize, Serialize};

use crate::decision::DecisionError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureContribution {
    pub feature: String,
    /// Value the model saw, after preprocessing.
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    /// `bias + Σ contribution`, the linear decision value.
    pub decision_value: f64,
    pub bias: f64,
    /// Largest absolute contribution first.
    pub contributions: Vec<FeatureContribution>,
}

impl Explanation {
    pub fn top(&self, n: usize) -> &[FeatureContribution] {
        &self.contributions[..n.min(self.contributions.len())]
    }
}

/// Per-feature contributions `wᵢ·xᵢ` of a model that is linear in `x`.
pub fn explain<S: AsRef<str>>(
    weights: &[f64],
    bias: f64,
    names: &[S],
    x: &[f64],
) -> Result<Explanation, DecisionError> {
    if x.len() != weights.len() || names.len() != weights.len() {
        return Err(DecisionError::ExplanationWidth {
            weights: weights.len(),
            found: x.len().min(names.len()),
        });
    }

    let mut contributions: Vec<FeatureContribution> = weights
        .iter()
        .zip(x)
        .zip(names)
        .map(|((w, v), name)| FeatureContribution {
            feature: name.as_ref().to_string(),
            value: *v,
            weight: *w,
            contribution: w * v,
        })
        .collect();
    let decision_value = bias + contributions.iter().map(|c| c.contribution).sum::<f64>();
    contributions.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));

    Ok(Explanation {
        decision_value,
        bias,
        contributions,
    })
}
