//! Decision-tree ensembles: gradient-boosted trees and random forests.

use serde::{Deserialize, Serialize};

use crate::backend::{check_shape, BackendError, ModelBackend, ModelOutput, Tensor};

/// How a split compares a feature against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// `x < threshold` goes left (XGBoost, LightGBM).
    Less,
    /// `x <= threshold` goes left (scikit-learn).
    LessOrEqual,
}

/// How leaf values of all trees become one probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum of leaf margins plus `base_margin`, squashed by the logistic function.
    Logistic { base_margin: f64 },
    /// Mean of per-tree positive-class probabilities.
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Direction for missing (NaN) values.
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

/// A single tree; node 0 is the root and children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf reached by `x`, or `None` if the walk leaves the tree or the
    /// row is too short for a split feature.
    pub fn leaf_value(&self, x: &[f32], rule: SplitRule) -> Option<f64> {
        let mut idx = 0;
        // a well-formed tree reaches a leaf in at most `nodes.len()` steps
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx)? {
                Node::Leaf { value } => return Some(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let v = f64::from(*x.get(*feature)?);
                    let go_left = if v.is_nan() {
                        *default_left
                    } else {
                        match rule {
                            SplitRule::Less => v < *threshold,
                            SplitRule::LessOrEqual => v <= *threshold,
                        }
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
        None
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} is not finite"));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaves(&self) -> impl Iterator<Item = f64> + '_ {
        self.nodes.iter().filter_map(|n| match n {
            Node::Leaf { value } => Some(*value),
            Node::Split { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    pub split_rule: SplitRule,
    pub aggregation: Aggregation,
    pub trees: Vec<Tree>,
    pub classes: Vec<String>,
}

impl TreeEnsemble {
    /// Positive-class probability for one feature row.
    pub fn predict_proba(&self, x: &[f32]) -> Option<f64> {
        let sum: f64 = self
            .trees
            .iter()
            .map(|t| t.leaf_value(x, self.split_rule))
            .sum::<Option<f64>>()?;
        match self.aggregation {
            Aggregation::Logistic { base_margin } => Some(sigmoid(base_margin + sum)),
            Aggregation::Mean if self.trees.is_empty() => None,
            Aggregation::Mean => Some(sum / self.trees.len() as f64),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() != 2 {
            return Err(format!(
                "binary ensemble needs 2 classes, found {}",
                self.classes.len()
            ));
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        match self.aggregation {
            Aggregation::Mean => {
                if self
                    .trees
                    .iter()
                    .flat_map(Tree::leaves)
                    .any(|v| !(0.0..=1.0).contains(&v))
                {
                    return Err("averaged leaves must be probabilities in [0, 1]".into());
                }
            }
            Aggregation::Logistic { base_margin } => {
                if !base_margin.is_finite() {
                    return Err("base margin must be finite".into());
                }
            }
        }
        Ok(())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl ModelBackend for TreeEnsemble {
    fn infer(&self, input: &Tensor) -> Result<ModelOutput, BackendError> {
        check_shape(input, &[self.n_features])?;
        self.predict_proba(&input.data)
            .map(ModelOutput::Probability)
            .ok_or_else(|| BackendError::InferenceError("malformed tree ensemble".into()))
    }

    fn input_shape(&self) -> Vec<usize> {
        vec![self.n_features]
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn backend_name(&self) -> &str {
        match self.aggregation {
            Aggregation::Logistic { .. } => "gradient_boosted_trees",
            Aggregation::Mean => "random_forest",
        }
    }

    fn validate(&self) -> Result<(), String> {
        TreeEnsemble::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left: true,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    fn boosted() -> TreeEnsemble {
        TreeEnsemble {
            n_features: 2,
            split_rule: SplitRule::Less,
            aggregation: Aggregation::Logistic { base_margin: 0.0 },
            trees: vec![stump(0, 0.5, -1.0, 1.0), stump(1, 10.0, -1.0, 1.0)],
            classes: vec!["absence".into(), "presence".into()],
        }
    }

    #[test]
    fn split_rules_differ_at_threshold() {
        let t = stump(0, 0.5, 0.0, 1.0);
        assert_eq!(t.leaf_value(&[0.5], SplitRule::Less), Some(1.0));
        assert_eq!(t.leaf_value(&[0.5], SplitRule::LessOrEqual), Some(0.0));
    }

    #[test]
    fn nan_follows_default_direction() {
        let t = stump(0, 0.5, 0.25, 0.75);
        assert_eq!(t.leaf_value(&[f32::NAN], SplitRule::Less), Some(0.25));
    }

    #[test]
    fn logistic_sum_of_margins() {
        let m = boosted();
        let p = m.predict_proba(&[0.0, 0.0]).unwrap();
        assert!((p - sigmoid(-2.0)).abs() < 1e-12);
        // balanced margins land exactly on 0.5
        let p = m.predict_proba(&[0.0, 20.0]).unwrap();
        assert_eq!(p, 0.5);
    }

    #[test]
    fn forest_averages_probabilities() {
        let m = TreeEnsemble {
            n_features: 1,
            split_rule: SplitRule::LessOrEqual,
            aggregation: Aggregation::Mean,
            trees: vec![stump(0, 1.0, 0.2, 0.8), stump(0, 2.0, 0.0, 1.0)],
            classes: vec!["no stroke".into(), "stroke".into()],
        };
        assert!(m.validate().is_ok());
        match m.infer(&Tensor::vector("x", vec![1.5])).unwrap() {
            ModelOutput::Probability(p) => assert!((p - 0.4).abs() < 1e-12),
            other => panic!("unexpected output {other:?}"),
        }
        assert_eq!(m.backend_name(), "random_forest");
    }

    #[test]
    fn unvalidated_tree_fails_inference_instead_of_panicking() {
        let mut m = boosted();
        m.trees[0].nodes[0] = Node::Split {
            feature: 7,
            threshold: 0.5,
            left: 1,
            right: 9,
            default_left: true,
        };
        assert!(matches!(
            m.infer(&Tensor::vector("x", vec![0.0, 0.0])),
            Err(BackendError::InferenceError(_))
        ));

        // a self-loop never reaches a leaf
        m.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 0,
            default_left: true,
        };
        assert_eq!(m.trees[0].leaf_value(&[0.0, 0.0], SplitRule::Less), None);
    }

    #[test]
    fn validate_rejects_backward_child() {
        let mut m = boosted();
        m.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
            default_left: false,
        };
        assert!(m.validate().unwrap_err().contains("invalid child 0"));
    }

    #[test]
    fn validate_rejects_out_of_range_feature() {
        let mut m = boosted();
        m.trees[1] = stump(5, 0.0, 0.0, 0.0);
        assert!(m.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_probability_forest_leaf() {
        let m = TreeEnsemble {
            n_features: 1,
            split_rule: SplitRule::LessOrEqual,
            aggregation: Aggregation::Mean,
            trees: vec![stump(0, 1.0, -0.2, 0.8)],
            classes: vec!["a".into(), "b".into()],
        };
        assert!(m.validate().is_err());
    }

    #[test]
    fn node_json_shape() {
        let json = r#"{"kind":"split","feature":0,"threshold":1.5,"left":1,"right":2}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(
            node,
            Node::Split {
                feature: 0,
                threshold: 1.5,
                left: 1,
                right: 2,
                default_left: false
            }
        );
    }
}
