use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use medi_ai::{
    breast_cancer_policy, heart_disease_policy, pneumonia_policy, stroke_policy, DecisionPolicy,
};
use medi_features::{breast_cancer_schema, heart_disease_schema, stroke_schema, Schema};

/// The diagnosis tools served by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    BreastCancer,
    HeartDisease,
    Stroke,
    Pneumonia,
}

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::BreastCancer,
        Tool::HeartDisease,
        Tool::Stroke,
        Tool::Pneumonia,
    ];

    pub const TABULAR: [Tool; 3] = [Tool::BreastCancer, Tool::HeartDisease, Tool::Stroke];

    pub fn name(self) -> &'static str {
        match self {
            Tool::BreastCancer => "breast-cancer",
            Tool::HeartDisease => "heart-disease",
            Tool::Stroke => "stroke",
            Tool::Pneumonia => "pneumonia",
        }
    }

    pub fn is_image(self) -> bool {
        self == Tool::Pneumonia
    }

    /// Form schema for tabular tools.
    pub fn schema(self) -> Option<Schema> {
        match self {
            Tool::BreastCancer => Some(breast_cancer_schema()),
            Tool::HeartDisease => Some(heart_disease_schema()),
            Tool::Stroke => Some(stroke_schema()),
            Tool::Pneumonia => None,
        }
    }

    pub fn policy(self) -> DecisionPolicy {
        match self {
            Tool::BreastCancer => breast_cancer_policy(),
            Tool::HeartDisease => heart_disease_policy(),
            Tool::Stroke => stroke_policy(),
            Tool::Pneumonia => pneumonia_policy(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == key)
            .ok_or_else(|| {
                let names: Vec<&str> = Tool::ALL.iter().map(|t| t.name()).collect();
                format!("unknown tool '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_separators() {
        assert_eq!("heart-disease".parse::<Tool>(), Ok(Tool::HeartDisease));
        assert_eq!("Breast_Cancer".parse::<Tool>(), Ok(Tool::BreastCancer));
        assert!("diabetes".parse::<Tool>().unwrap_err().contains("stroke"));
    }

    #[test]
    fn only_pneumonia_is_image_based() {
        for tool in Tool::ALL {
            assert_eq!(tool.schema().is_none(), tool.is_image());
        }
    }

    #[test]
    fn display_roundtrips() {
        for tool in Tool::ALL {
            assert_eq!(tool.to_string().parse::<Tool>(), Ok(tool));
        }
    }
}
