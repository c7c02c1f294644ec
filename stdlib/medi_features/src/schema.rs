//! Strongly-typed, range-constrained feature schemas.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;
use crate::raw::{RawInput, RawValue};
use crate::vector::{FeatureValue, FeatureVector};

/// One selectable option of a coded field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub code: f64,
}

impl Choice {
    pub fn new(label: impl Into<String>, code: f64) -> Self {
        Self {
            label: label.into(),
            code,
        }
    }
}

/// Declared type and constraint of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Finite real in `[min, max]`.
    Numeric { min: f64, max: f64 },
    /// Whole number in `[min, max]`.
    Integer { min: f64, max: f64 },
    /// Checkbox; emits 0 or 1.
    Flag,
    /// Choice by label or by code; emits the code.
    Coded { choices: Vec<Choice> },
    /// Choice by label; emits the label for a downstream one-hot encoder.
    Category { choices: Vec<String> },
}

impl FieldKind {
    fn coerce(&self, name: &str, raw: &RawValue) -> Result<FeatureValue, AssemblyError> {
        match self {
            FieldKind::Numeric { min, max } => {
                let x = expect_number(name, raw, "a number")?;
                check_range(name, x, *min, *max)?;
                Ok(FeatureValue::Number(x))
            }
            FieldKind::Integer { min, max } => {
                let x = expect_number(name, raw, "a whole number")?;
                if x.fract() != 0.0 {
                    return Err(AssemblyError::NotAnInteger {
                        name: name.to_string(),
                        value: x,
                    });
                }
                check_range(name, x, *min, *max)?;
                Ok(FeatureValue::Number(x))
            }
            FieldKind::Flag => match raw {
                RawValue::Bool(b) => Ok(FeatureValue::Number(if *b { 1.0 } else { 0.0 })),
                RawValue::Number(x) if *x == 0.0 || *x == 1.0 => Ok(FeatureValue::Number(*x)),
                RawValue::Number(x) => Err(AssemblyError::InvalidChoice {
                    name: name.to_string(),
                    value: x.to_string(),
                    choices: vec!["0".into(), "1".into()],
                }),
                RawValue::Text(_) => Err(type_mismatch(name, "a boolean", raw)),
            },
            FieldKind::Coded { choices } => {
                let found = match raw {
                    RawValue::Text(s) => choices.iter().find(|c| c.label == *s),
                    RawValue::Number(x) => choices.iter().find(|c| c.code == *x),
                    RawValue::Bool(_) => {
                        return Err(type_mismatch(name, "a label or code", raw));
                    }
                };
                found
                    .map(|c| FeatureValue::Number(c.code))
                    .ok_or_else(|| AssemblyError::InvalidChoice {
                        name: name.to_string(),
                        value: display_raw(raw),
                        choices: choices.iter().map(|c| c.label.clone()).collect(),
                    })
            }
            FieldKind::Category { choices } => match raw {
                RawValue::Text(s) if choices.iter().any(|c| c == s) => {
                    Ok(FeatureValue::Category(s.clone()))
                }
                RawValue::Text(s) => Err(AssemblyError::InvalidChoice {
                    name: name.to_string(),
                    value: s.clone(),
                    choices: choices.clone(),
                }),
                _ => Err(type_mismatch(name, "a label", raw)),
            },
        }
    }

    /// Labels this field accepts, if it is a choice field.
    pub fn choice_labels(&self) -> Option<Vec<&str>> {
        match self {
            FieldKind::Coded { choices } => Some(choices.iter().map(|c| c.label.as_str()).collect()),
            FieldKind::Category { choices } => Some(choices.iter().map(String::as_str).collect()),
            _ => None,
        }
    }
}

fn expect_number(name: &str, raw: &RawValue, expected: &'static str) -> Result<f64, AssemblyError> {
    match raw {
        RawValue::Number(x) if x.is_finite() => Ok(*x),
        RawValue::Number(_) => Err(AssemblyError::NotFinite {
            name: name.to_string(),
        }),
        _ => Err(type_mismatch(name, expected, raw)),
    }
}

fn check_range(name: &str, x: f64, min: f64, max: f64) -> Result<(), AssemblyError> {
    if x < min || x > max {
        return Err(AssemblyError::OutOfRange {
            name: name.to_string(),
            value: x,
            min,
            max,
        });
    }
    Ok(())
}

fn type_mismatch(name: &str, expected: &'static str, raw: &RawValue) -> AssemblyError {
    AssemblyError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: raw.kind_name(),
    }
}

fn display_raw(raw: &RawValue) -> String {
    match raw {
        RawValue::Bool(b) => b.to_string(),
        RawValue::Number(x) => x.to_string(),
        RawValue::Text(s) => s.clone(),
    }
}

/// A single named input of a diagnosis form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Human-readable prompt for the form widget.
    pub label: String,
    pub kind: FieldKind,
    /// Initial widget value. Never substituted for missing input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RawValue>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            default: None,
        }
    }

    pub fn numeric(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, FieldKind::Numeric { min, max })
    }

    pub fn integer(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, FieldKind::Integer { min, max })
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Flag)
    }

    pub fn coded(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, FieldKind::Coded { choices })
    }

    pub fn category<S: Into<String>>(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Category {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<RawValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Ordered list of fields a model was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate `input` and build the feature vector in schema order.
    ///
    /// Every field must be present and valid; keys the schema does not
    /// declare are rejected.
    pub fn assemble(&self, input: &RawInput) -> Result<FeatureVector, AssemblyError> {
        let mut vector = FeatureVector::with_capacity(self.fields.len());
        for field in &self.fields {
            let raw = input
                .get(&field.name)
                .ok_or_else(|| AssemblyError::MissingFeature {
                    name: field.name.clone(),
                })?;
            vector.push(field.name.clone(), field.kind.coerce(&field.name, raw)?);
        }
        if let Some(extra) = input.keys().find(|k| self.field(k).is_none()) {
            return Err(AssemblyError::UnknownFeature {
                name: extra.to_string(),
            });
        }
        debug!("assembled {} features for '{}'", vector.len(), self.name);
        Ok(vector)
    }

    /// Raw input built from every field's default, for form pre-filling.
    pub fn defaults(&self) -> RawInput {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.clone(), d)))
            .collect()
    }

    /// Pretty JSON description of the form a front-end should render.
    pub fn describe(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
