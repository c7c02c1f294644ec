use thiserror::Error;

/// Errors raised while turning raw user input into a feature vector.
///
/// Every variant is a user input error: the caller can fix the input and
/// resubmit. No variant is ever replaced by a default value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("missing required feature '{name}'")]
    MissingFeature { name: String },
    #[error("unknown feature '{name}'")]
    UnknownFeature { name: String },
    #[error("feature '{name}' = {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("feature '{name}' = {value} must be a whole number")]
    NotAnInteger { name: String, value: f64 },
    #[error("feature '{name}' must be a finite number")]
    NotFinite { name: String },
    #[error("feature '{name}' = '{value}' is not one of: {}", .choices.join(", "))]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },
    #[error("feature '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("malformed input: {0}")]
    Malformed(String),
}

impl AssemblyError {
    /// Name of the offending feature, when the error concerns one.
    pub fn feature(&self) -> Option<&str> {
        match self {
            AssemblyError::MissingFeature { name }
            | AssemblyError::UnknownFeature { name }
            | AssemblyError::OutOfRange { name, .. }
            | AssemblyError::NotAnInteger { name, .. }
            | AssemblyError::NotFinite { name }
            | AssemblyError::InvalidChoice { name, .. }
            | AssemblyError::TypeMismatch { name, .. } => Some(name),
            AssemblyError::Malformed(_) => None,
        }
    }
}
