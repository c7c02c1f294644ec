use thiserror::Error;

use medi_ai::DecisionError;
use medi_features::{AssemblyError, ImageError};
use medi_model::{ArtifactError, BackendError, PreprocessError};

use crate::config::ConfigError;
use crate::tool::Tool;

/// Failure of a single prediction.
#[derive(Debug, Error)]
pub enum DiagnoseError {
    #[error(transparent)]
    Input(#[from] AssemblyError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("model inference failed: {0}")]
    Backend(#[from] BackendError),
    #[error("decision failed: {0}")]
    Decision(#[from] DecisionError),
    #[error("'{0}' takes an image, not form input")]
    ImageTool(Tool),
    #[error("no pipeline loaded for '{0}'")]
    NotLoaded(Tool),
}

impl DiagnoseError {
    /// True when the caller can fix the request and retry; false when the
    /// loaded artifacts are inconsistent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DiagnoseError::Input(_) | DiagnoseError::Image(_) | DiagnoseError::ImageTool(_)
        )
    }
}

/// Failure while building the service. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("{tool}: {reason}")]
    Mismatch { tool: Tool, reason: String },
}

impl LoadError {
    pub(crate) fn mismatch(tool: Tool, reason: impl Into<String>) -> Self {
        LoadError::Mismatch {
            tool,
            reason: reason.into(),
        }
    }
}
