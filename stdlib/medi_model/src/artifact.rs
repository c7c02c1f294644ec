//! Loading and validation of frozen artifact files.
//!
//! Artifacts are JSON documents with a metadata header and a `kind`-tagged
//! body. They are read once at startup; a file that is missing, malformed
//! or internally inconsistent is fatal.

use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::backend::ModelBackend;
use crate::backends::{ConvNet, SvmClassifier, TreeEnsemble};
use crate::metadata::ArtifactMetadata;
use crate::preprocess::Preprocessor;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("cannot read artifact '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse artifact '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid artifact '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// Body of a model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Svm(SvmClassifier),
    TreeEnsemble(TreeEnsemble),
    ConvNet(ConvNet),
}

impl ModelSpec {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelSpec::Svm(m) => m.validate(),
            ModelSpec::TreeEnsemble(m) => m.validate(),
            ModelSpec::ConvNet(m) => m.validate(),
        }
    }

    /// Validate, then wrap as a shareable backend.
    pub fn into_backend(self) -> Result<Arc<dyn ModelBackend>, String> {
        self.validate()?;
        Ok(match self {
            ModelSpec::Svm(m) => Arc::new(m),
            ModelSpec::TreeEnsemble(m) => Arc::new(m),
            ModelSpec::ConvNet(m) => Arc::new(m),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub model: ModelSpec,
}

impl ModelArtifact {
    pub fn new(metadata: ArtifactMetadata, model: ModelSpec) -> Self {
        Self { metadata, model }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.model.validate().map_err(|reason| ArtifactError::Invalid {
            name: self.metadata.name.clone(),
            reason,
        })
    }

    pub fn from_json(path: &Path, text: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(text).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Read, parse and validate a model artifact file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let text = read(path)?;
        let artifact = Self::from_json(path, &text)?;
        info!(
            "loaded model '{}' v{} from {}",
            artifact.metadata.name,
            artifact.metadata.version,
            path.display()
        );
        Ok(artifact)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        write(path.as_ref(), self)
    }

    pub fn into_backend(self) -> Result<Arc<dyn ModelBackend>, ArtifactError> {
        let name = self.metadata.name;
        self.model
            .into_backend()
            .map_err(|reason| ArtifactError::Invalid { name, reason })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessorArtifact {
    pub metadata: ArtifactMetadata,
    pub preprocessor: Preprocessor,
}

impl PreprocessorArtifact {
    pub fn new(metadata: ArtifactMetadata, preprocessor: Preprocessor) -> Self {
        Self {
            metadata,
            preprocessor,
        }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.preprocessor
            .validate()
            .map_err(|e| ArtifactError::Invalid {
                name: self.metadata.name.clone(),
                reason: e.to_string(),
            })
    }

    /// Read, parse and validate a preprocessor artifact file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let text = read(path)?;
        let artifact: Self = serde_json::from_str(&text).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        artifact.validate()?;
        info!(
            "loaded preprocessor '{}' v{} from {}",
            artifact.metadata.name,
            artifact.metadata.version,
            path.display()
        );
        Ok(artifact)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        write(path.as_ref(), self)
    }
}

fn read(path: &Path) -> Result<String, ArtifactError> {
    std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Kernel;
    use crate::metadata::ModelVersion;

    fn svm_artifact() -> ModelArtifact {
        ModelArtifact::new(
            ArtifactMetadata::new("svm", ModelVersion::new(1, 0, 0)),
            ModelSpec::Svm(SvmClassifier {
                kernel: Kernel::Linear,
                support_vectors: vec![vec![1.0]],
                dual_coef: vec![1.0],
                intercept: 0.0,
                classes: vec!["malignant".into(), "benign".into()],
            }),
        )
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svm.json");
        svm_artifact().save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, svm_artifact());
        assert_eq!(loaded.into_backend().unwrap().backend_name(), "svm");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelArtifact::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"metadata\": {\"name\": \"x\"}, \"model\": 3}").unwrap();
        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn inconsistent_model_is_invalid() {
        let mut artifact = svm_artifact();
        if let ModelSpec::Svm(svm) = &mut artifact.model {
            svm.dual_coef.push(2.0);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svm.json");
        artifact.save(&path).unwrap();
        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { ref name, .. } if name == "svm"));
    }

    #[test]
    fn hand_built_model_is_validated_before_use() {
        let mut artifact = svm_artifact();
        if let ModelSpec::Svm(svm) = &mut artifact.model {
            svm.support_vectors.push(vec![1.0, 2.0]);
        }
        let err = artifact.into_backend().err().unwrap();
        assert!(matches!(err, ArtifactError::Invalid { ref name, .. } if name == "svm"));
    }

    #[test]
    fn model_json_is_kind_tagged() {
        let json = serde_json::to_value(svm_artifact()).unwrap();
        assert_eq!(json["model"]["kind"], "svm");
        assert_eq!(json["model"]["kernel"]["type"], "linear");
    }
}
