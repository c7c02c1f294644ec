//! Where artifacts live and which file holds which model.
//!
//! Resolution order: built-in file names, then `manifest.json` inside the
//! artifact directory, with the directory itself taken from the command
//! line, else `MEDI_ARTIFACT_DIR`, else `./artifacts`.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ARTIFACT_DIR_ENV: &str = "MEDI_ARTIFACT_DIR";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("artifact directory '{}' does not exist", .0.display())]
    MissingDir(PathBuf),
    #[error("cannot access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid manifest '{}': {source}", .path.display())]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Artifact file names, relative to the artifact directory unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactFiles {
    pub breast_cancer_model: PathBuf,
    pub breast_cancer_scaler: PathBuf,
    pub heart_disease_model: PathBuf,
    /// Without one, heart-disease features go to the model untransformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_disease_preprocessor: Option<PathBuf>,
    pub stroke_model: PathBuf,
    pub stroke_preprocessor: PathBuf,
    pub pneumonia_model: PathBuf,
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            breast_cancer_model: "svm_cancer.json".into(),
            breast_cancer_scaler: "scaler.json".into(),
            heart_disease_model: "xgboost_heart_disease.json".into(),
            heart_disease_preprocessor: None,
            stroke_model: "rf_stroke.json".into(),
            stroke_preprocessor: "preprocessing_stroke.json".into(),
            pneumonia_model: "cnn_chest_xray.json".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnoseConfig {
    pub artifact_dir: PathBuf,
    pub files: ArtifactFiles,
}

impl DiagnoseConfig {
    /// Default file names under `dir`, without reading anything.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: dir.into(),
            files: ArtifactFiles::default(),
        }
    }

    /// Resolve the directory from `cli_dir` or the environment, then apply
    /// its manifest.
    pub fn resolve(cli_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::resolve_with(cli_dir, std::env::var_os(ARTIFACT_DIR_ENV))
    }

    fn resolve_with(cli_dir: Option<PathBuf>, env_dir: Option<OsString>) -> Result<Self, ConfigError> {
        let env_dir = env_dir.filter(|v| !v.is_empty()).map(PathBuf::from);
        if cli_dir.is_none() {
            if let Some(dir) = &env_dir {
                debug!("artifact directory from {ARTIFACT_DIR_ENV}: {}", dir.display());
            }
        }
        let dir = cli_dir
            .or(env_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR));
        Self::from_dir(dir)
    }

    /// Read `dir/manifest.json` over the default file names, if present.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::new(dir);
        if !config.artifact_dir.is_dir() {
            return Err(ConfigError::MissingDir(config.artifact_dir));
        }
        let manifest = config.artifact_dir.join(MANIFEST_FILE);
        if manifest.is_file() {
            let text = std::fs::read_to_string(&manifest).map_err(|source| ConfigError::Io {
                path: manifest.clone(),
                source,
            })?;
            config.files = serde_json::from_str(&text).map_err(|source| ConfigError::Manifest {
                path: manifest.clone(),
                source,
            })?;
            info!("using manifest {}", manifest.display());
        }
        Ok(config)
    }

    pub fn path(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.artifact_dir.join(file)
        }
    }

    pub fn write_manifest(&self) -> Result<PathBuf, ConfigError> {
        let path = self.artifact_dir.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(&self.files).map_err(|source| {
            ConfigError::Manifest {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, text).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
