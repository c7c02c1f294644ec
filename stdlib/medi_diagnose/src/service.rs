use log::info;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use medi_features::{ImageAssembler, ImageTensor, RawInput, Schema};
use medi_model::{ModelArtifact, ModelBackend, PixelRescale, Preprocessor, PreprocessorArtifact};

use crate::config::DiagnoseConfig;
use crate::error::{DiagnoseError, LoadError};
use crate::pipeline::{Diagnosis, ImagePipeline, TabularPipeline};
use crate::tool::Tool;

/// Every loaded pipeline, shared read-only between request handlers.
///
/// Cloning is cheap; clones share the same frozen artifacts.
#[derive(Debug, Clone)]
pub struct DiagnosisService {
    tabular: BTreeMap<Tool, Arc<TabularPipeline>>,
    pneumonia: Arc<ImagePipeline>,
}

fn load_model(config: &DiagnoseConfig, file: &Path) -> Result<Arc<dyn ModelBackend>, LoadError> {
    Ok(ModelArtifact::load(config.path(file))?.into_backend()?)
}

fn load_preprocessor(config: &DiagnoseConfig, file: &Path) -> Result<Preprocessor, LoadError> {
    Ok(PreprocessorArtifact::load(config.path(file))?.preprocessor)
}

fn tabular(
    tool: Tool,
    preprocessor: Preprocessor,
    model: Arc<dyn ModelBackend>,
) -> Result<(Tool, Arc<TabularPipeline>), LoadError> {
    let schema = tool
        .schema()
        .ok_or_else(|| LoadError::mismatch(tool, "not a form-based tool"))?;
    let pipeline = TabularPipeline::new(tool, schema, preprocessor, model, tool.policy())?;
    Ok((tool, Arc::new(pipeline)))
}

impl DiagnosisService {
    /// Load and cross-check every artifact named by `config`.
    pub fn load(config: &DiagnoseConfig) -> Result<Self, LoadError> {
        let files = &config.files;

        let breast = tabular(
            Tool::BreastCancer,
            load_preprocessor(config, &files.breast_cancer_scaler)?,
            load_model(config, &files.breast_cancer_model)?,
        )?;

        let heart_pre = match &files.heart_disease_preprocessor {
            Some(file) => load_preprocessor(config, file)?,
            None => Preprocessor::Passthrough {
                feature_names: Tool::HeartDisease
                    .schema()
                    .map(|s| s.names().map(str::to_string).collect())
                    .unwrap_or_default(),
            },
        };
        let heart = tabular(
            Tool::HeartDisease,
            heart_pre,
            load_model(config, &files.heart_disease_model)?,
        )?;

        let stroke = tabular(
            Tool::Stroke,
            load_preprocessor(config, &files.stroke_preprocessor)?,
            load_model(config, &files.stroke_model)?,
        )?;

        let pneumonia = ImagePipeline::new(
            Tool::Pneumonia,
            ImageAssembler::default(),
            PixelRescale::default(),
            load_model(config, &files.pneumonia_model)?,
            Tool::Pneumonia.policy(),
        )?;

        info!(
            "diagnosis service ready with artifacts from {}",
            config.artifact_dir.display()
        );
        Ok(Self {
            tabular: BTreeMap::from([breast, heart, stroke]),
            pneumonia: Arc::new(pneumonia),
        })
    }

    /// Build from pipelines constructed elsewhere.
    pub fn from_pipelines(
        tabular: impl IntoIterator<Item = TabularPipeline>,
        pneumonia: ImagePipeline,
    ) -> Self {
        Self {
            tabular: tabular
                .into_iter()
                .map(|p| (p.tool(), Arc::new(p)))
                .collect(),
            pneumonia: Arc::new(pneumonia),
        }
    }

    pub fn tools(&self) -> impl Iterator<Item = Tool> + '_ {
        self.tabular.keys().copied().chain([Tool::Pneumonia])
    }

    pub fn pipeline(&self, tool: Tool) -> Option<&TabularPipeline> {
        self.tabular.get(&tool).map(|p| &**p)
    }

    pub fn schema(&self, tool: Tool) -> Option<&Schema> {
        self.pipeline(tool).map(TabularPipeline::schema)
    }

    pub fn image_pipeline(&self) -> &ImagePipeline {
        &self.pneumonia
    }

    /// Predict a form-based tool from raw primitive input.
    pub fn predict(&self, tool: Tool, input: &RawInput) -> Result<Diagnosis, DiagnoseError> {
        if tool.is_image() {
            return Err(DiagnoseError::ImageTool(tool));
        }
        let pipeline = self
            .tabular
            .get(&tool)
            .ok_or(DiagnoseError::NotLoaded(tool))?;
        pipeline.predict(input)
    }

    pub fn predict_image(&self, bytes: &[u8]) -> Result<Diagnosis, DiagnoseError> {
        self.pneumonia.predict_bytes(bytes)
    }

    pub fn predict_image_path(&self, path: impl AsRef<Path>) -> Result<Diagnosis, DiagnoseError> {
        self.pneumonia.predict_path(path)
    }

    pub fn predict_image_tensor(&self, image: ImageTensor) -> Result<Diagnosis, DiagnoseError> {
        self.pneumonia.predict_tensor(image)
    }
}
