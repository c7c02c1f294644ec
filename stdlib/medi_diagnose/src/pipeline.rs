//! The four-stage predict path, one instance per tool.

use log::{debug, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use medi_ai::{decide, explain, Decision, DecisionPolicy, Explanation, Severity};
use medi_features::{FieldKind, ImageAssembler, ImageTensor, RawInput, Schema};
use medi_model::{ModelBackend, PixelRescale, Preprocessor, Tensor};

use crate::error::{DiagnoseError, LoadError};
use crate::tool::Tool;

/// Result of one prediction, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub tool: Tool,
    pub label: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub advisory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl Diagnosis {
    fn new(tool: Tool, decision: Decision, explanation: Option<Explanation>) -> Self {
        let outcome = decision.outcome;
        Self {
            tool,
            label: outcome.label,
            severity: outcome.severity,
            score: decision.score,
            advisory: outcome.advisory,
            reference: outcome.reference,
            explanation,
        }
    }
}

fn check_model(
    tool: Tool,
    policy: &DecisionPolicy,
    model: &dyn ModelBackend,
) -> Result<(), LoadError> {
    model
        .validate()
        .map_err(|reason| LoadError::mismatch(tool, format!("invalid model: {reason}")))?;
    policy
        .check_classes(model.classes())
        .map_err(|e| LoadError::mismatch(tool, e.to_string()))
}

/// Form input → feature vector → frozen transform → model → decision.
pub struct TabularPipeline {
    tool: Tool,
    schema: Schema,
    preprocessor: Preprocessor,
    model: Arc<dyn ModelBackend>,
    policy: DecisionPolicy,
}

impl std::fmt::Debug for TabularPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabularPipeline")
            .field("tool", &self.tool)
            .field("schema", &self.schema.name)
            .field("model", &self.model.backend_name())
            .finish()
    }
}

impl TabularPipeline {
    /// Assemble a pipeline, verifying that every stage agrees with the next.
    pub fn new(
        tool: Tool,
        schema: Schema,
        preprocessor: Preprocessor,
        model: Arc<dyn ModelBackend>,
        policy: DecisionPolicy,
    ) -> Result<Self, LoadError> {
        let schema_names: Vec<&str> = schema.names().collect();
        let fitted: Vec<&str> = preprocessor.input_names().iter().map(String::as_str).collect();
        if schema_names != fitted {
            warn!("{tool}: schema and preprocessor disagree on feature names");
            return Err(LoadError::mismatch(
                tool,
                format!("schema features {schema_names:?} do not match preprocessor features {fitted:?}"),
            ));
        }

        for field in &schema.fields {
            if let FieldKind::Category { choices } = &field.kind {
                let known = preprocessor.categories(&field.name).ok_or_else(|| {
                    LoadError::mismatch(tool, format!("no encoder for category '{}'", field.name))
                })?;
                if let Some(unseen) = choices.iter().find(|c| !known.contains(c)) {
                    return Err(LoadError::mismatch(
                        tool,
                        format!("'{}' choice '{unseen}' was not seen by the encoder", field.name),
                    ));
                }
            }
        }

        let width = preprocessor.output_width();
        if model.input_shape() != [width] {
            return Err(LoadError::mismatch(
                tool,
                format!(
                    "preprocessor emits {width} values but model expects {:?}",
                    model.input_shape()
                ),
            ));
        }
        check_model(tool, &policy, model.as_ref())?;

        Ok(Self {
            tool,
            schema,
            preprocessor,
            model,
            policy,
        })
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn model(&self) -> &dyn ModelBackend {
        self.model.as_ref()
    }

    pub fn predict(&self, input: &RawInput) -> Result<Diagnosis, DiagnoseError> {
        let features = self.schema.assemble(input)?;
        let values = self.preprocessor.transform(&features)?;
        let explanation = self.explain(&values);
        let output = self.model.infer(&Tensor::vector(self.tool.name(), values))?;
        debug!("{}: {} produced {output:?}", self.tool, self.model.backend_name());
        let decision = decide(&self.policy, output)?;
        Ok(Diagnosis::new(self.tool, decision, explanation))
    }

    fn explain(&self, values: &[f32]) -> Option<Explanation> {
        let (weights, bias) = self.model.linear_terms()?;
        let x: Vec<f64> = values.iter().map(|v| f64::from(*v)).collect();
        explain(&weights, bias, &self.preprocessor.output_names(), &x).ok()
    }
}

/// Image → pixel tensor → rescale → network → decision.
pub struct ImagePipeline {
    tool: Tool,
    assembler: ImageAssembler,
    rescale: PixelRescale,
    model: Arc<dyn ModelBackend>,
    policy: DecisionPolicy,
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("tool", &self.tool)
            .field("shape", &self.assembler.shape())
            .field("model", &self.model.backend_name())
            .finish()
    }
}

impl ImagePipeline {
    pub fn new(
        tool: Tool,
        assembler: ImageAssembler,
        rescale: PixelRescale,
        model: Arc<dyn ModelBackend>,
        policy: DecisionPolicy,
    ) -> Result<Self, LoadError> {
        if model.input_shape() != assembler.shape() {
            return Err(LoadError::mismatch(
                tool,
                format!(
                    "assembler produces {:?} but model expects {:?}",
                    assembler.shape(),
                    model.input_shape()
                ),
            ));
        }
        check_model(tool, &policy, model.as_ref())?;
        Ok(Self {
            tool,
            assembler,
            rescale,
            model,
            policy,
        })
    }

    pub fn assembler(&self) -> &ImageAssembler {
        &self.assembler
    }

    pub fn model(&self) -> &dyn ModelBackend {
        self.model.as_ref()
    }

    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Diagnosis, DiagnoseError> {
        self.score(self.assembler.assemble(bytes)?)
    }

    pub fn predict_path(&self, path: impl AsRef<Path>) -> Result<Diagnosis, DiagnoseError> {
        self.score(self.assembler.open(path)?)
    }

    /// Predict from already-decoded pixels on the 0–255 scale.
    pub fn predict_pixels(&self, shape: &[usize], data: Vec<f32>) -> Result<Diagnosis, DiagnoseError> {
        self.score(self.assembler.from_pixels(shape, data)?)
    }

    /// Predict from a caller-built tensor; shape and pixel range are
    /// checked like any other upload.
    pub fn predict_tensor(&self, image: ImageTensor) -> Result<Diagnosis, DiagnoseError> {
        let shape = image.shape();
        let image = self.assembler.from_pixels(&shape, image.data)?;
        self.score(image)
    }

    fn score(&self, image: ImageTensor) -> Result<Diagnosis, DiagnoseError> {
        let input = self.rescale.apply(image);
        let output = self.model.infer(&input)?;
        debug!("{}: {} produced {output:?}", self.tool, self.model.backend_name());
        let decision = decide(&self.policy, output)?;
        Ok(Diagnosis::new(self.tool, decision, None))
    }
}
