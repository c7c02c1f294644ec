//! Frozen model artifacts and their inference backends.
//!
//! Every model is loaded once from a JSON artifact, validated, and then used
//! read-only behind the [`ModelBackend`] trait. Inference is pure: the same
//! input always yields the same output.

pub mod artifact;
pub mod backend;
pub mod backends;
pub mod metadata;
pub mod preprocess;

pub use artifact::{ArtifactError, ModelArtifact, ModelSpec, PreprocessorArtifact};
pub use backend::{check_shape, BackendError, ModelBackend, ModelOutput, Tensor};
pub use backends::{
    Activation, Aggregation, ConvNet, Kernel, Layer, Node, SplitRule, SvmClassifier, Tree,
    TreeEnsemble,
};
pub use metadata::{ArtifactMetadata, ModelVersion};
pub use preprocess::{
    EncodingPipeline, EncodingStep, PixelRescale, PreprocessError, Preprocessor, StandardScaler,
};
