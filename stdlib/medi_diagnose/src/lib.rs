//! Predict-time diagnosis pipelines.
//!
//! Each tool runs the same linear path: raw input is assembled against a
//! typed schema (or decoded as an image), transformed by a frozen
//! preprocessor, scored by a frozen model, and mapped to exactly one
//! outcome with advisory text. All artifacts are loaded once into a
//! [`DiagnosisService`], which is immutable and shareable across threads.
//!
//! ```no_run
//! use medi_diagnose::{DiagnoseConfig, DiagnosisService, Tool};
//! use medi_features::RawInput;
//!
//! let config = DiagnoseConfig::resolve(None)?;
//! let service = DiagnosisService::load(&config)?;
//! let input = RawInput::from_json(r#"{"Age": 40, "Sex": "Male"}"#)?;
//! match service.predict(Tool::HeartDisease, &input) {
//!     Ok(d) => println!("{}: {}", d.label, d.advisory),
//!     Err(e) if e.is_recoverable() => eprintln!("please check your input: {e}"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod tool;

pub use config::{ArtifactFiles, ConfigError, DiagnoseConfig, ARTIFACT_DIR_ENV, MANIFEST_FILE};
pub use demo::write_demo_artifacts;
pub use error::{DiagnoseError, LoadError};
pub use pipeline::{Diagnosis, ImagePipeline, TabularPipeline};
pub use service::DiagnosisService;
pub use tool::Tool;
