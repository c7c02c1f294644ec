//! Feature assembly for the Medi diagnosis tools.
//!
//! Converts primitive user input (numbers, strings, booleans) into the exact
//! ordered feature vector a frozen preprocessor expects, or decodes an
//! uploaded image into a fixed-size pixel tensor.

pub mod catalog;
pub mod error;
pub mod imaging;
pub mod raw;
pub mod schema;
pub mod vector;

pub use catalog::{breast_cancer_schema, heart_disease_schema, stroke_schema};
pub use error::AssemblyError;
pub use imaging::{ImageAssembler, ImageError, ImageTensor};
pub use raw::{RawInput, RawValue};
pub use schema::{Choice, FieldKind, FieldSpec, Schema};
pub use vector::{FeatureValue, FeatureVector};
