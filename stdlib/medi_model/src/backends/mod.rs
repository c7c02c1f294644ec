//! Backend implementations for the supported model families

pub mod convnet;
pub mod svm;
pub mod trees;

pub use convnet::{Activation, ConvNet, Layer};
pub use svm::{Kernel, SvmClassifier};
pub use trees::{Aggregation, Node, SplitRule, Tree, TreeEnsemble};
