//! Frame-by-frame visualization of a Spatial Pooler learning the patches of a still image.
//!
//! The image is tiled into square patches, each patch is encoded as a bit vector, and the
//! learner is trained on every patch once per epoch. Each step is drawn (current patch,
//! sliding window, column activity) and each epoch adds the learner's permanences and one
//! feature map per column.

pub mod config;
pub mod core;
pub mod error;
pub mod viewer;

pub use error::{Result, ViewerError};
