//! Encode task descriptors and their YAML loader.

pub mod loader;
pub mod model;

pub use model::{EncodeTask, QueueTask};
