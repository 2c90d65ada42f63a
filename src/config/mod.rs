//! Configuration loading and validation.

pub mod loader;
pub mod model;

pub use loader::{load_and_validate, load_or_default};
pub use model::AppConfig;
