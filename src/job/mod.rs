//! Engine jobs: the normalized model, translation from tasks, and the
//! JSON document handed to the engine.

pub mod model;
pub mod payload;
pub mod translate;

pub use model::{EncodeJob, EncodingProfile, VideoRange};
pub use payload::{EncodeOptions, PreviewEncode};
pub use translate::{sample_rate_raw, translate, translate_queue_task};
