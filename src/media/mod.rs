//! Scanned titles and the calculations made against them.

pub mod estimate;
pub mod geometry;
pub mod scan;
pub mod title;
pub mod tracks;

pub use geometry::{Geometry, GeometrySettings};
pub use scan::ScanResult;
pub use title::{Title, TitleSet};
