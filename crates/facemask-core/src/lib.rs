//! facemask-core: Low-poly face mask filter.
//!
//! Detects faces, renders a triangulated version of each face region and
//! blends it back onto the photo inside an elliptical mask per face.

pub mod composite;
pub mod detector;
pub mod dispatch;
pub mod ellipse;
pub mod error;
pub mod lowpoly;
pub mod pipeline;
pub mod resize;
#[cfg(feature = "rustface")]
pub mod rustface_backend;
pub mod seam;
pub mod triangulate;
pub mod types;

pub use detector::{FaceDetector, ScanParams};
pub use error::FaceMaskError;
pub use lowpoly::LowPolyRenderer;
pub use pipeline::{FaceMask, Options};
pub use resize::{ContentAwareResizer, Dimension, ResizeAlgorithm};
#[cfg(feature = "rustface")]
pub use rustface_backend::RustfaceDetector;
pub use seam::SeamCarver;
pub use triangulate::{TriangulationError, Triangulator};
pub use types::{Detection, FaceContext, Style, StyleConfig, StylePolicy, UniformStyle};
