//! Triangulation engine seam.

use crate::types::StyleConfig;
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriangulationError {
    #[error("face region is empty ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },
    #[error("triangulation failed: {0}")]
    Failed(String),
}

/// Renders a stylized polygonal version of a face crop.
///
/// Called concurrently for different faces, always with disjoint inputs.
pub trait Triangulator: Send + Sync {
    /// Return a rendering of the same size as `face`.
    fn render(
        &self,
        face: &RgbaImage,
        style: &StyleConfig,
    ) -> Result<RgbaImage, TriangulationError>;
}
