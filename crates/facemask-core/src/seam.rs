//! Content-aware resizing by seam carving.

use crate::resize::{ContentAwareResizer, ResizeError};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use imageproc::seam_carving::shrink_width;

/// Shrinks by repeatedly removing the lowest-energy seam, so flat
/// background goes first and faces and edges are kept.
///
/// Seam removal cannot add pixels. An axis that grows is scaled with
/// `growth_filter` after carving instead.
#[derive(Debug, Clone, Copy)]
pub struct SeamCarver {
    pub growth_filter: FilterType,
}

impl Default for SeamCarver {
    fn default() -> Self {
        Self {
            growth_filter: FilterType::CatmullRom,
        }
    }
}

impl SeamCarver {
    fn carve_width(image: RgbaImage, width: u32) -> RgbaImage {
        if width >= image.width() {
            return image;
        }
        shrink_width(&image, width)
    }

    /// Vertical seams of the transposed frame are horizontal seams of the original.
    fn carve_height(image: RgbaImage, height: u32) -> RgbaImage {
        if height >= image.height() {
            return image;
        }
        let rotated = imageops::rotate90(&image);
        imageops::rotate270(&shrink_width(&rotated, height))
    }
}

impl ContentAwareResizer for SeamCarver {
    fn resize(&self, image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, ResizeError> {
        if width == 0 || height == 0 {
            return Err(ResizeError::ZeroTarget { width, height });
        }
        let (from_width, from_height) = image.dimensions();

        let carved = Self::carve_width(image.clone(), width);
        let carved = Self::carve_height(carved, height);

        let out = if carved.dimensions() == (width, height) {
            carved
        } else {
            imageops::resize(&carved, width, height, self.growth_filter)
        };

        tracing::debug!(
            from_width,
            from_height,
            width,
            height,
            seams = from_width.saturating_sub(width) + from_height.saturating_sub(height),
            "seam carving done"
        );
        Ok(out)
    }
}
