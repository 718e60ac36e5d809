//! Built-in low-poly renderer.
//!
//! Smooths the crop, lays a grid of right-angle cell pairs over it whose
//! density follows `point_rate`/`max_points`, subdivides high-contrast cells
//! according to `edge_factor`, and fills every triangle with its mean color.

use crate::triangulate::{TriangulationError, Triangulator};
use crate::types::StyleConfig;
use image::{Pixel, Rgba, RgbaImage};

/// Smallest cell edge, in pixels.
const MIN_CELL: u32 = 2;
/// How many times a high-contrast cell may be split into quadrants.
const MAX_SPLIT_DEPTH: u8 = 2;

/// Deterministic grid triangulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPolyRenderer;

#[derive(Debug, Clone, Copy)]
struct Cell {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Triangulator for LowPolyRenderer {
    fn render(
        &self,
        face: &RgbaImage,
        style: &StyleConfig,
    ) -> Result<RgbaImage, TriangulationError> {
        let (width, height) = face.dimensions();
        if width == 0 || height == 0 {
            return Err(TriangulationError::EmptyRegion { width, height });
        }

        let sigma = blur_sigma(width, height, style);
        let smoothed = if sigma > 0.0 {
            image::imageops::blur(face, sigma)
        } else {
            face.clone()
        };

        let cell = cell_size(width, height, style);
        let edge_threshold =
            (style.edge_factor > 0).then(|| (255 / style.edge_factor.min(255)) as u8);

        let mut out = RgbaImage::new(width, height);
        for y in (0..height).step_by(cell as usize) {
            for x in (0..width).step_by(cell as usize) {
                let c = Cell {
                    x,
                    y,
                    w: cell.min(width - x),
                    h: cell.min(height - y),
                };
                fill_cell(&smoothed, &mut out, c, edge_threshold, 0);
            }
        }

        tracing::trace!(width, height, cell, "rendered low-poly face");
        Ok(out)
    }
}

/// Gaussian sigma for the pre-smoothing pass, capped at the crop's longer side.
fn blur_sigma(width: u32, height: u32, style: &StyleConfig) -> f32 {
    let sigma = style.blur_radius as f32 * style.blur_factor.max(1) as f32;
    sigma.min(width.max(height) as f32)
}

/// Grid cell edge so that the number of vertices roughly matches
/// `min(area * point_rate, max_points)`.
fn cell_size(width: u32, height: u32, style: &StyleConfig) -> u32 {
    let area = width as f64 * height as f64;
    let points = (area * style.point_rate as f64)
        .min(style.max_points as f64)
        .max(1.0);
    ((area / points).sqrt().round() as u32).max(MIN_CELL)
}

fn fill_cell(
    src: &RgbaImage,
    dst: &mut RgbaImage,
    cell: Cell,
    edge_threshold: Option<u8>,
    depth: u8,
) {
    let splittable = depth < MAX_SPLIT_DEPTH && cell.w >= 2 * MIN_CELL && cell.h >= 2 * MIN_CELL;
    if splittable && edge_threshold.is_some_and(|t| contrast(src, cell) > t) {
        let (hw, hh) = (cell.w / 2, cell.h / 2);
        for (dx, dy, w, h) in [
            (0, 0, hw, hh),
            (hw, 0, cell.w - hw, hh),
            (0, hh, hw, cell.h - hh),
            (hw, hh, cell.w - hw, cell.h - hh),
        ] {
            let quadrant = Cell {
                x: cell.x + dx,
                y: cell.y + dy,
                w,
                h,
            };
            fill_cell(src, dst, quadrant, edge_threshold, depth + 1);
        }
        return;
    }

    // Two triangles split along the top-left → bottom-right diagonal.
    let mut sums = [[0u64; 4]; 2];
    let mut counts = [0u64; 2];
    for_each_pixel(cell, |x, y, half| {
        for (sum, &v) in sums[half].iter_mut().zip(src.get_pixel(x, y).0.iter()) {
            *sum += v as u64;
        }
        counts[half] += 1;
    });

    let means: [Rgba<u8>; 2] = std::array::from_fn(|half| {
        let n = counts[half].max(1);
        Rgba(std::array::from_fn(|c| ((sums[half][c] + n / 2) / n) as u8))
    });

    for_each_pixel(cell, |x, y, half| dst.put_pixel(x, y, means[half]));
}

/// Visit every pixel of `cell`, tagging which triangle it belongs to.
fn for_each_pixel(cell: Cell, mut f: impl FnMut(u32, u32, usize)) {
    for y in cell.y..cell.y + cell.h {
        for x in cell.x..cell.x + cell.w {
            let upper =
                ((x - cell.x) as u64 * cell.h as u64) >= ((y - cell.y) as u64 * cell.w as u64);
            f(x, y, upper as usize);
        }
    }
}

/// Luma range within a cell.
fn contrast(src: &RgbaImage, cell: Cell) -> u8 {
    let (mut lo, mut hi) = (u8::MAX, u8::MIN);
    for y in cell.y..cell.y + cell.h {
        for x in cell.x..cell.x + cell.w {
            let l = src.get_pixel(x, y).to_luma().0[0];
            lo = lo.min(l);
            hi = hi.max(l);
        }
    }
    hi.saturating_sub(lo)
}
