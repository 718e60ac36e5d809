//! Elliptical face mask.
//!
//! The ellipse is slightly narrower than the detection window and taller
//! than it is wide, matching the shape of a face.

use crate::types::Detection;
use image::GrayImage;

/// Share of the detection scale covered by the mask.
const FILL: f64 = 0.8;
/// Divisors turning the covered scale into horizontal and vertical radii.
const WIDTH_DIVISOR: f64 = 2.0;
const HEIGHT_DIVISOR: f64 = 1.6;

const OPAQUE: u8 = 255;
const TRANSPARENT: u8 = 0;

/// Binary alpha ellipse around one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ellipse {
    pub cx: i32,
    pub cy: i32,
    pub rx: i32,
    pub ry: i32,
}

impl Ellipse {
    pub fn for_detection(detection: &Detection) -> Self {
        let scale = detection.scale as f64;
        Self {
            cx: detection.center_x,
            cy: detection.center_y,
            rx: (scale * FILL / WIDTH_DIVISOR) as i32,
            ry: (scale * FILL / HEIGHT_DIVISOR) as i32,
        }
    }

    /// A zero radius covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.rx <= 0 || self.ry <= 0
    }

    /// Half-open rectangle `(min_x, min_y, max_x, max_y)` outside of which
    /// the mask is zero.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.cx - self.rx, self.cy - self.ry, self.cx + self.rx, self.cy + self.ry)
    }

    /// Alpha of the ellipse equation at `(x, y)`: opaque on or inside the
    /// boundary, transparent outside. Ignores [`bounds`](Self::bounds).
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        if self.is_empty() {
            return TRANSPARENT;
        }
        let dx = (x - self.cx) as i64;
        let dy = (y - self.cy) as i64;
        let rx = self.rx as i64;
        let ry = self.ry as i64;

        let eqn = (dx * dx) as f64 / (rx * rx) as f64 + (dy * dy) as f64 / (ry * ry) as f64;
        if eqn <= 1.0 {
            OPAQUE
        } else {
            TRANSPARENT
        }
    }

    /// Composite the ellipse "over" an alpha buffer, clipped to its bounds.
    pub fn draw_over(&self, mask: &mut GrayImage) {
        if self.is_empty() {
            return;
        }
        let (min_x, min_y, max_x, max_y) = self.bounds();
        let x0 = min_x.max(0);
        let y0 = min_y.max(0);
        let x1 = max_x.min(mask.width() as i32);
        let y1 = max_y.min(mask.height() as i32);

        for y in y0..y1 {
            for x in x0..x1 {
                let src = self.alpha_at(x, y);
                if src == TRANSPARENT {
                    continue;
                }
                let dst = mask.get_pixel_mut(x as u32, y as u32);
                dst.0[0] = alpha_over(src, dst.0[0]);
            }
        }
    }
}

/// Porter-Duff "over" on alpha alone.
pub(crate) fn alpha_over(src: u8, dst: u8) -> u8 {
    let (s, d) = (src as u32, dst as u32);
    (s + (d * (255 - s) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(cx: i32, cy: i32, scale: i32) -> Detection {
        Detection {
            center_x: cx,
            center_y: cy,
            scale,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_radii_from_scale() {
        let e = Ellipse::for_detection(&face(100, 100, 60));
        assert_eq!((e.rx, e.ry), (24, 30));
        assert_eq!(e.bounds(), (76, 70, 124, 130));
    }

    #[test]
    fn test_center_is_inside() {
        let e = Ellipse::for_detection(&face(100, 100, 60));
        assert_eq!(e.alpha_at(100, 100), 255);
    }

    #[test]
    fn test_just_past_vertical_radius_is_outside() {
        let e = Ellipse::for_detection(&face(100, 100, 60));
        assert_eq!(e.alpha_at(100, 131), 0);
        assert_eq!(e.alpha_at(100, 129), 255);
    }

    #[test]
    fn test_corner_of_bounds_is_outside() {
        let e = Ellipse::for_detection(&face(100, 100, 60));
        assert_eq!(e.alpha_at(77, 71), 0);
    }

    #[test]
    fn test_draw_over_respects_half_open_bounds() {
        let e = Ellipse::for_detection(&face(100, 100, 60));
        let mut mask = GrayImage::new(200, 200);
        e.draw_over(&mut mask);

        assert_eq!(mask.get_pixel(100, 100).0[0], 255);
        assert_eq!(mask.get_pixel(123, 100).0[0], 255);
        // On the ellipse but at the exclusive edge of the bounds.
        assert_eq!(mask.get_pixel(124, 100).0[0], 0);
        assert_eq!(mask.get_pixel(100, 130).0[0], 0);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_draw_over_clips_at_frame_edge() {
        let e = Ellipse::for_detection(&face(2, 3, 60));
        let mut mask = GrayImage::new(20, 20);
        e.draw_over(&mut mask);
        assert_eq!(mask.get_pixel(0, 0).0[0], 255);
        assert_eq!(mask.get_pixel(19, 19).0[0], 255);
    }

    #[test]
    fn test_draw_over_keeps_existing_coverage() {
        let mut mask = GrayImage::new(200, 200);
        Ellipse::for_detection(&face(50, 50, 40)).draw_over(&mut mask);
        Ellipse::for_detection(&face(150, 150, 40)).draw_over(&mut mask);
        assert_eq!(mask.get_pixel(50, 50).0[0], 255);
        assert_eq!(mask.get_pixel(150, 150).0[0], 255);
        assert_eq!(mask.get_pixel(100, 100).0[0], 0);
    }

    #[test]
    fn test_zero_scale_draws_nothing() {
        let e = Ellipse::for_detection(&face(5, 5, 1));
        assert!(e.is_empty());
        assert_eq!(e.alpha_at(5, 5), 0);
        let mut mask = GrayImage::new(10, 10);
        e.draw_over(&mut mask);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_alpha_over() {
        assert_eq!(alpha_over(255, 0), 255);
        assert_eq!(alpha_over(0, 200), 200);
        assert_eq!(alpha_over(255, 255), 255);
        assert_eq!(alpha_over(0, 0), 0);
    }
}
