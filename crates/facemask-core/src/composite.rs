//! Masked "over" composite of the face template onto the base frame.

use image::{GrayImage, RgbaImage};

/// Blend `template` over `base` wherever `mask` is non-zero.
///
/// The effective source alpha is `template alpha × mask alpha`. Pixels with a
/// zero mask, or a fully transparent template, are left untouched, so the
/// base survives bit-for-bit outside every face ellipse.
pub fn composite_masked(base: &mut RgbaImage, template: &RgbaImage, mask: &GrayImage) {
    debug_assert_eq!(base.dimensions(), template.dimensions());
    debug_assert_eq!(base.dimensions(), mask.dimensions());

    let mut blended = 0usize;
    for (x, y, dst) in base.enumerate_pixels_mut() {
        let m = mask.get_pixel(x, y).0[0];
        if m == 0 {
            continue;
        }
        let src = template.get_pixel(x, y).0;
        let sa = src[3] as f32 / 255.0 * (m as f32 / 255.0);
        if sa <= 0.0 {
            continue;
        }

        let da = dst.0[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for c in 0..3 {
            let v = (src[c] as f32 * sa + dst.0[c] as f32 * da * (1.0 - sa)) / out_a;
            dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        blended += 1;
    }

    tracing::debug!(blended, "composited face template");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    const BASE: Rgba<u8> = Rgba([10, 20, 30, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_zero_mask_keeps_base() {
        let mut base = RgbaImage::from_pixel(4, 4, BASE);
        let template = RgbaImage::from_pixel(4, 4, RED);
        let mask = GrayImage::new(4, 4);
        composite_masked(&mut base, &template, &mask);
        assert!(base.pixels().all(|p| *p == BASE));
    }

    #[test]
    fn test_full_mask_opaque_template_replaces() {
        let mut base = RgbaImage::from_pixel(4, 4, BASE);
        let template = RgbaImage::from_pixel(4, 4, RED);
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        composite_masked(&mut base, &template, &mask);
        assert!(base.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_transparent_template_keeps_base() {
        let mut base = RgbaImage::from_pixel(4, 4, BASE);
        let template = RgbaImage::new(4, 4);
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        composite_masked(&mut base, &template, &mask);
        assert!(base.pixels().all(|p| *p == BASE));
    }

    #[test]
    fn test_partial_mask_blends() {
        let mut base = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let template = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let mask = GrayImage::from_pixel(1, 1, Luma([128]));
        composite_masked(&mut base, &template, &mask);
        let p = base.get_pixel(0, 0).0;
        assert_eq!(p[0], 128);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_only_masked_pixels_change() {
        let mut base = RgbaImage::from_pixel(3, 1, BASE);
        let template = RgbaImage::from_pixel(3, 1, RED);
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(1, 0, Luma([255]));
        composite_masked(&mut base, &template, &mask);
        assert_eq!(*base.get_pixel(0, 0), BASE);
        assert_eq!(*base.get_pixel(1, 0), RED);
        assert_eq!(*base.get_pixel(2, 0), BASE);
    }
}
