// ============================================================================
// ALPHA — straight ↔ premultiplied conversion and source-over compositing
// ============================================================================
//
// Canonical buffers hold straight alpha.  Conversions always return a copy.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Premultiply one pixel: transparent zeroes RGB, opaque passes through.
#[inline]
pub fn premultiply_pixel(p: [u8; 4]) -> [u8; 4] {
    match p[3] {
        0 => [0, 0, 0, 0],
        255 => p,
        a => {
            let a16 = a as u16;
            let mul = |c: u8| ((c as u16 * a16 + 127) / 255) as u8;
            [mul(p[0]), mul(p[1]), mul(p[2]), a]
        }
    }
}

/// Inverse of `premultiply_pixel`.  Alpha 0 is left untouched (the colour
/// is gone and cannot be recovered).
#[inline]
pub fn unpremultiply_pixel(p: [u8; 4]) -> [u8; 4] {
    match p[3] {
        0 | 255 => p,
        a => {
            let a32 = a as u32;
            let div = |c: u8| ((c as u32 * 255 + a32 / 2) / a32).min(255) as u8;
            [div(p[0]), div(p[1]), div(p[2]), a]
        }
    }
}

fn map_pixels(src: &RgbaImage, f: fn([u8; 4]) -> [u8; 4]) -> RgbaImage {
    let mut out = src.clone();
    out.par_chunks_mut(4).for_each(|px| {
        let mapped = f([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&mapped);
    });
    out
}

/// Premultiplied copy of a straight-alpha buffer, for premultiplying blitters.
pub fn premultiplied(src: &RgbaImage) -> RgbaImage {
    map_pixels(src, premultiply_pixel)
}

/// Straight-alpha copy of a premultiplied buffer.
pub fn unpremultiplied(src: &RgbaImage) -> RgbaImage {
    map_pixels(src, unpremultiply_pixel)
}

/// Straight-alpha "source over".
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    if top[3] == 0 {
        return base;
    }
    if top[3] == 255 || base[3] == 0 {
        return top;
    }
    let ta = top[3] as f32 / 255.0;
    let ba = base[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    let mix = |t: u8, b: u8| {
        let c = (t as f32 * ta + b as f32 * ba * (1.0 - ta)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        mix(top[0], base[0]),
        mix(top[1], base[1]),
        mix(top[2], base[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn premultiply_rules() {
        assert_eq!(premultiply_pixel([200, 100, 50, 0]), [0, 0, 0, 0]);
        assert_eq!(premultiply_pixel([200, 100, 50, 255]), [200, 100, 50, 255]);
        assert_eq!(premultiply_pixel([255, 128, 0, 128]), [128, 64, 0, 128]);
    }

    #[test]
    fn premultiply_works_on_a_copy() {
        let src = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 64]));
        let pm = premultiplied(&src);
        assert_eq!(src.get_pixel(0, 0), &Rgba([255, 255, 255, 64]));
        assert_eq!(pm.get_pixel(0, 0), &Rgba([64, 64, 64, 64]));
    }

    #[test]
    fn round_trip_within_one() {
        // Quantisation error is about 255 / (2a); within ±1 once alpha ≥ 128.
        for a in [128u8, 200, 255] {
            for c in (0..=255u16).step_by(7) {
                let p = [c as u8, (255 - c) as u8, (c / 2) as u8, a];
                let back = unpremultiply_pixel(premultiply_pixel(p));
                for i in 0..3 {
                    let d = (back[i] as i16 - p[i] as i16).abs();
                    assert!(d <= 1, "alpha {a} channel {i}: {p:?} -> {back:?}");
                }
                assert_eq!(back[3], a);
            }
        }
    }

    #[test]
    fn round_trip_loses_colour_only_at_zero_alpha() {
        let img = RgbaImage::from_fn(3, 1, |x, _| Rgba([90, 90, 90, [0u8, 160, 255][x as usize]]));
        let back = unpremultiplied(&premultiplied(&img));
        assert_eq!(back.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(back.get_pixel(2, 0), &Rgba([90, 90, 90, 255]));
    }

    #[test]
    fn source_over() {
        let base = Rgba([0, 0, 255, 255]);
        assert_eq!(blend_over(base, Rgba([9, 9, 9, 0])), base);
        assert_eq!(blend_over(base, Rgba([255, 0, 0, 255])), Rgba([255, 0, 0, 255]));
        assert_eq!(blend_over(base, Rgba([255, 0, 0, 128])), Rgba([128, 0, 127, 255]));
        assert_eq!(blend_over(Rgba([0, 0, 0, 0]), Rgba([10, 20, 30, 40])), Rgba([10, 20, 30, 40]));
    }
}
