// ============================================================================
// RESAMPLING — scale and rotation filters for floating pixel buffers
// ============================================================================
//
// Every algorithm here is a pure function from an `RgbaImage` (straight alpha)
// to a new `RgbaImage`.  The filter enums dispatch through small lookup tables
// so callers never branch on filter kind themselves.

use image::{RgbaImage, Rgba, imageops};
use rayon::prelude::*;

use crate::geometry::{normalize_degrees, rotate_vec};
use egui::Vec2;

/// Upper bound on 2× passes for the pixel-art upscalers (16×).
pub const MAX_PIXEL_ART_PASSES: u32 = 4;

/// RotSprite works on an 8× intermediate; large sources fall back to a
/// smaller factor so the intermediate stays under this many pixels.
const ROTSPRITE_MAX_INTERMEDIATE: u64 = 16 * 1024 * 1024;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Filter used when changing the buffer's size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ScaleFilter {
    /// Block replication.
    #[default]
    Nearest,
    Bilinear,
    /// Eric's Pixel Expansion, repeated 2× passes.
    Epx,
    /// AdvMAME2x / Scale2x, repeated 2× passes.
    Scale2x,
}

/// Filter used when rotating by an arbitrary angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RotationFilter {
    #[default]
    Nearest,
    /// Upscale, rotate, sample back down: smooth pixel-art outlines.
    RotSprite,
}

/// `(source, dst_w, dst_h) -> resized`
pub type ScaleFn = fn(&RgbaImage, u32, u32) -> RgbaImage;
/// `(source, degrees) -> rotated, on a canvas grown to fit`
pub type RotateFn = fn(&RgbaImage, f32) -> RgbaImage;

const SCALE_TABLE: [(ScaleFilter, ScaleFn); 4] = [
    (ScaleFilter::Nearest, scale_nearest),
    (ScaleFilter::Bilinear, scale_bilinear),
    (ScaleFilter::Epx, scale_epx),
    (ScaleFilter::Scale2x, scale_scale2x),
];

const ROTATE_TABLE: [(RotationFilter, RotateFn); 2] = [
    (RotationFilter::Nearest, rotate_nearest),
    (RotationFilter::RotSprite, rotate_rotsprite),
];

impl ScaleFilter {
    pub fn all() -> &'static [ScaleFilter] {
        &[ScaleFilter::Nearest, ScaleFilter::Bilinear, ScaleFilter::Epx, ScaleFilter::Scale2x]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScaleFilter::Nearest => "Nearest Neighbor",
            ScaleFilter::Bilinear => "Bilinear",
            ScaleFilter::Epx => "EPX",
            ScaleFilter::Scale2x => "Scale2x",
        }
    }

    /// Stable identifier used in settings files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            ScaleFilter::Nearest => "nearest",
            ScaleFilter::Bilinear => "bilinear",
            ScaleFilter::Epx => "epx",
            ScaleFilter::Scale2x => "scale2x",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.key().eq_ignore_ascii_case(s.trim()))
    }

    pub fn resample_fn(&self) -> ScaleFn {
        SCALE_TABLE
            .iter()
            .find(|(f, _)| f == self)
            .map(|(_, func)| *func)
            .unwrap_or(scale_nearest)
    }

    pub fn apply(&self, src: &RgbaImage, dst_w: u32, dst_h: u32) -> RgbaImage {
        (self.resample_fn())(src, dst_w, dst_h)
    }
}

impl RotationFilter {
    pub fn all() -> &'static [RotationFilter] {
        &[RotationFilter::Nearest, RotationFilter::RotSprite]
    }

    pub fn label(&self) -> &'static str {
        match self {
            RotationFilter::Nearest => "Nearest Neighbor",
            RotationFilter::RotSprite => "RotSprite",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            RotationFilter::Nearest => "nearest",
            RotationFilter::RotSprite => "rotsprite",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.key().eq_ignore_ascii_case(s.trim()))
    }

    pub fn rotate_fn(&self) -> RotateFn {
        ROTATE_TABLE
            .iter()
            .find(|(f, _)| f == self)
            .map(|(_, func)| *func)
            .unwrap_or(rotate_nearest)
    }

    pub fn apply(&self, src: &RgbaImage, degrees: f32) -> RgbaImage {
        (self.rotate_fn())(src, degrees)
    }
}

// ---------------------------------------------------------------------------
//  Pipeline
// ---------------------------------------------------------------------------

/// Target size of a `w × h` buffer at the given scale, never below 1×1.
pub fn scaled_dims(w: u32, h: u32, scale_x: f32, scale_y: f32) -> (u32, u32) {
    let sw = (w as f32 * scale_x).round().max(1.0) as u32;
    let sh = (h as f32 * scale_y).round().max(1.0) as u32;
    (sw, sh)
}

/// Scale, then rotate.  Rotating first would make the scale pass work on
/// the already-grown rotated canvas and change the output size.
pub fn build_resampled(
    src: &RgbaImage,
    scale_x: f32,
    scale_y: f32,
    degrees: f32,
    scale_filter: ScaleFilter,
    rotation_filter: RotationFilter,
) -> RgbaImage {
    let (dw, dh) = scaled_dims(src.width(), src.height(), scale_x, scale_y);
    let scaled = if dw == src.width() && dh == src.height() {
        src.clone()
    } else {
        scale_filter.apply(src, dw, dh)
    };
    if normalize_degrees(degrees) == 0.0 {
        scaled
    } else {
        rotation_filter.apply(&scaled, degrees)
    }
}

/// Size of the canvas that holds a `w × h` image rotated by `degrees`.
pub fn rotated_dims(w: u32, h: u32, degrees: f32) -> (u32, u32) {
    let deg = normalize_degrees(degrees);
    if let Some(q) = quarter_turns(deg) {
        return if q % 2 == 0 { (w, h) } else { (h, w) };
    }
    let (sin, cos) = deg.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let rw = (w as f32 * cos + h as f32 * sin - 1e-3).ceil().max(1.0) as u32;
    let rh = (w as f32 * sin + h as f32 * cos - 1e-3).ceil().max(1.0) as u32;
    (rw, rh)
}

/// `Some(n)` when `degrees` (already in `[0, 360)`) is a whole number of
/// quarter turns.
fn quarter_turns(degrees: f32) -> Option<u32> {
    let q = degrees / 90.0;
    let n = q.round();
    if (q - n).abs() < 1e-4 { Some((n as u32) % 4) } else { None }
}

fn rotate_quarter(src: &RgbaImage, turns: u32) -> RgbaImage {
    match turns {
        1 => imageops::rotate90(src),
        2 => imageops::rotate180(src),
        3 => imageops::rotate270(src),
        _ => src.clone(),
    }
}

/// Build an image row-parallel from a per-pixel function.
fn render_rows<F>(w: u32, h: u32, f: F) -> RgbaImage
where
    F: Fn(u32, u32) -> Rgba<u8> + Sync,
{
    let mut out = RgbaImage::new(w, h);
    let stride = w as usize * 4;
    if stride == 0 {
        return out;
    }
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let px = f(x, y as u32);
            let i = x as usize * 4;
            row[i..i + 4].copy_from_slice(&px.0);
        }
    });
    out
}

// ---------------------------------------------------------------------------
//  Scale filters
// ---------------------------------------------------------------------------

pub fn scale_nearest(src: &RgbaImage, dst_w: u32, dst_h: u32) -> RgbaImage {
    let (dw, dh) = (dst_w.max(1), dst_h.max(1));
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return RgbaImage::new(dw, dh);
    }
    if sw == dw && sh == dh {
        return src.clone();
    }
    render_rows(dw, dh, |x, y| {
        let sx = ((x as u64 * sw as u64) / dw as u64).min(sw as u64 - 1) as u32;
        let sy = ((y as u64 * sh as u64) / dh as u64).min(sh as u64 - 1) as u32;
        *src.get_pixel(sx, sy)
    })
}

/// Bilinear resize.  Colour is weighted by alpha so transparent neighbours
/// never bleed their (meaningless) RGB into the edge of a sprite.
pub fn scale_bilinear(src: &RgbaImage, dst_w: u32, dst_h: u32) -> RgbaImage {
    let (dw, dh) = (dst_w.max(1), dst_h.max(1));
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return RgbaImage::new(dw, dh);
    }
    let rx = sw as f32 / dw as f32;
    let ry = sh as f32 / dh as f32;
    render_rows(dw, dh, |x, y| {
        let fx = (x as f32 + 0.5) * rx - 0.5;
        let fy = (y as f32 + 0.5) * ry - 0.5;
        sample_bilinear(src, fx, fy)
    })
}

/// Clamp-to-edge bilinear sample at fractional pixel coordinates.
pub fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return TRANSPARENT;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |sx: i64, sy: i64| -> [f32; 4] {
        let cx = sx.clamp(0, w as i64 - 1) as u32;
        let cy = sy.clamp(0, h as i64 - 1) as u32;
        let p = img.get_pixel(cx, cy).0;
        [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
    };

    let taps = [
        (fetch(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (fetch(x0 + 1, y0), fx * (1.0 - fy)),
        (fetch(x0, y0 + 1), (1.0 - fx) * fy),
        (fetch(x0 + 1, y0 + 1), fx * fy),
    ];

    let mut alpha = 0.0f32;
    let mut rgb = [0.0f32; 3];
    for (p, wgt) in &taps {
        let wa = wgt * p[3];
        alpha += wa;
        rgb[0] += p[0] * wa;
        rgb[1] += p[1] * wa;
        rgb[2] += p[2] * wa;
    }
    if alpha <= 0.0 {
        return TRANSPARENT;
    }
    let inv = 1.0 / alpha;
    Rgba([
        (rgb[0] * inv).round().clamp(0.0, 255.0) as u8,
        (rgb[1] * inv).round().clamp(0.0, 255.0) as u8,
        (rgb[2] * inv).round().clamp(0.0, 255.0) as u8,
        alpha.round().clamp(0.0, 255.0) as u8,
    ])
}

pub fn scale_epx(src: &RgbaImage, dst_w: u32, dst_h: u32) -> RgbaImage {
    upscale_in_passes(src, dst_w, dst_h, epx_2x)
}

pub fn scale_scale2x(src: &RgbaImage, dst_w: u32, dst_h: u32) -> RgbaImage {
    upscale_in_passes(src, dst_w, dst_h, scale2x_2x)
}

/// Apply a 2× pixel-art pass until the buffer meets or exceeds the target
/// on both axes, then finish with block sampling to the exact size.
/// Shrinking skips the passes entirely.
fn upscale_in_passes(
    src: &RgbaImage,
    dst_w: u32,
    dst_h: u32,
    pass: fn(&RgbaImage) -> RgbaImage,
) -> RgbaImage {
    let (dw, dh) = (dst_w.max(1), dst_h.max(1));
    if src.width() == 0 || src.height() == 0 {
        return RgbaImage::new(dw, dh);
    }
    if dw <= src.width() && dh <= src.height() {
        return scale_nearest(src, dw, dh);
    }
    let mut cur = pass(src);
    let mut passes = 1;
    while (cur.width() < dw || cur.height() < dh) && passes < MAX_PIXEL_ART_PASSES {
        cur = pass(&cur);
        passes += 1;
    }
    scale_nearest(&cur, dw, dh)
}

/// Edge-clamped neighbour fetch.
#[inline]
fn px_clamped(img: &RgbaImage, x: i64, y: i64) -> Rgba<u8> {
    let cx = x.clamp(0, img.width() as i64 - 1) as u32;
    let cy = y.clamp(0, img.height() as i64 - 1) as u32;
    *img.get_pixel(cx, cy)
}

/// One EPX pass.  Neighbours: A above, B right, C left, D below.
pub fn epx_2x(src: &RgbaImage) -> RgbaImage {
    let (w, h) = src.dimensions();
    render_rows(w * 2, h * 2, |ox, oy| {
        let (x, y) = ((ox / 2) as i64, (oy / 2) as i64);
        let p = px_clamped(src, x, y);
        let a = px_clamped(src, x, y - 1);
        let b = px_clamped(src, x + 1, y);
        let c = px_clamped(src, x - 1, y);
        let d = px_clamped(src, x, y + 1);

        let three_alike = (a == b && (a == c || a == d)) || (c == d && (c == a || c == b));
        if three_alike {
            return p;
        }
        match (ox % 2, oy % 2) {
            (0, 0) if c == a => a,
            (1, 0) if a == b => b,
            (0, 1) if d == c => c,
            (1, 1) if b == d => d,
            _ => p,
        }
    })
}

/// One Scale2x pass.  Neighbours: B above, D left, F right, H below.
pub fn scale2x_2x(src: &RgbaImage) -> RgbaImage {
    let (w, h) = src.dimensions();
    render_rows(w * 2, h * 2, |ox, oy| {
        let (x, y) = ((ox / 2) as i64, (oy / 2) as i64);
        let e = px_clamped(src, x, y);
        let b = px_clamped(src, x, y - 1);
        let d = px_clamped(src, x - 1, y);
        let f = px_clamped(src, x + 1, y);
        let hh = px_clamped(src, x, y + 1);

        if b == hh || d == f {
            return e;
        }
        match (ox % 2, oy % 2) {
            (0, 0) if d == b => d,
            (1, 0) if b == f => f,
            (0, 1) if d == hh => d,
            (1, 1) if hh == f => f,
            _ => e,
        }
    })
}

// ---------------------------------------------------------------------------
//  Rotation filters
// ---------------------------------------------------------------------------

/// Nearest-neighbour rotation about the image centre.  The output canvas
/// grows to hold the rotated footprint; uncovered pixels are transparent.
pub fn rotate_nearest(src: &RgbaImage, degrees: f32) -> RgbaImage {
    rotate_sampled(src, degrees, 1)
}

/// RotSprite-style rotation: the source is upscaled 8× with Scale2x (which
/// rounds diagonal staircases into smooth slopes) and the rotated output is
/// sampled from the enlarged image at 1× resolution.
pub fn rotate_rotsprite(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let pixels = src.width() as u64 * src.height() as u64;
    let mut factor = 8u32;
    while factor > 1 && pixels * (factor as u64 * factor as u64) > ROTSPRITE_MAX_INTERMEDIATE {
        factor /= 2;
    }
    rotate_sampled(src, degrees, factor)
}

/// Inverse-map every output pixel into a `factor`× Scale2x enlargement of
/// `src`.  `factor == 1` samples the source directly.
fn rotate_sampled(src: &RgbaImage, degrees: f32, factor: u32) -> RgbaImage {
    let deg = normalize_degrees(degrees);
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return src.clone();
    }
    if let Some(q) = quarter_turns(deg) {
        return rotate_quarter(src, q);
    }

    let mut enlarged = None;
    let mut f = 1;
    while f < factor {
        let next = scale2x_2x(enlarged.as_ref().unwrap_or(src));
        enlarged = Some(next);
        f *= 2;
    }
    let sampled = enlarged.as_ref().unwrap_or(src);
    let k = f as f32;

    let (rw, rh) = rotated_dims(sw, sh, deg);
    let src_c = Vec2::new(sw as f32 / 2.0, sh as f32 / 2.0);
    let dst_c = Vec2::new(rw as f32 / 2.0, rh as f32 / 2.0);
    let inv = -deg.to_radians();
    let (uw, uh) = sampled.dimensions();

    render_rows(rw, rh, |x, y| {
        let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - dst_c;
        let s = rotate_vec(d, inv) + src_c;
        let ux = (s.x * k).floor();
        let uy = (s.y * k).floor();
        if ux < 0.0 || uy < 0.0 || ux >= uw as f32 || uy >= uh as f32 {
            return TRANSPARENT;
        }
        *sampled.get_pixel(ux as u32, uy as u32)
    })
}
