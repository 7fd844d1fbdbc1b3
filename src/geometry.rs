// ============================================================================
// GEOMETRY — integer document rects and rotation helpers
// ============================================================================

use egui::{Pos2, Rect, Vec2};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Axis-aligned rectangle in document pixels.  `x`/`y` may be negative
/// (a selection dragged partly off-canvas); `w`/`h` may be negative only
/// before `normalize()` is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rect spanning two drag points, in any direction.
    pub fn from_points(a: (i32, i32), b: (i32, i32)) -> Self {
        Self::new(a.0, a.1, b.0 - a.0, b.1 - a.1).normalize()
    }

    /// Flip negative width/height so the rect covers the same pixels with
    /// a positive extent.
    pub fn normalize(self) -> Self {
        let (x, w) = if self.w < 0 { (self.x + self.w, -self.w) } else { (self.x, self.w) };
        let (y, h) = if self.h < 0 { (self.y + self.h, -self.h) } else { (self.y, self.h) };
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() { 0 } else { self.w as i64 * self.h as i64 }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Overlap of two rects, `None` when they do not share a pixel.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let a = self.normalize();
        let b = other.normalize();
        let x0 = a.x.max(b.x);
        let y0 = a.y.max(b.y);
        let x1 = a.right().min(b.right());
        let y1 = a.bottom().min(b.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Smallest rect covering both.  Empty inputs do not contribute.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let a = self.normalize();
        let b = other.normalize();
        if a.is_empty() {
            return b;
        }
        if b.is_empty() {
            return a;
        }
        let x0 = a.x.min(b.x);
        let y0 = a.y.min(b.y);
        let x1 = a.right().max(b.right());
        let y1 = a.bottom().max(b.bottom());
        PixelRect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Clip to a `width × height` surface anchored at the origin.
    pub fn clamp_to_surface(&self, width: u32, height: u32) -> Option<PixelRect> {
        self.intersect(&PixelRect::new(0, 0, width as i32, height as i32))
    }

    pub fn center(&self) -> Pos2 {
        let r = self.normalize();
        Pos2::new(r.x as f32 + r.w as f32 / 2.0, r.y as f32 + r.h as f32 / 2.0)
    }

    pub fn to_rect(&self) -> Rect {
        let r = self.normalize();
        Rect::from_min_size(
            Pos2::new(r.x as f32, r.y as f32),
            Vec2::new(r.w as f32, r.h as f32),
        )
    }
}

/// `(cos, sin)` of an angle, exact for whole quarter turns so that
/// 90°/180°/270° rotations land on integer coordinates.
pub fn sin_cos_exact(radians: f32) -> (f32, f32) {
    let quarters = radians / FRAC_PI_2;
    let nearest = quarters.round();
    if (quarters - nearest).abs() < 1e-6 {
        match (nearest as i64).rem_euclid(4) {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        }
    } else {
        radians.sin_cos()
    }
}

/// Rotate `v` by `radians` (clockwise on a y-down surface).
pub fn rotate_vec(v: Vec2, radians: f32) -> Vec2 {
    let (sin, cos) = sin_cos_exact(radians);
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Rotate `p` about `center` by `radians`.
pub fn rotate_around(p: Pos2, center: Pos2, radians: f32) -> Pos2 {
    if radians == 0.0 {
        return p;
    }
    center + rotate_vec(p - center, radians)
}

/// Wrap degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f32) -> f32 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// Wrap radians into `(-π, π]`, for comparing bearings.
pub fn wrap_radians(rad: f32) -> f32 {
    let mut r = rad.rem_euclid(TAU);
    if r > std::f32::consts::PI {
        r -= TAU;
    }
    r
}

/// Bearing of `to` as seen from `from`, in radians.
pub fn bearing(from: Pos2, to: Pos2) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Axis-aligned bounds of a point set.
pub fn bounds_of(points: &[Pos2]) -> Rect {
    let mut r = Rect::NOTHING;
    for p in points {
        r.extend_with(*p);
    }
    r
}
