// ============================================================================
// OUTLINE — boundary edge scan, marching-ants phase, dash splitting
// ============================================================================

use egui::{Pos2, Vec2};
use image::{GrayImage, RgbaImage};

/// Pixel-boundary segments of a coverage mask, in mask-local pixel units.
/// Horizontal runs are `(y, x0, x1)`; vertical runs are `(x, y0, y1)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeSegments {
    pub h: Vec<(u32, u32, u32)>,
    pub v: Vec<(u32, u32, u32)>,
}

impl EdgeSegments {
    pub fn len(&self) -> usize {
        self.h.len() + self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.h.is_empty() && self.v.is_empty()
    }

    /// Segments as line endpoints, offset by `origin` (document space).
    pub fn lines(&self, origin: Pos2) -> Vec<[Pos2; 2]> {
        let at = |x: u32, y: u32| origin + Vec2::new(x as f32, y as f32);
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.h.iter().map(|&(y, x0, x1)| [at(x0, y), at(x1, y)]));
        out.extend(self.v.iter().map(|&(x, y0, y1)| [at(x, y0), at(x, y1)]));
        out
    }
}

/// Find every inside/outside transition of a `w × h` coverage function.
/// Pixels beyond the edges count as outside.  Adjacent boundary pixels are
/// merged into single runs.
pub fn scan_edges<F>(w: u32, h: u32, inside: F) -> EdgeSegments
where
    F: Fn(u32, u32) -> bool,
{
    let mut segs = EdgeSegments::default();
    if w == 0 || h == 0 {
        return segs;
    }

    for y_line in 0..=h {
        let mut run: Option<u32> = None;
        for x in 0..w {
            let above = y_line > 0 && inside(x, y_line - 1);
            let below = y_line < h && inside(x, y_line);
            let boundary = above != below;
            if boundary && run.is_none() {
                run = Some(x);
            } else if !boundary && let Some(x0) = run.take() {
                segs.h.push((y_line, x0, x));
            }
        }
        if let Some(x0) = run {
            segs.h.push((y_line, x0, w));
        }
    }

    for x_line in 0..=w {
        let mut run: Option<u32> = None;
        for y in 0..h {
            let left = x_line > 0 && inside(x_line - 1, y);
            let right = x_line < w && inside(x_line, y);
            let boundary = left != right;
            if boundary && run.is_none() {
                run = Some(y);
            } else if !boundary && let Some(y0) = run.take() {
                segs.v.push((x_line, y0, y));
            }
        }
        if let Some(y0) = run {
            segs.v.push((x_line, y0, h));
        }
    }
    segs
}

/// Boundary of the non-transparent pixels of a buffer.
pub fn scan_alpha(img: &RgbaImage) -> EdgeSegments {
    scan_edges(img.width(), img.height(), |x, y| img.get_pixel(x, y)[3] > 0)
}

/// Boundary of a selection mask.
pub fn scan_mask(mask: &GrayImage) -> EdgeSegments {
    scan_edges(mask.width(), mask.height(), |x, y| mask.get_pixel(x, y)[0] > 0)
}

/// Animated dash offset.  Always within `[0, period)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AntsPhase {
    phase: f32,
}

impl AntsPhase {
    pub fn value(&self) -> f32 {
        self.phase
    }

    /// Step one frame forward.
    pub fn advance(&mut self, speed: f32, period: f32) -> f32 {
        if period <= 0.0 || !period.is_finite() {
            self.phase = 0.0;
            return 0.0;
        }
        let mut p = (self.phase + speed).rem_euclid(period);
        if p >= period {
            p = 0.0;
        }
        self.phase = p;
        p
    }
}

/// Split `a → b` into "on" dashes of a repeating on/off pattern shifted
/// by `offset`.
pub fn dash_segments(a: Pos2, b: Pos2, on: f32, off: f32, offset: f32) -> Vec<[Pos2; 2]> {
    let dir = b - a;
    let total = dir.length();
    let mut out = Vec::new();
    if total < 0.1 || on <= 0.0 {
        return out;
    }
    let unit = dir / total;
    let period = on + off.max(0.0);
    let mut t = -offset.rem_euclid(period);
    while t < total {
        let s = t.max(0.0);
        let e = (t + on).min(total);
        if s < e {
            out.push([a + unit * s, a + unit * e]);
        }
        t += period;
    }
    out
}
