// ============================================================================
// DOCUMENT — layer pixel store the selection lifts from and commits into
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::geometry::PixelRect;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rectangular read/write access to one layer's pixels.
pub trait LayerStore {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Copy `rect` out of the layer.  Pixels outside the layer read as
    /// transparent, so the result is always `rect.w × rect.h`.
    fn read_region(&self, rect: PixelRect) -> RgbaImage;

    /// Paste `pixels` with its top-left at (`x`, `y`).  Anything that
    /// falls outside the layer is dropped.
    fn write_region(&mut self, x: i32, y: i32, pixels: &RgbaImage);

    /// Clear the pixels where `keep` is true inside `rect`.
    fn clear_region(&mut self, rect: PixelRect, keep: &dyn Fn(i32, i32) -> bool) {
        let Some(r) = rect.clamp_to_surface(self.width(), self.height()) else { return };
        let mut patch = self.read_region(r);
        for (px, py, p) in patch.enumerate_pixels_mut() {
            if keep(r.x + px as i32, r.y + py as i32) {
                *p = TRANSPARENT;
            }
        }
        self.write_region(r.x, r.y, &patch);
    }

    fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width() as i32, self.height() as i32)
    }
}

/// In-memory layer backed by a single `RgbaImage`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RasterLayer {
    pub pixels: RgbaImage,
    /// Bumped on every write; lets hosts re-upload only when needed.
    pub generation: u64,
}

impl RasterLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: RgbaImage::new(width, height), generation: 0 }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels, generation: 0 }
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

impl LayerStore for RasterLayer {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn read_region(&self, rect: PixelRect) -> RgbaImage {
        let r = rect.normalize();
        let mut out = RgbaImage::from_pixel(r.w.max(0) as u32, r.h.max(0) as u32, TRANSPARENT);
        let Some(clip) = r.clamp_to_surface(self.width(), self.height()) else { return out };
        for y in clip.y..clip.bottom() {
            for x in clip.x..clip.right() {
                let p = *self.pixels.get_pixel(x as u32, y as u32);
                out.put_pixel((x - r.x) as u32, (y - r.y) as u32, p);
            }
        }
        out
    }

    fn write_region(&mut self, x: i32, y: i32, pixels: &RgbaImage) {
        let area = PixelRect::new(x, y, pixels.width() as i32, pixels.height() as i32);
        let Some(clip) = area.clamp_to_surface(self.width(), self.height()) else { return };
        for dy in clip.y..clip.bottom() {
            for dx in clip.x..clip.right() {
                let p = *pixels.get_pixel((dx - x) as u32, (dy - y) as u32);
                self.pixels.put_pixel(dx as u32, dy as u32, p);
            }
        }
        self.generation += 1;
    }
}
