// ============================================================================
// DRAW SURFACE — primitive draw calls the renderer emits
// ============================================================================

use egui::{Color32, ColorImage, Painter, Pos2, Rect, Shape, Stroke, TextureHandle, TextureOptions};
use image::RgbaImage;

use crate::render::alpha::premultiplied;

/// Texture sampling for image blits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Sampling {
    #[default]
    Nearest,
    Linear,
}

impl Sampling {
    fn options(self) -> TextureOptions {
        match self {
            Sampling::Nearest => TextureOptions::NEAREST,
            Sampling::Linear => TextureOptions::LINEAR,
        }
    }
}

/// Anything the renderer can draw onto.  Coordinates are view space.
pub trait DrawSurface {
    fn line(&mut self, a: Pos2, b: Pos2, stroke: Stroke);
    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke);
    fn rect(&mut self, rect: Rect, rounding: f32, fill: Color32, stroke: Stroke);
    /// Convex polygon.
    fn polygon(&mut self, points: &[Pos2], fill: Color32, stroke: Stroke);
    /// Blit a straight-alpha image into `rect`.  `key` changes whenever the
    /// pixels do, so a surface may keep an uploaded copy while it is stable.
    fn image(&mut self, key: u64, image: &RgbaImage, rect: Rect, sampling: Sampling);
}

// ---------------------------------------------------------------------------
//  egui
// ---------------------------------------------------------------------------

/// One uploaded texture, reused across frames while its key holds.
#[derive(Default)]
pub struct TextureSlot {
    handle: Option<TextureHandle>,
    key: Option<(u64, Sampling)>,
    uploads: u64,
}

impl TextureSlot {
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn release(&mut self) {
        self.handle = None;
        self.key = None;
    }
}

/// `DrawSurface` over an `egui::Painter`.  egui composites premultiplied
/// colour, so images are premultiplied on a copy right before upload.
pub struct EguiSurface<'a> {
    painter: &'a Painter,
    slot: &'a mut TextureSlot,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a Painter, slot: &'a mut TextureSlot) -> Self {
        Self { painter, slot }
    }
}

impl DrawSurface for EguiSurface<'_> {
    fn line(&mut self, a: Pos2, b: Pos2, stroke: Stroke) {
        self.painter.line_segment([a, b], stroke);
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.painter.circle(center, radius, fill, stroke);
    }

    fn rect(&mut self, rect: Rect, rounding: f32, fill: Color32, stroke: Stroke) {
        self.painter.rect(rect, rounding, fill, stroke);
    }

    fn polygon(&mut self, points: &[Pos2], fill: Color32, stroke: Stroke) {
        self.painter.add(Shape::convex_polygon(points.to_vec(), fill, stroke));
    }

    fn image(&mut self, key: u64, image: &RgbaImage, rect: Rect, sampling: Sampling) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        if self.slot.key != Some((key, sampling)) || self.slot.handle.is_none() {
            let pm = premultiplied(image);
            let size = [image.width() as usize, image.height() as usize];
            let color = ColorImage::from_rgba_premultiplied(size, pm.as_raw());
            match self.slot.handle.as_mut() {
                Some(tex) => tex.set(color, sampling.options()),
                None => {
                    let tex = self.painter.ctx().load_texture("floating_selection", color, sampling.options());
                    self.slot.handle = Some(tex);
                }
            }
            self.slot.key = Some((key, sampling));
            self.slot.uploads += 1;
        }
        if let Some(tex) = &self.slot.handle {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            self.painter.image(tex.id(), rect, uv, Color32::WHITE);
        }
    }
}

// ---------------------------------------------------------------------------
//  Recording (headless)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Line { a: Pos2, b: Pos2, stroke: Stroke },
    Circle { center: Pos2, radius: f32, fill: Color32, stroke: Stroke },
    Rect { rect: Rect, rounding: f32, fill: Color32, stroke: Stroke },
    Polygon { points: Vec<Pos2>, fill: Color32, stroke: Stroke },
    Image { key: u64, width: u32, height: u32, rect: Rect, sampling: Sampling },
}

/// Records every call instead of drawing.  Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
    last_image_key: Option<u64>,
    /// Distinct consecutive image keys seen, i.e. uploads a texture-backed
    /// surface would have made.
    pub uploads: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = (&Pos2, &Pos2, &Stroke)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Line { a, b, stroke } => Some((a, b, stroke)),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(|c| matches!(c, DrawCommand::Image { .. }))
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Rect { rect, .. } => Some(rect),
            _ => None,
        })
    }
}

impl DrawSurface for RecordingSurface {
    fn line(&mut self, a: Pos2, b: Pos2, stroke: Stroke) {
        self.commands.push(DrawCommand::Line { a, b, stroke });
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.commands.push(DrawCommand::Circle { center, radius, fill, stroke });
    }

    fn rect(&mut self, rect: Rect, rounding: f32, fill: Color32, stroke: Stroke) {
        self.commands.push(DrawCommand::Rect { rect, rounding, fill, stroke });
    }

    fn polygon(&mut self, points: &[Pos2], fill: Color32, stroke: Stroke) {
        self.commands.push(DrawCommand::Polygon { points: points.to_vec(), fill, stroke });
    }

    fn image(&mut self, key: u64, image: &RgbaImage, rect: Rect, sampling: Sampling) {
        if self.last_image_key != Some(key) {
            self.uploads += 1;
            self.last_image_key = Some(key);
        }
        self.commands.push(DrawCommand::Image {
            key,
            width: image.width(),
            height: image.height(),
            rect,
            sampling,
        });
    }
}
