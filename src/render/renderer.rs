// ============================================================================
// SELECTION RENDERER — buffer, marching ants, handles, marquee preview
// ============================================================================
//
// Reads the selection; the only thing it writes is the disposable resampled
// cache (through `Selection::ensure_preview`).  Draw order per frame:
// floating buffer → outline → handles → marquee preview.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use egui::{Color32, Pos2, Rect, Stroke, Vec2};

use crate::geometry::PixelRect;
use crate::ops::handles::{HandleLayout, SelectionFrame};
use crate::render::outline::{AntsPhase, EdgeSegments, dash_segments, scan_alpha, scan_mask};
use crate::render::surface::{DrawSurface, Sampling};
use crate::selection::{InteractionState, Selection, SelectionRegion, SelectionState};
use crate::settings::TransformSettings;
use crate::viewport::Viewport;

const ANTS_WIDTH: f32 = 1.0;

/// Selection boundary in document space.
#[derive(Clone, Debug, PartialEq)]
pub enum Outline {
    /// Pixel-boundary segments.
    Edges(Vec<[Pos2; 2]>),
    /// Rotated bounding box, NW NE SE SW.
    Polygon([Pos2; 4]),
}

impl Outline {
    pub fn segments(&self) -> Vec<[Pos2; 2]> {
        match self {
            Outline::Edges(lines) => lines.clone(),
            Outline::Polygon(p) => (0..4).map(|i| [p[i], p[(i + 1) % 4]]).collect(),
        }
    }
}

/// What the cached edge scan was computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EdgeSource {
    Region { revision: u64 },
    Raw { revision: u64 },
    Resampled { revision: u64, rebuilds: u64 },
}

#[derive(Default)]
pub struct SelectionRenderer {
    phase: AntsPhase,
    edges: Option<(EdgeSource, EdgeSegments)>,
    last_layout: Option<HandleLayout>,
}

impl SelectionRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> f32 {
        self.phase.value()
    }

    /// Advance the marching ants by one frame.
    pub fn tick(&mut self, settings: &TransformSettings) -> f32 {
        self.phase.advance(settings.ants_speed, settings.dash_period())
    }

    /// Handle geometry used for the last drawn frame.
    pub fn last_layout(&self) -> Option<&HandleLayout> {
        self.last_layout.as_ref()
    }

    /// Draw one frame.  `marquee` is the in-progress marquee rectangle in
    /// document pixels, if the tool is dragging one.
    pub fn draw(
        &mut self,
        sel: &mut Selection,
        ix: &InteractionState,
        marquee: Option<PixelRect>,
        viewport: &Viewport,
        settings: &TransformSettings,
        surface: &mut dyn DrawSurface,
    ) {
        self.last_layout = None;
        if sel.state() == SelectionState::Armed {
            self.draw_buffer(sel, viewport, settings, surface);
            let outline = self.outline(sel, settings);
            self.draw_outline(&outline, viewport, settings, ix.is_transforming(), surface);
            self.draw_handles(sel, viewport, settings, surface);
        }
        if let Some(rect) = marquee {
            self.draw_marquee(rect, viewport, settings, surface);
        }
    }

    // --- buffer ------------------------------------------------------------

    fn draw_buffer(
        &mut self,
        sel: &mut Selection,
        viewport: &Viewport,
        settings: &TransformSettings,
        surface: &mut dyn DrawSurface,
    ) {
        let Some(generation) = sel.floating().map(|f| f.generation) else { return };
        let sampling = if viewport.zoom() >= 1.0 { Sampling::Nearest } else { Sampling::Linear };
        let center = sel.center();

        if sel.transform().needs_resample() {
            let Some(img) = sel.ensure_preview(settings.scale_filter, settings.rotation_filter) else {
                return;
            };
            let dims = Vec2::new(img.width() as f32, img.height() as f32);
            let doc = Rect::from_min_size(center - dims / 2.0, dims);
            let rebuilds = sel.preview().rebuild_count();
            let Some(img) = sel.preview().image() else { return };
            surface.image(content_key(generation, rebuilds), img, viewport.doc_rect_to_view(doc), sampling);
        } else if let Some(f) = sel.floating() {
            let dims = Vec2::new(f.pixels.width() as f32, f.pixels.height() as f32);
            let doc = Rect::from_min_size(f.position, dims);
            surface.image(content_key(generation, 0), &f.pixels, viewport.doc_rect_to_view(doc), sampling);
        }
    }

    // --- outline -----------------------------------------------------------

    /// Outline geometry for the current representation.  Edge scans are
    /// cached until the pixels they came from change.
    pub fn outline(&mut self, sel: &Selection, settings: &TransformSettings) -> Outline {
        let Some(frame) = SelectionFrame::of(sel) else { return Outline::Edges(Vec::new()) };

        let Some(buf) = sel.floating() else {
            return match sel.region() {
                Some(SelectionRegion::Rect(r)) => {
                    let r = r.normalize().to_rect();
                    Outline::Polygon([r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()])
                }
                Some(SelectionRegion::Mask { bounds, mask }) => {
                    let src = EdgeSource::Region { revision: sel.revision() };
                    let origin = Pos2::new(bounds.x as f32, bounds.y as f32);
                    Outline::Edges(self.cached_edges(src, || scan_mask(mask)).lines(origin))
                }
                None => Outline::Edges(Vec::new()),
            };
        };

        if !sel.transform().needs_resample() {
            let src = EdgeSource::Raw { revision: sel.revision() };
            return Outline::Edges(self.cached_edges(src, || scan_alpha(&buf.pixels)).lines(buf.position));
        }

        let key = sel.cache_key(settings.scale_filter, settings.rotation_filter);
        if let Some(img) = key.as_ref().and_then(|k| sel.preview().get(k)) {
            let src = EdgeSource::Resampled { revision: sel.revision(), rebuilds: sel.preview().rebuild_count() };
            let origin = frame.center - Vec2::new(img.width() as f32, img.height() as f32) / 2.0;
            return Outline::Edges(self.cached_edges(src, || scan_alpha(img)).lines(origin));
        }

        Outline::Polygon(frame.corners())
    }

    fn cached_edges<F>(&mut self, src: EdgeSource, scan: F) -> &EdgeSegments
    where
        F: FnOnce() -> EdgeSegments,
    {
        if self.edges.as_ref().is_some_and(|(s, _)| *s != src) {
            self.edges = None;
        }
        &self.edges.get_or_insert_with(|| (src, scan())).1
    }

    fn draw_outline(
        &self,
        outline: &Outline,
        viewport: &Viewport,
        settings: &TransformSettings,
        solid: bool,
        surface: &mut dyn DrawSurface,
    ) {
        let white = Stroke::new(ANTS_WIDTH, Color32::WHITE);
        let black = Stroke::new(ANTS_WIDTH, Color32::BLACK);
        for [a, b] in outline.segments() {
            let (a, b) = (viewport.doc_to_view(a), viewport.doc_to_view(b));
            if solid {
                surface.line(a, b, white);
                continue;
            }
            march(a, b, self.phase.value(), settings, white, black, surface);
        }
    }

    // --- handles -----------------------------------------------------------

    fn draw_handles(
        &mut self,
        sel: &Selection,
        viewport: &Viewport,
        settings: &TransformSettings,
        surface: &mut dyn DrawSurface,
    ) {
        let Some(layout) = HandleLayout::compute(sel, viewport, settings) else { return };
        let accent = Stroke::new(1.0, settings.accent);

        if sel.is_floating() {
            for i in 0..4 {
                surface.line(layout.corners[i], layout.corners[(i + 1) % 4], accent);
            }
        }
        for (_, p) in &layout.rotate {
            surface.circle(*p, layout.rotate_radius * 0.5, Color32::TRANSPARENT, accent);
        }
        let handle_stroke = Stroke::new(1.0, settings.handle_stroke);
        for (_, p) in &layout.scale {
            surface.polygon(&layout.handle_quad(*p), settings.handle_fill, handle_stroke);
        }
        if layout.show_pivot {
            let r = layout.pivot_radius;
            let p = layout.pivot;
            surface.circle(p, r, Color32::TRANSPARENT, Stroke::new(1.5, settings.handle_stroke));
            surface.circle(p, r, Color32::TRANSPARENT, Stroke::new(1.0, settings.handle_fill));
            surface.line(p - Vec2::new(r, 0.0), p + Vec2::new(r, 0.0), handle_stroke);
            surface.line(p - Vec2::new(0.0, r), p + Vec2::new(0.0, r), handle_stroke);
        }
        self.last_layout = Some(layout);
    }

    // --- marquee -----------------------------------------------------------

    fn draw_marquee(
        &self,
        rect: PixelRect,
        viewport: &Viewport,
        settings: &TransformSettings,
        surface: &mut dyn DrawSurface,
    ) {
        let r = viewport.doc_rect_to_view(rect.normalize().to_rect());
        let white = Stroke::new(ANTS_WIDTH, Color32::WHITE);
        let black = Stroke::new(ANTS_WIDTH, Color32::BLACK);
        let corners = [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()];
        for i in 0..4 {
            march(corners[i], corners[(i + 1) % 4], self.phase.value(), settings, white, black, surface);
        }
    }
}

/// Alternating white/black dashes along one segment.
fn march(
    a: Pos2,
    b: Pos2,
    phase: f32,
    settings: &TransformSettings,
    white: Stroke,
    black: Stroke,
    surface: &mut dyn DrawSurface,
) {
    for [p, q] in dash_segments(a, b, settings.dash_on, settings.dash_off, phase) {
        surface.line(p, q, white);
    }
    if settings.dash_off > 0.0 {
        for [p, q] in dash_segments(a, b, settings.dash_off, settings.dash_on, phase - settings.dash_on) {
            surface.line(p, q, black);
        }
    }
}

/// Stable identity of blitted pixels, for texture reuse.
fn content_key(generation: u64, rebuilds: u64) -> u64 {
    let mut h = DefaultHasher::new();
    (generation, rebuilds).hash(&mut h);
    h.finish()
}
