// ============================================================================
// SELECTION TOOL — pointer/key events → hit test → transform ops → redraw
// ============================================================================
//
// Owns the selection state and everything per-gesture.  Collaborators the
// host provides (viewport, layer store, history sink) arrive per call in a
// `ToolContext`; the observer is installed once.

use egui::{Pos2, Vec2};
use image::{Rgba, RgbaImage};

use crate::document::LayerStore;
use crate::geometry::PixelRect;
use crate::history::{HistoryRecord, HistorySink, PixelPatch};
use crate::ops::hit_test::{Hit, hit_test};
use crate::ops::transform::{self, FlipAxis, FlipDirection};
use crate::notify::{NullObserver, ToolStateObserver, ToolStateUpdate};
use crate::render::alpha::blend_over;
use crate::render::renderer::SelectionRenderer;
use crate::render::surface::DrawSurface;
use crate::selection::{
    DragMode, DragSnapshot, FloatingBuffer, InteractionState, LiftSource, Selection, SelectionMode,
    SelectionRegion, TransformSnapshot,
};
use crate::settings::TransformSettings;
use crate::viewport::Viewport;

/// Host collaborators for one event.
pub struct ToolContext<'a> {
    pub viewport: &'a Viewport,
    pub layer: &'a mut dyn LayerStore,
    pub history: &'a mut dyn HistorySink,
}

/// Modifier state accompanying a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerModifiers {
    /// Snap rotation to the configured step.
    pub constrain: bool,
    /// Combine mode for a new marquee, overriding the tool default.
    pub mode: Option<SelectionMode>,
}

/// Whether lifting clears the source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LiftMode {
    #[default]
    Cut,
    Copy,
}

pub struct SelectionTool {
    pub selection: Selection,
    pub interaction: InteractionState,
    pub settings: TransformSettings,
    pub combine_mode: SelectionMode,
    pub lift_mode: LiftMode,
    marquee: Option<PixelRect>,
    renderer: SelectionRenderer,
    observer: Box<dyn ToolStateObserver>,
    last_update: Option<ToolStateUpdate>,
}

impl Default for SelectionTool {
    fn default() -> Self {
        Self::new(TransformSettings::default())
    }
}

impl SelectionTool {
    pub fn new(settings: TransformSettings) -> Self {
        let mut selection = Selection::new();
        selection.set_link_scale(settings.link_scale);
        Self {
            selection,
            interaction: InteractionState::default(),
            settings,
            combine_mode: SelectionMode::Replace,
            lift_mode: LiftMode::Cut,
            marquee: None,
            renderer: SelectionRenderer::new(),
            observer: Box::new(NullObserver),
            last_update: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn ToolStateObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// In-progress marquee rectangle, document pixels.
    pub fn marquee(&self) -> Option<PixelRect> {
        self.marquee
    }

    pub fn renderer(&self) -> &SelectionRenderer {
        &self.renderer
    }

    // ------------------------------------------------------------------------
    //  Pointer
    // ------------------------------------------------------------------------

    /// What the pointer is over, for cursor feedback.
    pub fn hover(&self, pointer: Pos2, viewport: &Viewport) -> Option<Hit> {
        hit_test(&self.selection, pointer, viewport, &self.settings)
    }

    /// Start a gesture.  Returns what was hit, `None` for a new marquee.
    pub fn pointer_down(&mut self, pointer: Pos2, mods: PointerModifiers, ctx: &mut ToolContext) -> Option<Hit> {
        if self.interaction.is_dragging() {
            self.cancel_drag();
        }
        let doc = ctx.viewport.view_to_doc(pointer);
        let hit = hit_test(&self.selection, pointer, ctx.viewport, &self.settings);

        match hit {
            Some(Hit::Pivot) => transform::begin_pivot(&mut self.selection, &mut self.interaction, doc),
            Some(Hit::RotateHandle(_)) => {
                self.ensure_floating(ctx);
                transform::begin_rotate(&mut self.selection, &mut self.interaction, doc);
            }
            Some(Hit::ScaleHandle(c)) => {
                self.ensure_floating(ctx);
                transform::begin_scale(&mut self.selection, &mut self.interaction, c, doc);
            }
            Some(Hit::Body) => {
                self.ensure_floating(ctx);
                transform::begin_move(&mut self.selection, &mut self.interaction, doc);
            }
            None => self.begin_marquee(doc, mods, ctx),
        }
        // Lifting and gesture setup are not part of the gesture's change.
        self.selection.take_changed();
        self.publish();
        hit
    }

    pub fn pointer_move(&mut self, pointer: Pos2, mods: PointerModifiers, viewport: &Viewport) {
        let doc = viewport.view_to_doc(pointer);
        let (sel, ix) = (&mut self.selection, &mut self.interaction);
        match ix.drag {
            DragMode::None => return,
            DragMode::Marquee => {
                if let Some(DragSnapshot::Marquee { origin, .. }) = ix.start {
                    ix.pointer = doc;
                    self.marquee = Some(PixelRect::from_points(pixel_of(origin), pixel_of(doc)));
                }
            }
            DragMode::Move => transform::drag_move(sel, ix, doc),
            DragMode::Scale => transform::drag_scale(sel, ix, doc, &self.settings),
            DragMode::Rotate => {
                let snap = mods.constrain.then_some(self.settings.rotation_snap_deg);
                transform::drag_rotate(sel, ix, doc, snap);
            }
            DragMode::Pivot => transform::drag_pivot(sel, ix, doc, &self.settings),
        }
        self.publish();
    }

    /// Finish the gesture in progress.
    pub fn pointer_up(&mut self, ctx: &mut ToolContext) {
        match self.interaction.drag {
            DragMode::None => return,
            DragMode::Marquee => self.finish_marquee(),
            mode => {
                let before = self.interaction.revert.clone();
                transform::end_drag(&mut self.selection, &mut self.interaction);
                if let Some(before) = before {
                    self.record_transform(gesture_label(mode), before, ctx.history);
                }
            }
        }
        self.publish();
    }

    /// Abort the gesture in progress, restoring its start state.
    pub fn cancel_drag(&mut self) {
        if self.interaction.drag == DragMode::Marquee {
            self.marquee = None;
            self.interaction.reset();
        } else {
            transform::cancel_drag(&mut self.selection, &mut self.interaction);
        }
        self.publish();
    }

    /// Escape: abort a drag if one is active, otherwise cancel the floating
    /// buffer.
    pub fn escape(&mut self, ctx: &mut ToolContext) {
        if self.interaction.is_dragging() {
            self.cancel_drag();
        } else if self.selection.is_floating() {
            self.cancel(ctx);
        } else {
            self.selection.clear();
            self.publish();
        }
    }

    // ------------------------------------------------------------------------
    //  Marquee
    // ------------------------------------------------------------------------

    fn begin_marquee(&mut self, doc: Pos2, mods: PointerModifiers, ctx: &mut ToolContext) {
        let mode = mods.mode.unwrap_or(self.combine_mode);
        // A new selection never starts over an unresolved floating buffer.
        if self.selection.is_floating() {
            let placed = self.commit(ctx);
            if mode != SelectionMode::Replace
                && let Some(r) = placed
            {
                self.selection.set_region(Some(SelectionRegion::Rect(r)));
            }
        }
        let origin = Pos2::new(doc.x.floor(), doc.y.floor());
        self.interaction.begin(DragSnapshot::Marquee { origin, mode }, None, doc);
        self.marquee = Some(PixelRect::new(origin.x as i32, origin.y as i32, 0, 0));
    }

    fn finish_marquee(&mut self) {
        let mode = match self.interaction.start {
            Some(DragSnapshot::Marquee { mode, .. }) => mode,
            _ => self.combine_mode,
        };
        let rect = self.marquee.take().unwrap_or_default();
        self.interaction.reset();

        if rect.is_empty() {
            // A click without a drag deselects.
            if mode == SelectionMode::Replace {
                self.selection.clear();
            }
            return;
        }
        let region = match self.selection.region() {
            Some(current) => current.combine(rect, mode),
            None if matches!(mode, SelectionMode::Replace | SelectionMode::Add) => {
                Some(SelectionRegion::Rect(rect))
            }
            None => None,
        };
        crate::log_info!(
            "marquee {} {}x{} at ({}, {})",
            mode.label(),
            rect.w,
            rect.h,
            rect.x,
            rect.y
        );
        self.selection.set_region(region);
    }

    // ------------------------------------------------------------------------
    //  Lift / commit / cancel
    // ------------------------------------------------------------------------

    fn ensure_floating(&mut self, ctx: &mut ToolContext) {
        if !self.selection.is_floating() {
            self.lift(self.lift_mode, ctx);
        }
    }

    /// Lift the current region into a floating buffer.  Pixels outside a
    /// mask region come up transparent.  Returns false when there is
    /// nothing to lift.
    pub fn lift(&mut self, mode: LiftMode, ctx: &mut ToolContext) -> bool {
        if self.selection.is_floating() {
            return false;
        }
        let Some(region) = self.selection.region().cloned() else { return false };
        let bounds = region.bounds();
        if bounds.is_empty() {
            return false;
        }

        let original = ctx.layer.read_region(bounds);
        let mut pixels = original.clone();
        for (x, y, p) in pixels.enumerate_pixels_mut() {
            if !region.contains(bounds.x + x as i32, bounds.y + y as i32) {
                *p = Rgba([0, 0, 0, 0]);
            }
        }

        let cut = mode == LiftMode::Cut;
        if cut {
            let before = PixelPatch::capture(ctx.layer, bounds);
            ctx.layer.clear_region(bounds, &|x, y| region.contains(x, y));
            let after = PixelPatch::capture(ctx.layer, bounds);
            if !before.is_empty() {
                ctx.history.record(HistoryRecord::Pixels { description: "Lift selection".into(), before, after });
            }
        }

        let mut buffer = FloatingBuffer::new(pixels, Pos2::new(bounds.x as f32, bounds.y as f32));
        buffer.source = Some(LiftSource { region, pixels: original, cut });
        self.selection.float(buffer);
        crate::log_info!(
            "lift {} {}x{} at ({}, {})",
            if cut { "cut" } else { "copy" },
            bounds.w,
            bounds.h,
            bounds.x,
            bounds.y
        );
        self.publish();
        true
    }

    /// Bake the floating buffer into the layer using the preview filters.
    /// Returns the document rect the result was placed at (before clipping).
    pub fn commit(&mut self, ctx: &mut ToolContext) -> Option<PixelRect> {
        if !self.selection.is_floating() {
            return None;
        }
        if self.interaction.is_dragging() {
            transform::end_drag(&mut self.selection, &mut self.interaction);
        }
        self.selection.collapse_angle();

        let (sf, rf) = (self.settings.scale_filter, self.settings.rotation_filter);
        let center = self.selection.center();
        let baked = self.selection.ensure_preview(sf, rf).cloned();
        let (buffer, xf) = self.selection.take_floating()?;

        let (img, origin) = match baked {
            Some(img) => {
                let half = Vec2::new(img.width() as f32, img.height() as f32) / 2.0;
                (img, center - half)
            }
            None => (buffer.pixels, buffer.position),
        };
        let placed = PixelRect::new(
            origin.x.round() as i32,
            origin.y.round() as i32,
            img.width() as i32,
            img.height() as i32,
        );

        match composite(ctx.layer, &img, placed) {
            Some((before, after)) => {
                ctx.history.record(HistoryRecord::Pixels { description: "Commit selection".into(), before, after });
            }
            None => crate::log_warn!("commit: result at ({}, {}) lies entirely off the layer", placed.x, placed.y),
        }
        crate::log_info!(
            "commit {}x{} at ({}, {}) scale {:.0}%x{:.0}% rot {:.1}°",
            placed.w,
            placed.h,
            placed.x,
            placed.y,
            xf.scale_x * 100.0,
            xf.scale_y * 100.0,
            xf.total_angle_deg()
        );
        self.publish();
        Some(placed)
    }

    /// Discard the floating buffer.  A cut source is restored and its region
    /// re-armed.
    pub fn cancel(&mut self, ctx: &mut ToolContext) {
        if self.interaction.is_dragging() {
            self.cancel_drag();
        }
        let Some((buffer, _)) = self.selection.take_floating() else { return };
        let Some(source) = buffer.source else {
            crate::log_info!("cancel: floating buffer discarded");
            self.publish();
            return;
        };

        if source.cut {
            let bounds = source.region.bounds();
            let before = PixelPatch::capture(ctx.layer, bounds);
            let mut restored = ctx.layer.read_region(bounds);
            for (x, y, p) in restored.enumerate_pixels_mut() {
                if source.region.contains(bounds.x + x as i32, bounds.y + y as i32) {
                    *p = *source.pixels.get_pixel(x, y);
                }
            }
            ctx.layer.write_region(bounds.x, bounds.y, &restored);
            let after = PixelPatch::capture(ctx.layer, bounds);
            if !before.is_empty() {
                ctx.history.record(HistoryRecord::Pixels { description: "Cancel selection".into(), before, after });
            }
        }
        crate::log_info!("cancel: source {}", if source.cut { "restored" } else { "untouched" });
        self.selection.set_region(Some(source.region));
        self.publish();
    }

    // ------------------------------------------------------------------------
    //  Programmatic transforms (options panel, keyboard)
    // ------------------------------------------------------------------------

    pub fn set_scale_percent(&mut self, pct_x: f32, pct_y: f32, link: bool, history: &mut dyn HistorySink) {
        let Some(before) = self.selection.capture_snapshot(true) else { return };
        self.selection.take_changed();
        transform::set_scale(&mut self.selection, pct_x, pct_y, link, &self.settings);
        self.record_transform("Scale", before, history);
        self.publish();
    }

    pub fn set_rotation(&mut self, degrees: f32, history: &mut dyn HistorySink) {
        let Some(before) = self.selection.capture_snapshot(true) else { return };
        self.selection.take_changed();
        transform::set_rotation(&mut self.selection, degrees);
        self.record_transform("Rotate", before, history);
        self.publish();
    }

    pub fn flip(&mut self, direction: FlipDirection, axis: FlipAxis, history: &mut dyn HistorySink) {
        let Some(before) = self.selection.capture_snapshot(true) else { return };
        self.selection.take_changed();
        transform::flip(&mut self.selection, direction, axis);
        self.record_transform(direction.label(), before, history);
        self.publish();
    }

    pub fn nudge(&mut self, dx: i32, dy: i32, history: &mut dyn HistorySink) {
        let Some(before) = self.selection.capture_snapshot(false) else { return };
        self.selection.take_changed();
        transform::nudge(&mut self.selection, dx, dy);
        self.record_transform("Nudge", before, history);
        self.publish();
    }

    pub fn reset_transform(&mut self, history: &mut dyn HistorySink) {
        let Some(before) = self.selection.capture_snapshot(true) else { return };
        self.selection.take_changed();
        transform::reset_transform(&mut self.selection);
        self.record_transform("Reset transform", before, history);
        self.publish();
    }

    pub fn reset_pivot(&mut self) {
        transform::reset_pivot(&mut self.selection);
        self.publish();
    }

    // ------------------------------------------------------------------------
    //  Drawing
    // ------------------------------------------------------------------------

    /// Advance the marching ants; call once per frame.
    pub fn tick(&mut self) {
        self.renderer.tick(&self.settings);
    }

    pub fn draw(&mut self, viewport: &Viewport, surface: &mut dyn DrawSurface) {
        self.renderer.draw(
            &mut self.selection,
            &self.interaction,
            self.marquee,
            viewport,
            &self.settings,
            surface,
        );
    }

    // ------------------------------------------------------------------------
    //  Bookkeeping
    // ------------------------------------------------------------------------

    /// Emit a transform record if the selection reported a change since the
    /// operation began and the result differs from `before`.
    fn record_transform(&mut self, label: &str, before: TransformSnapshot, history: &mut dyn HistorySink) {
        if !self.selection.take_changed() {
            return;
        }
        let Some(after) = self.selection.capture_snapshot(false) else { return };
        let same = before.position == after.position
            && before.scale_x == after.scale_x
            && before.scale_y == after.scale_y
            && before.angle_deg == after.angle_deg
            && before.pivot == after.pivot;
        let flipped = before.buffer.as_ref().is_some_and(|b| {
            self.selection.floating().is_some_and(|f| f.pixels != b.pixels)
        });
        if same && !flipped {
            return;
        }
        let after = if flipped { self.selection.capture_snapshot(true).unwrap_or(after) } else { after };
        history.record(HistoryRecord::Transform { description: label.to_string(), before, after });
    }

    /// Push a tool-state update to the observer when it differs from the
    /// last one.
    fn publish(&mut self) {
        let xf = self.selection.transform();
        let update = ToolStateUpdate {
            present: self.selection.is_active(),
            floating: self.selection.is_floating(),
            scale_pct: xf.scale_percent(),
            rotation_deg: xf.total_angle_deg(),
        };
        if self.last_update != Some(update) {
            self.observer.tool_state_changed(&update);
            self.last_update = Some(update);
        }
    }
}

fn gesture_label(mode: DragMode) -> &'static str {
    match mode {
        DragMode::Move => "Move",
        DragMode::Scale => "Scale",
        DragMode::Rotate => "Rotate",
        DragMode::Pivot => "Move pivot",
        DragMode::Marquee | DragMode::None => "Select",
    }
}

fn pixel_of(p: Pos2) -> (i32, i32) {
    (p.x.floor() as i32, p.y.floor() as i32)
}

/// Source-over `img` onto the layer at `placed`, clipped.  Returns the
/// before/after patches, or `None` when nothing lands on the layer.
fn composite(layer: &mut dyn LayerStore, img: &RgbaImage, placed: PixelRect) -> Option<(PixelPatch, PixelPatch)> {
    let clip = placed.clamp_to_surface(layer.width(), layer.height())?;
    let before = PixelPatch::capture(layer, clip);
    let mut out = before.pixels.clone();
    let (sx0, sy0) = ((clip.x - placed.x) as u32, (clip.y - placed.y) as u32);
    for (x, y, p) in out.enumerate_pixels_mut() {
        *p = blend_over(*p, *img.get_pixel(sx0 + x, sy0 + y));
    }
    layer.write_region(clip.x, clip.y, &out);
    let after = PixelPatch { rect: clip, pixels: out };
    Some((before, after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RasterLayer;
    use crate::history::HistoryLog;
    use crate::notify::ChannelObserver;
    use crate::selection::{Compass, SelectionState};
    use pretty_assertions::assert_eq;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn layer_with_square(size: u32, at: (u32, u32), n: u32) -> RasterLayer {
        let mut img = RgbaImage::from_pixel(size, size, BLUE);
        for y in at.1..at.1 + n {
            for x in at.0..at.0 + n {
                img.put_pixel(x, y, RED);
            }
        }
        RasterLayer::from_image(img)
    }

    fn drag(tool: &mut SelectionTool, ctx: &mut ToolContext, from: Pos2, to: Pos2) -> Option<Hit> {
        let hit = tool.pointer_down(from, PointerModifiers::default(), ctx);
        tool.pointer_move(to, PointerModifiers::default(), ctx.viewport);
        tool.pointer_up(ctx);
        hit
    }

    #[test]
    fn marquee_then_move_cuts_and_commits() {
        let vp = Viewport::default();
        let mut layer = layer_with_square(64, (10, 10), 40);
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };

        assert_eq!(drag(&mut tool, &mut ctx, Pos2::new(10.0, 10.0), Pos2::new(50.0, 50.0)), None);
        assert_eq!(tool.selection.region(), Some(&SelectionRegion::Rect(PixelRect::new(10, 10, 40, 40))));

        // Grab the body away from every handle and drag ten pixels right.
        assert_eq!(drag(&mut tool, &mut ctx, Pos2::new(20.5, 20.5), Pos2::new(30.5, 20.5)), Some(Hit::Body));
        assert!(tool.selection.is_floating());
        assert_eq!(tool.selection.position(), Pos2::new(20.0, 10.0));

        tool.commit(&mut ctx);
        drop(ctx);
        assert_eq!(tool.selection.state(), SelectionState::None);
        assert_eq!(*layer.pixels.get_pixel(55, 15), RED);
        assert_eq!(*layer.pixels.get_pixel(15, 15), Rgba([0, 0, 0, 0]));
        let labels = history.descriptions();
        assert_eq!(labels, vec!["Commit selection", "Move", "Lift selection"]);
    }

    #[test]
    fn cancel_restores_cut_source_and_rearms() {
        let vp = Viewport::default();
        let mut layer = layer_with_square(64, (10, 10), 40);
        let original = layer.pixels.clone();
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };

        drag(&mut tool, &mut ctx, Pos2::new(10.0, 10.0), Pos2::new(50.0, 50.0));
        drag(&mut tool, &mut ctx, Pos2::new(20.5, 20.5), Pos2::new(26.5, 29.5));
        assert!(tool.selection.is_floating());
        tool.cancel(&mut ctx);
        drop(ctx);

        assert_eq!(layer.pixels, original);
        assert_eq!(tool.selection.region(), Some(&SelectionRegion::Rect(PixelRect::new(10, 10, 40, 40))));
        assert!(!tool.selection.is_floating());
    }

    #[test]
    fn copy_lift_leaves_source() {
        let vp = Viewport::default();
        let mut layer = layer_with_square(16, (2, 2), 4);
        let original = layer.pixels.clone();
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };

        tool.selection.set_region(Some(SelectionRegion::Rect(PixelRect::new(2, 2, 4, 4))));
        assert!(tool.lift(LiftMode::Copy, &mut ctx));
        assert!(!tool.lift(LiftMode::Copy, &mut ctx));
        drop(ctx);
        assert_eq!(layer.pixels, original);
        assert!(history.is_empty());
    }

    #[test]
    fn new_marquee_commits_floating_first() {
        let vp = Viewport::default();
        let mut layer = layer_with_square(64, (0, 0), 4);
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };

        tool.selection.set_region(Some(SelectionRegion::Rect(PixelRect::new(0, 0, 4, 4))));
        tool.lift(LiftMode::Cut, &mut ctx);
        tool.nudge(40, 40, ctx.history);

        // Well clear of the buffer's rotate handles (NW one near (27, 27)).
        let start = Pos2::new(2.5, 2.5);
        assert_eq!(tool.hover(start, &vp), None);
        let add = PointerModifiers { mode: Some(SelectionMode::Add), ..Default::default() };
        assert_eq!(tool.pointer_down(start, add, &mut ctx), None);
        assert!(!tool.selection.is_floating());
        tool.pointer_move(Pos2::new(12.5, 12.5), add, &vp);
        tool.pointer_up(&mut ctx);
        drop(ctx);

        assert_eq!(*layer.pixels.get_pixel(41, 41), RED);
        assert_eq!(*layer.pixels.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
        assert_eq!(history.descriptions(), vec!["Commit selection", "Nudge", "Lift selection"]);
        let region = tool.selection.region().cloned();
        assert_eq!(region.as_ref().map(|r| r.bounds()), Some(PixelRect::new(2, 2, 42, 42)));
        assert!(region.as_ref().is_some_and(|r| r.contains(3, 3) && r.contains(42, 42) && !r.contains(3, 42)));
    }

    #[test]
    fn gesture_without_change_records_nothing() {
        let vp = Viewport::default();
        let mut layer = RasterLayer::new(64, 64);
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        tool.selection.float(FloatingBuffer::new(RgbaImage::from_pixel(40, 40, RED), Pos2::new(10.0, 10.0)));
        let body = Pos2::new(20.5, 20.5);
        {
            let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };
            // Press and release on the body, then a sub-pixel wiggle.
            assert_eq!(tool.pointer_down(body, PointerModifiers::default(), &mut ctx), Some(Hit::Body));
            tool.pointer_up(&mut ctx);
            drag(&mut tool, &mut ctx, body, Pos2::new(20.7, 20.6));
            tool.nudge(0, 0, ctx.history);
        }
        assert!(history.is_empty());

        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };
        drag(&mut tool, &mut ctx, body, Pos2::new(23.5, 20.5));
        drop(ctx);
        assert_eq!(history.descriptions(), vec!["Move"]);
    }

    #[test]
    fn click_without_drag_deselects() {
        let vp = Viewport::default();
        let mut layer = RasterLayer::new(64, 64);
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };

        tool.selection.set_region(Some(SelectionRegion::Rect(PixelRect::new(0, 0, 4, 4))));
        assert_eq!(tool.hover(Pos2::new(50.5, 50.5), &vp), None);
        drag(&mut tool, &mut ctx, Pos2::new(50.5, 50.5), Pos2::new(50.6, 50.6));
        assert_eq!(tool.selection.state(), SelectionState::None);
    }

    #[test]
    fn escape_during_scale_reverts() {
        let vp = Viewport::default();
        let mut layer = layer_with_square(64, (10, 10), 20);
        let mut history = HistoryLog::default();
        let mut tool = SelectionTool::default();
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };

        tool.selection.set_region(Some(SelectionRegion::Rect(PixelRect::new(10, 10, 20, 20))));
        tool.lift(LiftMode::Cut, &mut ctx);
        let hit = tool.pointer_down(Pos2::new(30.0, 30.0), PointerModifiers::default(), &mut ctx);
        assert_eq!(hit, Some(Hit::ScaleHandle(Compass::SE)));
        tool.pointer_move(Pos2::new(50.0, 50.0), PointerModifiers::default(), &vp);
        assert_eq!(tool.selection.transform().scale_x, 2.0);

        tool.escape(&mut ctx);
        assert_eq!(tool.selection.transform().scale_x, 1.0);
        assert_eq!(tool.selection.position(), Pos2::new(10.0, 10.0));
        assert!(tool.selection.is_floating());
    }

    #[test]
    fn observer_sees_only_changes() {
        let (obs, rx) = ChannelObserver::new();
        let mut tool = SelectionTool::default().with_observer(Box::new(obs));
        let mut history = HistoryLog::default();
        tool.selection.float(FloatingBuffer::new(RgbaImage::from_pixel(10, 10, RED), Pos2::ZERO));

        tool.set_scale_percent(150.0, 150.0, true, &mut history);
        tool.set_scale_percent(150.0, 150.0, true, &mut history);
        let updates: Vec<ToolStateUpdate> = rx.try_iter().collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].scale_pct, (150.0, 150.0));
        assert!(updates[0].floating);
        assert_eq!(history.len(), 1);
    }
}
