// ============================================================================
// SELECTION STATE — geometry, floating buffer, transform, interaction
// ============================================================================
//
// `Selection` is the single owned source of truth.  Hit testing, transform
// operations and the renderer receive it by reference; only the mutators
// below change it.  Every mutator is a no-op when the new value equals the
// old one and otherwise raises the `changed` flag read by history tracking.

use egui::{Pos2, Vec2};
use image::{GrayImage, Luma, RgbaImage, imageops};

use crate::geometry::{PixelRect, normalize_degrees, rotate_vec};
use crate::ops::resample::{RotationFilter, ScaleFilter};
use crate::render::cache::{CacheKey, ResampledCache};

/// Smallest scale factor a floating buffer may take (1%).
pub const MIN_SCALE: f32 = 0.01;

/// Largest side, in pixels, a scaled floating buffer may reach.
pub const MAX_SCALED_DIM: u32 = 8192;

const EPS: f32 = 1e-5;

// ---------------------------------------------------------------------------
//  Enums
// ---------------------------------------------------------------------------

/// `None --lift/drag--> Armed --commit/cancel--> None`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    None,
    /// A selection exists and its handles respond to input.
    Armed,
}

/// How a new marquee interacts with an existing region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Discard the existing region and start fresh.
    #[default]
    Replace,
    /// Union with the existing region.
    Add,
    /// Remove the new rectangle from the existing region.
    Subtract,
    /// Keep only pixels in both.
    Intersect,
}

impl SelectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionMode::Replace => "Replace",
            SelectionMode::Add => "Add",
            SelectionMode::Subtract => "Subtract",
            SelectionMode::Intersect => "Intersect",
        }
    }

    pub fn all() -> &'static [SelectionMode] {
        &[SelectionMode::Replace, SelectionMode::Add, SelectionMode::Subtract, SelectionMode::Intersect]
    }
}

/// The nine canonical positions of a box: its centre plus eight compass
/// points.  Scale and rotation handles use the eight outer positions; pivot
/// snapping uses all nine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compass {
    Center,
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Compass {
    /// Handle order, clockwise from the top-left corner.
    pub const HANDLES: [Compass; 8] = [
        Compass::NW,
        Compass::N,
        Compass::NE,
        Compass::E,
        Compass::SE,
        Compass::S,
        Compass::SW,
        Compass::W,
    ];

    pub const ALL: [Compass; 9] = [
        Compass::Center,
        Compass::NW,
        Compass::N,
        Compass::NE,
        Compass::E,
        Compass::SE,
        Compass::S,
        Compass::SW,
        Compass::W,
    ];

    /// Unit offset from the centre, each axis in {-1, 0, 1}.
    pub fn unit(&self) -> Vec2 {
        match self {
            Compass::Center => Vec2::new(0.0, 0.0),
            Compass::N => Vec2::new(0.0, -1.0),
            Compass::NE => Vec2::new(1.0, -1.0),
            Compass::E => Vec2::new(1.0, 0.0),
            Compass::SE => Vec2::new(1.0, 1.0),
            Compass::S => Vec2::new(0.0, 1.0),
            Compass::SW => Vec2::new(-1.0, 1.0),
            Compass::W => Vec2::new(-1.0, 0.0),
            Compass::NW => Vec2::new(-1.0, -1.0),
        }
    }

    pub fn is_corner(&self) -> bool {
        matches!(self, Compass::NE | Compass::SE | Compass::SW | Compass::NW)
    }

    /// Offset of this position from the centre of a box with half-size `half`.
    pub fn offset(&self, half: Vec2) -> Vec2 {
        let u = self.unit();
        Vec2::new(u.x * half.x, u.y * half.y)
    }

    /// Mirror across the vertical axis.
    pub fn mirrored_h(&self) -> Compass {
        match self {
            Compass::NE => Compass::NW,
            Compass::NW => Compass::NE,
            Compass::E => Compass::W,
            Compass::W => Compass::E,
            Compass::SE => Compass::SW,
            Compass::SW => Compass::SE,
            other => *other,
        }
    }

    /// Mirror across the horizontal axis.
    pub fn mirrored_v(&self) -> Compass {
        match self {
            Compass::N => Compass::S,
            Compass::S => Compass::N,
            Compass::NE => Compass::SE,
            Compass::SE => Compass::NE,
            Compass::NW => Compass::SW,
            Compass::SW => Compass::NW,
            other => *other,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Compass::Center => "center",
            Compass::N => "n",
            Compass::NE => "ne",
            Compass::E => "e",
            Compass::SE => "se",
            Compass::S => "s",
            Compass::SW => "sw",
            Compass::W => "w",
            Compass::NW => "nw",
        }
    }

    pub fn from_key(s: &str) -> Option<Compass> {
        Compass::ALL.iter().copied().find(|c| c.key().eq_ignore_ascii_case(s.trim()))
    }
}

/// Point about which rotation (and programmatic scaling) is anchored.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Pivot {
    /// Tracks the buffer centre automatically.
    #[default]
    Center,
    /// Glued to one of the eight compass points of the scaled box.
    Snapped(Compass),
    /// Arbitrary local-space offset from the centre (custom, unsnapped).
    Free(Vec2),
}

impl Pivot {
    pub fn is_custom(&self) -> bool {
        !matches!(self, Pivot::Center)
    }

    /// Offset from the centre in the selection's local (pre-rotation) frame.
    pub fn local_offset(&self, half: Vec2) -> Vec2 {
        match self {
            Pivot::Center => Vec2::ZERO,
            Pivot::Snapped(c) => c.offset(half),
            Pivot::Free(v) => *v,
        }
    }

    fn approx_eq(&self, other: &Pivot) -> bool {
        match (self, other) {
            (Pivot::Free(a), Pivot::Free(b)) => (*a - *b).length() < EPS,
            _ => self == other,
        }
    }
}

// ---------------------------------------------------------------------------
//  Region (non-floating geometry)
// ---------------------------------------------------------------------------

/// A static, non-floating selection.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionRegion {
    Rect(PixelRect),
    /// Arbitrary shape (lasso, wand, combined marquees).  `mask` has the
    /// same dimensions as `bounds`; non-zero means selected.
    Mask { bounds: PixelRect, mask: GrayImage },
}

impl SelectionRegion {
    /// Build a mask region from a document-sized mask, trimming it to the
    /// bounding box of its selected pixels.  `None` when nothing is selected.
    pub fn from_mask(origin: (i32, i32), mask: &GrayImage) -> Option<SelectionRegion> {
        let (w, h) = mask.dimensions();
        let mut min_x = w;
        let mut min_y = h;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        for (x, y, p) in mask.enumerate_pixels() {
            if p[0] > 0 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if min_x > max_x {
            return None;
        }
        let bw = max_x - min_x + 1;
        let bh = max_y - min_y + 1;
        let trimmed = imageops::crop_imm(mask, min_x, min_y, bw, bh).to_image();
        let bounds = PixelRect::new(origin.0 + min_x as i32, origin.1 + min_y as i32, bw as i32, bh as i32);
        if trimmed.pixels().all(|p| p[0] > 0) {
            Some(SelectionRegion::Rect(bounds))
        } else {
            Some(SelectionRegion::Mask { bounds, mask: trimmed })
        }
    }

    pub fn bounds(&self) -> PixelRect {
        match self {
            SelectionRegion::Rect(r) => r.normalize(),
            SelectionRegion::Mask { bounds, .. } => *bounds,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        match self {
            SelectionRegion::Rect(r) => r.normalize().contains(x, y),
            SelectionRegion::Mask { bounds, mask } => {
                bounds.contains(x, y)
                    && mask.get_pixel((x - bounds.x) as u32, (y - bounds.y) as u32)[0] > 0
            }
        }
    }

    /// Coverage of this region within `area`, as a mask the size of `area`.
    pub fn mask_over(&self, area: PixelRect) -> GrayImage {
        let area = area.normalize();
        GrayImage::from_fn(area.w.max(0) as u32, area.h.max(0) as u32, |x, y| {
            if self.contains(area.x + x as i32, area.y + y as i32) { Luma([255]) } else { Luma([0]) }
        })
    }

    /// Combine a new marquee rectangle into this region.
    pub fn combine(&self, rect: PixelRect, mode: SelectionMode) -> Option<SelectionRegion> {
        let rect = rect.normalize();
        let incoming = SelectionRegion::Rect(rect);
        let area = match mode {
            SelectionMode::Replace => return if rect.is_empty() { None } else { Some(incoming) },
            SelectionMode::Add => self.bounds().union(&rect),
            SelectionMode::Subtract => self.bounds(),
            SelectionMode::Intersect => self.bounds().intersect(&rect)?,
        };
        if area.is_empty() {
            return None;
        }
        let mask = GrayImage::from_fn(area.w as u32, area.h as u32, |x, y| {
            let (dx, dy) = (area.x + x as i32, area.y + y as i32);
            let a = self.contains(dx, dy);
            let b = incoming.contains(dx, dy);
            let keep = match mode {
                SelectionMode::Add => a || b,
                SelectionMode::Subtract => a && !b,
                SelectionMode::Intersect => a && b,
                SelectionMode::Replace => b,
            };
            if keep { Luma([255]) } else { Luma([0]) }
        });
        SelectionRegion::from_mask((area.x, area.y), &mask)
    }
}

// ---------------------------------------------------------------------------
//  Floating buffer + transform
// ---------------------------------------------------------------------------

/// Pixels as they were before a cut-lift, for restoring on cancel.
#[derive(Clone, Debug)]
pub struct LiftSource {
    pub region: SelectionRegion,
    /// Original document pixels covering `region.bounds()`.
    pub pixels: RgbaImage,
    /// Whether the source area was cleared when lifting.
    pub cut: bool,
}

/// Pixels lifted out of the document into an independent buffer.
#[derive(Clone, Debug)]
pub struct FloatingBuffer {
    /// Raw, unscaled pixels (straight alpha).
    pub pixels: RgbaImage,
    /// Document-space top-left of the unrotated, scaled box.  May be
    /// negative or beyond the canvas.
    pub position: Pos2,
    /// Dimensions before any scale was applied.
    pub orig_w: u32,
    pub orig_h: u32,
    /// Stable anchor for resize math, captured at lift and at the start of
    /// every scale gesture.
    pub orig_center: Pos2,
    pub source: Option<LiftSource>,
    /// Bumped whenever `pixels` are flipped or replaced.
    pub generation: u64,
}

impl FloatingBuffer {
    pub fn new(pixels: RgbaImage, position: Pos2) -> Self {
        let (w, h) = pixels.dimensions();
        Self {
            orig_w: w.max(1),
            orig_h: h.max(1),
            orig_center: Pos2::new(position.x + w as f32 / 2.0, position.y + h as f32 / 2.0),
            position,
            pixels,
            source: None,
            generation: 0,
        }
    }

    /// Alpha of the raw buffer at a buffer-local pixel, transparent outside.
    pub fn alpha_at(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= self.pixels.width() as i64 || y >= self.pixels.height() as i64 {
            return 0;
        }
        self.pixels.get_pixel(x as u32, y as u32)[3]
    }
}

/// Scale / rotation / pivot of a floating buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    pub scale_x: f32,
    pub scale_y: f32,
    /// Aspect lock: both axes take the same factor.
    pub link_scale: bool,
    /// Rotation of the drag in progress.
    pub angle_deg: f32,
    /// Committed rotation baseline, in `[0, 360)`.
    pub cumulative_angle_deg: f32,
    pub pivot: Pivot,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            link_scale: true,
            angle_deg: 0.0,
            cumulative_angle_deg: 0.0,
            pivot: Pivot::Center,
        }
    }
}

impl TransformState {
    /// Effective rotation: baseline plus any drag in progress.
    pub fn total_angle_deg(&self) -> f32 {
        normalize_degrees(self.cumulative_angle_deg + self.angle_deg)
    }

    pub fn total_angle_rad(&self) -> f32 {
        self.total_angle_deg().to_radians()
    }

    pub fn is_scaled(&self) -> bool {
        (self.scale_x - 1.0).abs() > EPS || (self.scale_y - 1.0).abs() > EPS
    }

    pub fn is_rotated(&self) -> bool {
        self.total_angle_deg() != 0.0
    }

    /// True when the buffer must be resampled before display.
    pub fn needs_resample(&self) -> bool {
        self.is_scaled() || self.is_rotated()
    }

    pub fn scale_percent(&self) -> (f32, f32) {
        ((self.scale_x * 100.0).round(), (self.scale_y * 100.0).round())
    }
}

// ---------------------------------------------------------------------------
//  Snapshots
// ---------------------------------------------------------------------------

/// Raw buffer copy carried by a snapshot when byte-exact undo is needed.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferSnapshot {
    pub pixels: RgbaImage,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Immutable copy of the transform-relevant state, produced for the undo
/// layer.  Resampling is lossy, so scale/rotate undo needs the buffer too.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformSnapshot {
    pub position: Pos2,
    pub scale_x: f32,
    pub scale_y: f32,
    pub angle_deg: f32,
    pub pivot: Pivot,
    pub orig_center: Pos2,
    pub buffer: Option<BufferSnapshot>,
}

impl TransformSnapshot {
    /// Approximate heap footprint, for history budgeting.
    pub fn memory_size(&self) -> usize {
        self.buffer.as_ref().map(|b| b.pixels.as_raw().len()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
//  Interaction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DragMode {
    #[default]
    None,
    Marquee,
    Move,
    Scale,
    Rotate,
    Pivot,
}

/// What a gesture needs from the moment it started, so deltas are never
/// derived from state the gesture itself is mutating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragSnapshot {
    Marquee {
        origin: Pos2,
        mode: SelectionMode,
    },
    Move {
        pointer: Pos2,
        position: Pos2,
    },
    Scale {
        handle: Compass,
        center: Pos2,
        size: Vec2,
        angle_deg: f32,
    },
    Rotate {
        /// Pivot frozen for the whole gesture.
        fixed_pivot: Pos2,
        start_bearing: f32,
        center: Pos2,
    },
    Pivot {
        pivot: Pivot,
    },
}

impl DragSnapshot {
    pub fn mode(&self) -> DragMode {
        match self {
            DragSnapshot::Marquee { .. } => DragMode::Marquee,
            DragSnapshot::Move { .. } => DragMode::Move,
            DragSnapshot::Scale { .. } => DragMode::Scale,
            DragSnapshot::Rotate { .. } => DragMode::Rotate,
            DragSnapshot::Pivot { .. } => DragMode::Pivot,
        }
    }
}

/// Transient per-gesture state.
#[derive(Clone, Debug, Default)]
pub struct InteractionState {
    pub drag: DragMode,
    pub start: Option<DragSnapshot>,
    /// State to restore if the gesture is aborted.
    pub revert: Option<TransformSnapshot>,
    /// Last pointer position in document space.
    pub pointer: Pos2,
}

impl InteractionState {
    pub fn begin(&mut self, start: DragSnapshot, revert: Option<TransformSnapshot>, pointer: Pos2) {
        self.drag = start.mode();
        self.start = Some(start);
        self.revert = revert;
        self.pointer = pointer;
    }

    pub fn reset(&mut self) {
        *self = Self { pointer: self.pointer, ..Self::default() };
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != DragMode::None
    }

    /// Scale / rotate / pivot drags suppress the animated outline.
    pub fn is_transforming(&self) -> bool {
        matches!(self.drag, DragMode::Scale | DragMode::Rotate | DragMode::Pivot | DragMode::Move)
    }
}

// ---------------------------------------------------------------------------
//  Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Selection {
    state: SelectionState,
    region: Option<SelectionRegion>,
    floating: Option<FloatingBuffer>,
    transform: TransformState,
    preview: ResampledCache,
    changed: bool,
    revision: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    // --- queries -----------------------------------------------------------

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.region.is_some() || self.floating.is_some()
    }

    pub fn is_floating(&self) -> bool {
        self.floating.is_some()
    }

    pub fn region(&self) -> Option<&SelectionRegion> {
        self.region.as_ref()
    }

    pub fn floating(&self) -> Option<&FloatingBuffer> {
        self.floating.as_ref()
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn preview(&self) -> &ResampledCache {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut ResampledCache {
        &mut self.preview
    }

    /// Bumped whenever the region or the raw buffer pixels change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Read and reset the change flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Document-space size of the (unrotated) selection box.
    pub fn scaled_size(&self) -> Vec2 {
        if let Some(f) = &self.floating {
            Vec2::new(f.orig_w as f32 * self.transform.scale_x, f.orig_h as f32 * self.transform.scale_y)
        } else if let Some(r) = &self.region {
            let b = r.bounds();
            Vec2::new(b.w as f32, b.h as f32)
        } else {
            Vec2::ZERO
        }
    }

    /// Top-left of the unrotated box.
    pub fn position(&self) -> Pos2 {
        if let Some(f) = &self.floating {
            f.position
        } else if let Some(r) = &self.region {
            let b = r.bounds();
            Pos2::new(b.x as f32, b.y as f32)
        } else {
            Pos2::ZERO
        }
    }

    pub fn center(&self) -> Pos2 {
        self.position() + self.scaled_size() / 2.0
    }

    /// Pivot in document space.  A custom offset is rotated with the object
    /// so the pivot stays glued to it rather than to the canvas.
    pub fn pivot_position(&self) -> Pos2 {
        let half = self.scaled_size() / 2.0;
        let offset = self.transform.pivot.local_offset(half);
        self.center() + rotate_vec(offset, self.transform.total_angle_rad())
    }

    /// Cache key for the current transform and the given filters.
    pub fn cache_key(&self, scale_filter: ScaleFilter, rotation_filter: RotationFilter) -> Option<CacheKey> {
        let f = self.floating.as_ref()?;
        Some(CacheKey {
            scale_x: self.transform.scale_x,
            scale_y: self.transform.scale_y,
            angle_deg: self.transform.total_angle_deg(),
            scale_filter,
            rotation_filter,
            generation: f.generation,
        })
    }

    /// Resampled pixels for the current transform, rebuilt only when stale.
    /// `None` when nothing floats or the transform is identity.
    pub fn ensure_preview(
        &mut self,
        scale_filter: ScaleFilter,
        rotation_filter: RotationFilter,
    ) -> Option<&RgbaImage> {
        if !self.transform.needs_resample() {
            return None;
        }
        let key = self.cache_key(scale_filter, rotation_filter)?;
        let f = self.floating.as_ref()?;
        Some(self.preview.ensure(&f.pixels, key))
    }

    // --- lifecycle ---------------------------------------------------------

    /// Reset everything: no selection, buffer released, identity transform.
    pub fn clear(&mut self) {
        if self.state == SelectionState::None && self.region.is_none() && self.floating.is_none() {
            return;
        }
        self.state = SelectionState::None;
        self.region = None;
        self.floating = None;
        self.transform = TransformState::default();
        self.preview.clear();
        self.revision += 1;
        self.changed = true;
    }

    /// Arm a static (non-floating) selection.  Ignored while floating; the
    /// caller must commit or cancel the buffer first.
    pub fn set_region(&mut self, region: Option<SelectionRegion>) -> bool {
        if self.floating.is_some() {
            crate::log_warn!("set_region ignored: floating buffer still unresolved");
            return false;
        }
        match region {
            None => self.clear(),
            Some(r) => {
                if self.region.as_ref() == Some(&r) {
                    return true;
                }
                self.region = Some(r);
                self.revision += 1;
                self.state = SelectionState::Armed;
                self.transform = TransformState::default();
                self.changed = true;
            }
        }
        true
    }

    /// Convert to a floating selection holding `buffer`.
    pub fn float(&mut self, mut buffer: FloatingBuffer) {
        self.revision += 1;
        buffer.generation = self.revision;
        let link = self.transform.link_scale;
        self.transform = TransformState { link_scale: link, ..TransformState::default() };
        self.region = None;
        self.floating = Some(buffer);
        self.state = SelectionState::Armed;
        self.preview.clear();
        self.changed = true;
    }

    /// Detach the floating buffer (for commit or cancel).  The selection
    /// returns to `None`; the caller decides what region, if any, to re-arm.
    pub fn take_floating(&mut self) -> Option<(FloatingBuffer, TransformState)> {
        let buffer = self.floating.take()?;
        let transform = self.transform;
        self.clear();
        self.changed = true;
        Some((buffer, transform))
    }

    // --- floating mutators -------------------------------------------------

    pub fn set_position(&mut self, position: Pos2) {
        let Some(f) = self.floating.as_mut() else { return };
        if (f.position - position).length() < EPS {
            return;
        }
        f.position = position;
        self.changed = true;
    }

    /// Move so the box centre lands on `center`.
    pub fn set_center(&mut self, center: Pos2) {
        let size = self.scaled_size();
        self.set_position(center - size / 2.0);
    }

    pub fn set_orig_center(&mut self, center: Pos2) {
        let Some(f) = self.floating.as_mut() else { return };
        if (f.orig_center - center).length() < EPS {
            return;
        }
        f.orig_center = center;
        self.changed = true;
    }

    /// Set both scale factors, clamped to `MIN_SCALE`.
    pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        if self.floating.is_none() {
            return;
        }
        let sx = if scale_x.is_finite() { scale_x.max(MIN_SCALE) } else { 1.0 };
        let sy = if scale_y.is_finite() { scale_y.max(MIN_SCALE) } else { 1.0 };
        if (self.transform.scale_x - sx).abs() < EPS && (self.transform.scale_y - sy).abs() < EPS {
            return;
        }
        self.transform.scale_x = sx;
        self.transform.scale_y = sy;
        self.changed = true;
    }

    pub fn set_link_scale(&mut self, link: bool) {
        if self.transform.link_scale != link {
            self.transform.link_scale = link;
            self.changed = true;
        }
    }

    /// In-progress drag rotation (not normalised; it is a delta).
    pub fn set_drag_angle(&mut self, deg: f32) {
        if self.floating.is_none() || (self.transform.angle_deg - deg).abs() < EPS {
            return;
        }
        self.transform.angle_deg = deg;
        self.changed = true;
    }

    /// Committed rotation, stored modulo 360.
    pub fn set_cumulative_angle(&mut self, deg: f32) {
        if self.floating.is_none() {
            return;
        }
        let d = normalize_degrees(deg);
        if (self.transform.cumulative_angle_deg - d).abs() < EPS {
            return;
        }
        self.transform.cumulative_angle_deg = d;
        self.changed = true;
    }

    /// Fold the in-progress drag angle into the baseline.
    pub fn collapse_angle(&mut self) {
        if self.transform.angle_deg == 0.0 {
            return;
        }
        self.transform.cumulative_angle_deg = self.transform.total_angle_deg();
        self.transform.angle_deg = 0.0;
        self.changed = true;
    }

    pub fn set_pivot(&mut self, pivot: Pivot) {
        let pivot = match pivot {
            Pivot::Snapped(Compass::Center) => Pivot::Center,
            p => p,
        };
        if self.transform.pivot.approx_eq(&pivot) {
            return;
        }
        self.transform.pivot = pivot;
        self.changed = true;
    }

    /// Mirror the raw buffer.  Invalidates any resampled preview.
    pub fn flip_buffer(&mut self, horizontal: bool) {
        let Some(f) = self.floating.as_mut() else { return };
        if horizontal {
            imageops::flip_horizontal_in_place(&mut f.pixels);
        } else {
            imageops::flip_vertical_in_place(&mut f.pixels);
        }
        self.revision += 1;
        f.generation = self.revision;
        self.preview.clear();
        self.changed = true;
    }

    /// Swap in new raw pixels, resetting the original dimensions to match.
    pub fn replace_buffer(&mut self, pixels: RgbaImage) {
        let Some(f) = self.floating.as_mut() else { return };
        f.orig_w = pixels.width().max(1);
        f.orig_h = pixels.height().max(1);
        f.pixels = pixels;
        self.revision += 1;
        f.generation = self.revision;
        self.preview.clear();
        self.changed = true;
    }

    // --- snapshots ---------------------------------------------------------

    /// Copy of the floating transform; `include_buffer` clones the pixels.
    pub fn capture_snapshot(&self, include_buffer: bool) -> Option<TransformSnapshot> {
        let f = self.floating.as_ref()?;
        Some(TransformSnapshot {
            position: f.position,
            scale_x: self.transform.scale_x,
            scale_y: self.transform.scale_y,
            angle_deg: self.transform.total_angle_deg(),
            pivot: self.transform.pivot,
            orig_center: f.orig_center,
            buffer: include_buffer.then(|| BufferSnapshot {
                pixels: f.pixels.clone(),
                orig_w: f.orig_w,
                orig_h: f.orig_h,
            }),
        })
    }

    /// Restore a snapshot onto the current floating buffer.  Dimensions of a
    /// carried buffer are trusted as-is.
    pub fn apply_snapshot(&mut self, snap: &TransformSnapshot) {
        if self.floating.is_none() {
            crate::log_warn!("apply_snapshot ignored: no floating buffer");
            return;
        }
        if let Some(b) = &snap.buffer {
            if let Some(f) = self.floating.as_ref()
                && (b.pixels.width() != f.pixels.width() || b.pixels.height() != f.pixels.height())
            {
                crate::log_warn!(
                    "apply_snapshot: buffer {}x{} replaces {}x{}",
                    b.pixels.width(),
                    b.pixels.height(),
                    f.pixels.width(),
                    f.pixels.height()
                );
            }
            self.replace_buffer(b.pixels.clone());
            if let Some(f) = self.floating.as_mut() {
                f.orig_w = b.orig_w;
                f.orig_h = b.orig_h;
            }
        }
        self.set_scale(snap.scale_x, snap.scale_y);
        self.transform.angle_deg = 0.0;
        self.set_cumulative_angle(snap.angle_deg);
        self.set_pivot(snap.pivot);
        self.set_position(snap.position);
        self.set_orig_center(snap.orig_center);
        self.changed = true;
    }

    /// Back to identity scale/rotation about the current centre.
    pub fn reset_transform(&mut self) {
        if self.floating.is_none() {
            return;
        }
        let center = self.center();
        self.set_scale(1.0, 1.0);
        self.transform.angle_deg = 0.0;
        self.set_cumulative_angle(0.0);
        self.set_pivot(Pivot::Center);
        self.set_center(center);
        self.set_orig_center(center);
    }
}
