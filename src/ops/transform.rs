// ============================================================================
// TRANSFORM OPERATIONS — pointer deltas → scale / rotation / pivot / flip
// ============================================================================
//
// Stateless functions over `&mut Selection` + `&mut InteractionState`.  Each
// gesture has a `begin_*` that freezes what it needs into a `DragSnapshot`
// and a `drag_*` that derives the new state from that snapshot alone, never
// from state the gesture itself has been mutating.

use egui::{Pos2, Vec2};

use crate::geometry::{bearing, rotate_around, rotate_vec, wrap_radians};
use crate::ops::handles::SelectionFrame;
use crate::selection::{
    Compass, DragMode, DragSnapshot, InteractionState, MAX_SCALED_DIM, MIN_SCALE, Pivot, Selection,
};
use crate::settings::TransformSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

/// Which axis a flip mirrors across.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlipAxis {
    /// The canvas's own axis.  Also negates the rotation so the visual
    /// rotation direction is preserved.
    #[default]
    Global,
    /// The object's own (rotated) axis.  Buffer mirror only.
    Local,
}

impl FlipDirection {
    pub fn label(&self) -> &'static str {
        match self {
            FlipDirection::Horizontal => "Flip Horizontal",
            FlipDirection::Vertical => "Flip Vertical",
        }
    }
}

impl FlipAxis {
    pub fn key(&self) -> &'static str {
        match self {
            FlipAxis::Global => "global",
            FlipAxis::Local => "local",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Some(FlipAxis::Global),
            "local" => Some(FlipAxis::Local),
            _ => None,
        }
    }
}

/// Round a scale factor to whole percent, never below `min`.
pub fn snap_percent(scale: f32, min: f32) -> f32 {
    let min = min.max(MIN_SCALE);
    if !scale.is_finite() {
        return 1.0;
    }
    ((scale * 100.0).round() / 100.0).max(min)
}

/// Whole-percent scale range for an axis `orig` pixels long.  The scaled
/// axis never drops under 1 px nor grows past `MAX_SCALED_DIM`.
pub fn scale_limits(orig: u32, min: f32) -> (f32, f32) {
    let orig = orig.max(1) as f32;
    let lo = ((100.0 / orig).ceil() / 100.0).max(min.max(MIN_SCALE));
    let hi = ((MAX_SCALED_DIM as f32 * 100.0 / orig).floor() / 100.0).max(lo);
    (lo, hi)
}

/// Linked axes share the tighter of the two ranges.
fn axis_limits(orig_w: u32, orig_h: u32, link: bool, min: f32) -> ((f32, f32), (f32, f32)) {
    let (x, y) = (scale_limits(orig_w, min), scale_limits(orig_h, min));
    if link {
        let lo = x.0.max(y.0);
        let both = (lo, x.1.min(y.1).max(lo));
        (both, both)
    } else {
        (x, y)
    }
}

fn snap_within(scale: f32, (lo, hi): (f32, f32)) -> f32 {
    snap_percent(scale, lo).min(hi)
}

// ---------------------------------------------------------------------------
//  Shared gesture plumbing
// ---------------------------------------------------------------------------

/// Abort the current gesture, restoring the drag-start state.
pub fn cancel_drag(sel: &mut Selection, ix: &mut InteractionState) {
    if let Some(snap) = ix.revert.take() {
        sel.apply_snapshot(&snap);
    }
    ix.reset();
}

/// Finish the current gesture.  Rotation collapses into the baseline.
pub fn end_drag(sel: &mut Selection, ix: &mut InteractionState) {
    if ix.drag == DragMode::Rotate {
        end_rotate(sel);
    }
    ix.reset();
}

/// Free pivots scale with the object; snapped ones follow automatically.
fn rescale_free_pivot(sel: &mut Selection, old: (f32, f32), new: (f32, f32)) {
    if let Pivot::Free(v) = sel.transform().pivot {
        let scaled = Vec2::new(v.x * new.0 / old.0, v.y * new.1 / old.1);
        sel.set_pivot(Pivot::Free(scaled));
    }
}

// ---------------------------------------------------------------------------
//  Move
// ---------------------------------------------------------------------------

pub fn begin_move(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2) {
    let Some(f) = sel.floating() else { return };
    let start = DragSnapshot::Move { pointer, position: f.position };
    ix.begin(start, sel.capture_snapshot(false), pointer);
}

pub fn drag_move(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2) {
    let Some(DragSnapshot::Move { pointer: start, position }) = ix.start else { return };
    ix.pointer = pointer;
    // Whole-pixel moves keep pixel art on the grid.
    let delta = pointer - start;
    let delta = Vec2::new(delta.x.round(), delta.y.round());
    sel.set_position(position + delta);
    let c = sel.center();
    sel.set_orig_center(c);
}

/// Keyboard nudge by whole pixels.
pub fn nudge(sel: &mut Selection, dx: i32, dy: i32) {
    let Some(f) = sel.floating() else { return };
    let p = f.position + Vec2::new(dx as f32, dy as f32);
    sel.set_position(p);
    let c = sel.center();
    sel.set_orig_center(c);
}

// ---------------------------------------------------------------------------
//  Scale
// ---------------------------------------------------------------------------

pub fn begin_scale(sel: &mut Selection, ix: &mut InteractionState, handle: Compass, pointer: Pos2) {
    if !sel.is_floating() || handle == Compass::Center {
        return;
    }
    let revert = sel.capture_snapshot(true);
    let center = sel.center();
    sel.set_orig_center(center);
    let start = DragSnapshot::Scale {
        handle,
        center,
        size: sel.scaled_size(),
        angle_deg: sel.transform().total_angle_deg(),
    };
    ix.begin(start, revert, pointer);
}

/// Anchor-preserving scale: the edges the handle does not control stay put
/// in the selection's local frame.
pub fn drag_scale(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2, settings: &TransformSettings) {
    let Some(DragSnapshot::Scale { handle, center, size, angle_deg }) = ix.start else { return };
    let Some(f) = sel.floating() else { return };
    ix.pointer = pointer;
    let (ow, oh) = (f.orig_w as f32, f.orig_h as f32);
    let (lim_x, lim_y) = axis_limits(f.orig_w, f.orig_h, sel.transform().link_scale, settings.min_scale);
    let angle = angle_deg.to_radians();
    let local = rotate_vec(pointer - center, -angle);
    let half = size / 2.0;
    let u = handle.unit();

    let (mut l, mut r, mut t, mut b) = (-half.x, half.x, -half.y, half.y);
    if u.x < 0.0 {
        l = local.x.min(r - 1.0);
    } else if u.x > 0.0 {
        r = local.x.max(l + 1.0);
    }
    if u.y < 0.0 {
        t = local.y.min(b - 1.0);
    } else if u.y > 0.0 {
        b = local.y.max(t + 1.0);
    }

    // Ratio against the original size, not last frame's.
    let mut sx = (r - l) / ow;
    let mut sy = (b - t) / oh;
    if sel.transform().link_scale {
        let ratio = if handle.is_corner() {
            sx.max(sy)
        } else if u.x != 0.0 {
            sx
        } else {
            sy
        };
        sx = ratio;
        sy = ratio;
    }
    let sx = snap_within(sx, lim_x);
    let sy = snap_within(sy, lim_y);

    // Rebuild edges from the snapped ratio so geometry matches the readout.
    let (w, h) = (ow * sx, oh * sy);
    if u.x < 0.0 {
        l = r - w;
    } else if u.x > 0.0 {
        r = l + w;
    } else {
        l = -w / 2.0;
        r = w / 2.0;
    }
    if u.y < 0.0 {
        t = b - h;
    } else if u.y > 0.0 {
        b = t + h;
    } else {
        t = -h / 2.0;
        b = h / 2.0;
    }

    let local_center = Vec2::new((l + r) / 2.0, (t + b) / 2.0);
    let new_center = center + rotate_vec(local_center, angle);
    let old = (sel.transform().scale_x, sel.transform().scale_y);
    sel.set_scale(sx, sy);
    rescale_free_pivot(sel, old, (sx, sy));
    sel.set_center(new_center);
}

/// Programmatic scale in percent, anchored on the pivot.  Idempotent.
pub fn set_scale(sel: &mut Selection, pct_x: f32, pct_y: f32, link: bool, settings: &TransformSettings) {
    let Some(f) = sel.floating() else { return };
    let (lim_x, lim_y) = axis_limits(f.orig_w, f.orig_h, link, settings.min_scale);
    let sx = snap_within(pct_x / 100.0, lim_x);
    let sy = if link { sx } else { snap_within(pct_y / 100.0, lim_y) };
    sel.set_link_scale(link);

    let xf = *sel.transform();
    let angle = xf.total_angle_rad();
    let pivot = sel.pivot_position();
    let old_half = sel.scaled_size() / 2.0;
    let old_offset = xf.pivot.local_offset(old_half);
    let new_offset = Vec2::new(old_offset.x * sx / xf.scale_x, old_offset.y * sy / xf.scale_y);

    sel.set_scale(sx, sy);
    rescale_free_pivot(sel, (xf.scale_x, xf.scale_y), (sx, sy));
    let new_center = pivot - rotate_vec(new_offset, angle);
    sel.set_center(new_center);
    sel.set_orig_center(new_center);
    crate::log_info!("set_scale {:.0}% x {:.0}% (link {})", sx * 100.0, sy * 100.0, link);
}

// ---------------------------------------------------------------------------
//  Rotation
// ---------------------------------------------------------------------------

pub fn begin_rotate(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2) {
    if !sel.is_floating() {
        return;
    }
    sel.collapse_angle();
    let revert = sel.capture_snapshot(true);
    let fixed_pivot = sel.pivot_position();
    let start = DragSnapshot::Rotate {
        fixed_pivot,
        start_bearing: bearing(fixed_pivot, pointer),
        center: sel.center(),
    };
    ix.begin(start, revert, pointer);
}

/// Rotate by the pointer's bearing change around the frozen pivot.
/// `snap_deg` constrains the total angle to multiples of the step.
pub fn drag_rotate(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2, snap_deg: Option<f32>) {
    let Some(DragSnapshot::Rotate { fixed_pivot, start_bearing, center }) = ix.start else { return };
    ix.pointer = pointer;
    if (pointer - fixed_pivot).length() < 1e-3 {
        return;
    }
    let mut delta = wrap_radians(bearing(fixed_pivot, pointer) - start_bearing).to_degrees();
    if let Some(step) = snap_deg.filter(|s| *s > 0.0) {
        let base = sel.transform().cumulative_angle_deg;
        let total = ((base + delta) / step).round() * step;
        delta = total - base;
    }
    sel.set_drag_angle(delta);
    sel.set_center(rotate_around(center, fixed_pivot, delta.to_radians()));
}

/// Fold the drag rotation into the committed angle.
pub fn end_rotate(sel: &mut Selection) {
    sel.collapse_angle();
    let c = sel.center();
    sel.set_orig_center(c);
}

/// Programmatic absolute rotation about the pivot.
pub fn set_rotation(sel: &mut Selection, degrees: f32) {
    if !sel.is_floating() {
        return;
    }
    sel.collapse_angle();
    let old = sel.transform().cumulative_angle_deg;
    let pivot = sel.pivot_position();
    let center = sel.center();
    sel.set_cumulative_angle(degrees);
    let applied = sel.transform().cumulative_angle_deg - old;
    let new_center = rotate_around(center, pivot, applied.to_radians());
    sel.set_center(new_center);
    sel.set_orig_center(new_center);
}

// ---------------------------------------------------------------------------
//  Pivot
// ---------------------------------------------------------------------------

pub fn begin_pivot(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2) {
    if !sel.is_floating() {
        return;
    }
    let start = DragSnapshot::Pivot { pivot: sel.transform().pivot };
    ix.begin(start, sel.capture_snapshot(false), pointer);
}

/// Nearest of the nine canonical positions within the snap radius, or a
/// free offset when none qualifies.
pub fn resolve_pivot(frame: &SelectionFrame, pointer: Pos2, snap_radius: f32) -> Pivot {
    let local = frame.to_local(pointer);
    let nearest = Compass::ALL
        .iter()
        .map(|c| (*c, (local - c.offset(frame.half)).length()))
        .filter(|(_, d)| *d <= snap_radius)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    match nearest {
        Some((Compass::Center, _)) => Pivot::Center,
        Some((c, _)) => Pivot::Snapped(c),
        None => Pivot::Free(local),
    }
}

pub fn drag_pivot(sel: &mut Selection, ix: &mut InteractionState, pointer: Pos2, settings: &TransformSettings) {
    if ix.drag != DragMode::Pivot {
        return;
    }
    ix.pointer = pointer;
    let Some(frame) = SelectionFrame::of(sel) else { return };
    sel.set_pivot(resolve_pivot(&frame, pointer, settings.pivot_snap_radius));
}

pub fn reset_pivot(sel: &mut Selection) {
    sel.set_pivot(Pivot::Center);
}

/// Scale 100%, rotation 0, pivot centred; the centre stays put.
pub fn reset_transform(sel: &mut Selection) {
    sel.reset_transform();
}

// ---------------------------------------------------------------------------
//  Flip
// ---------------------------------------------------------------------------

pub fn flip(sel: &mut Selection, direction: FlipDirection, axis: FlipAxis) {
    if !sel.is_floating() {
        return;
    }
    sel.collapse_angle();
    let horizontal = direction == FlipDirection::Horizontal;
    sel.flip_buffer(horizontal);

    let pivot = match sel.transform().pivot {
        Pivot::Center => Pivot::Center,
        Pivot::Snapped(c) if horizontal => Pivot::Snapped(c.mirrored_h()),
        Pivot::Snapped(c) => Pivot::Snapped(c.mirrored_v()),
        Pivot::Free(v) if horizontal => Pivot::Free(Vec2::new(-v.x, v.y)),
        Pivot::Free(v) => Pivot::Free(Vec2::new(v.x, -v.y)),
    };
    sel.set_pivot(pivot);

    if axis == FlipAxis::Global {
        let a = sel.transform().cumulative_angle_deg;
        sel.set_cumulative_angle(-a);
    }
    crate::log_info!("{} ({})", direction.label(), axis.key());
}
