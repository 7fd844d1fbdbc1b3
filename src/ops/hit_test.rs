// ============================================================================
// HIT TESTING — view-space pointer → semantic target
// ============================================================================
//
// Pure functions over `&Selection`.  Precedence when areas overlap:
// rotation handles > scale handles > pivot > body.

use egui::{Pos2, Vec2};

use crate::geometry::rotate_vec;
use crate::ops::handles::{HandleLayout, SelectionFrame};
use crate::ops::resample::{RotationFilter, ScaleFilter};
use crate::selection::{Compass, Selection, SelectionState};
use crate::settings::TransformSettings;
use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hit {
    RotateHandle(Compass),
    ScaleHandle(Compass),
    Pivot,
    Body,
}

/// Resolve a view-space pointer against the current selection.
pub fn hit_test(sel: &Selection, pointer: Pos2, viewport: &Viewport, settings: &TransformSettings) -> Option<Hit> {
    if sel.state() != SelectionState::Armed {
        return None;
    }
    let layout = HandleLayout::compute(sel, viewport, settings)?;

    if let Some(c) = hit_rotate_handle(&layout, pointer) {
        return Some(Hit::RotateHandle(c));
    }
    if let Some(c) = hit_scale_handle(&layout, pointer) {
        return Some(Hit::ScaleHandle(c));
    }
    if layout.show_pivot && pointer.distance(layout.pivot) <= layout.pivot_radius {
        return Some(Hit::Pivot);
    }
    if body_contains(sel, viewport.view_to_doc(pointer)) {
        return Some(Hit::Body);
    }
    None
}

pub fn hit_rotate_handle(layout: &HandleLayout, pointer: Pos2) -> Option<Compass> {
    layout
        .rotate
        .iter()
        .find(|(_, p)| pointer.distance(*p) <= layout.rotate_radius)
        .map(|(c, _)| *c)
}

/// Scale handles are tested in their own rotated frame, with a fixed
/// view-pixel padding so they stay grabbable at any zoom.
pub fn hit_scale_handle(layout: &HandleLayout, pointer: Pos2) -> Option<Compass> {
    let reach = layout.handle_half + layout.hit_padding;
    layout
        .scale
        .iter()
        .find(|(_, p)| {
            let local = rotate_vec(pointer - *p, -layout.angle);
            local.x.abs() <= reach && local.y.abs() <= reach
        })
        .map(|(c, _)| *c)
}

/// Document-space containment, consulting whichever representation is
/// authoritative: resampled preview, raw buffer alpha, or region mask.
/// Works for selections partly or wholly off-canvas.
pub fn body_contains(sel: &Selection, doc: Pos2) -> bool {
    let Some(frame) = SelectionFrame::of(sel) else { return false };

    let Some(buf) = sel.floating() else {
        return sel
            .region()
            .is_some_and(|r| r.contains(doc.x.floor() as i32, doc.y.floor() as i32));
    };

    let xf = sel.transform();
    if !xf.needs_resample() {
        let x = (doc.x - buf.position.x).floor() as i64;
        let y = (doc.y - buf.position.y).floor() as i64;
        return buf.alpha_at(x, y) > 0;
    }

    // Filters do not change the footprint enough to matter for picking.
    let key = sel.cache_key(ScaleFilter::Nearest, RotationFilter::Nearest);
    if let Some(img) = key.as_ref().and_then(|k| sel.preview().get_geometry(k)) {
        let origin = frame.center - Vec2::new(img.width() as f32, img.height() as f32) / 2.0;
        let x = (doc.x - origin.x).floor();
        let y = (doc.y - origin.y).floor();
        if x < 0.0 || y < 0.0 || x >= img.width() as f32 || y >= img.height() as f32 {
            return false;
        }
        return img.get_pixel(x as u32, y as u32)[3] > 0;
    }

    // No preview yet: map back into the raw buffer.
    if !frame.contains_local(doc) {
        return false;
    }
    let local = frame.to_local(doc) + frame.half;
    let x = (local.x / xf.scale_x).floor() as i64;
    let y = (local.y / xf.scale_y).floor() as i64;
    buf.alpha_at(x, y) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelRect;
    use crate::selection::{FloatingBuffer, SelectionRegion};
    use egui::Rect;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn floating(w: u32, h: u32, at: Pos2) -> Selection {
        let mut sel = Selection::new();
        sel.float(FloatingBuffer::new(RgbaImage::from_pixel(w, h, Rgba([5, 5, 5, 255])), at));
        sel
    }

    fn settings() -> TransformSettings {
        TransformSettings::default()
    }

    #[test]
    fn nothing_to_hit_without_selection() {
        let sel = Selection::new();
        assert_eq!(hit_test(&sel, Pos2::ZERO, &Viewport::default(), &settings()), None);
    }

    #[test]
    fn handles_and_body() {
        let sel = floating(40, 40, Pos2::new(10.0, 10.0));
        let vp = Viewport::default();
        assert_eq!(hit_test(&sel, Pos2::new(50.0, 50.0), &vp, &settings()), Some(Hit::ScaleHandle(Compass::SE)));
        assert_eq!(hit_test(&sel, Pos2::new(30.0, 10.0), &vp, &settings()), Some(Hit::ScaleHandle(Compass::N)));
        assert_eq!(hit_test(&sel, Pos2::new(30.0, 30.0), &vp, &settings()), Some(Hit::Pivot));
        assert_eq!(hit_test(&sel, Pos2::new(20.0, 35.0), &vp, &settings()), Some(Hit::Body));
        assert_eq!(hit_test(&sel, Pos2::new(200.0, 200.0), &vp, &settings()), None);
    }

    #[test]
    fn rotation_handles_win_over_scale_handles() {
        // A tiny selection zoomed out so every element overlaps.
        let sel = floating(1, 1, Pos2::ZERO);
        let mut s = settings();
        s.rotate_handle_offset = 2.0;
        let hit = hit_test(&sel, Pos2::new(1.0, 1.0), &Viewport::default(), &s);
        assert!(matches!(hit, Some(Hit::RotateHandle(_))), "{hit:?}");
    }

    #[test]
    fn scale_padding_is_zoom_independent() {
        let sel = floating(40, 40, Pos2::ZERO);
        let s = settings();
        let reach = s.handle_size / 2.0 + s.handle_hit_padding - 0.5;
        for zoom in [0.5f32, 1.0, 8.0] {
            let vp = Viewport::new(zoom, Rect::from_min_size(Pos2::ZERO, Vec2::splat(1000.0)));
            let se = vp.doc_to_view(Pos2::new(40.0, 40.0));
            let p = se + Vec2::new(reach, 0.0);
            assert_eq!(hit_test(&sel, p, &vp, &s), Some(Hit::ScaleHandle(Compass::SE)), "zoom {zoom}");
        }
    }

    #[test]
    fn body_respects_buffer_alpha() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([1, 1, 1, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let mut sel = Selection::new();
        sel.float(FloatingBuffer::new(img, Pos2::new(-10.0, -10.0)));
        assert!(!body_contains(&sel, Pos2::new(-9.5, -9.5)));
        assert!(body_contains(&sel, Pos2::new(-8.5, -9.5)));
        assert!(!body_contains(&sel, Pos2::new(-5.5, -9.5)));
    }

    #[test]
    fn body_of_rotated_buffer_without_preview() {
        let mut sel = floating(10, 2, Pos2::new(0.0, 4.0));
        sel.set_cumulative_angle(90.0);
        // Centre (5, 5); rotated box spans x 4..6, y 0..10.
        assert!(body_contains(&sel, Pos2::new(5.0, 0.5)));
        assert!(!body_contains(&sel, Pos2::new(0.5, 5.0)));
    }

    #[test]
    fn body_of_rotated_buffer_uses_preview() {
        let mut sel = floating(10, 2, Pos2::new(0.0, 4.0));
        sel.set_cumulative_angle(90.0);
        assert!(sel.ensure_preview(ScaleFilter::Nearest, RotationFilter::Nearest).is_some());
        assert!(body_contains(&sel, Pos2::new(5.0, 0.5)));
        assert!(!body_contains(&sel, Pos2::new(0.5, 5.0)));
    }

    #[test]
    fn body_of_mask_region() {
        let base = SelectionRegion::Rect(PixelRect::new(0, 0, 4, 4));
        let region = base.combine(PixelRect::new(0, 0, 2, 2), crate::selection::SelectionMode::Subtract);
        let mut sel = Selection::new();
        sel.set_region(region);
        assert!(!body_contains(&sel, Pos2::new(0.5, 0.5)));
        assert!(body_contains(&sel, Pos2::new(3.5, 3.5)));
    }
}
