// ============================================================================
// HANDLE GEOMETRY — shared by the hit tester and the renderer
// ============================================================================
//
// Handles are laid out on the unrotated box in view space and then rotated
// about the view-space centre.  Both consumers call `HandleLayout::compute`,
// so what is drawn is exactly what is clickable.

use egui::{Pos2, Vec2};

use crate::geometry::{rotate_around, rotate_vec};
use crate::selection::{Compass, Selection};
use crate::settings::TransformSettings;
use crate::viewport::Viewport;

/// The selection box in document space: centre, half extents, rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionFrame {
    pub center: Pos2,
    pub half: Vec2,
    /// Radians, clockwise.
    pub angle: f32,
}

impl SelectionFrame {
    /// Frame of the current selection.  Static regions are never rotated.
    pub fn of(sel: &Selection) -> Option<Self> {
        if !sel.is_active() {
            return None;
        }
        let angle = if sel.is_floating() { sel.transform().total_angle_rad() } else { 0.0 };
        Some(Self {
            center: sel.center(),
            half: sel.scaled_size() / 2.0,
            angle,
        })
    }

    /// Document point → offset in the unrotated local frame.
    pub fn to_local(&self, p: Pos2) -> Vec2 {
        rotate_vec(p - self.center, -self.angle)
    }

    /// Local offset → document point.
    pub fn to_global(&self, local: Vec2) -> Pos2 {
        self.center + rotate_vec(local, self.angle)
    }

    /// Position of a compass point in document space.
    pub fn point(&self, c: Compass) -> Pos2 {
        self.to_global(c.offset(self.half))
    }

    /// Rotated corners, clockwise from the top-left.
    pub fn corners(&self) -> [Pos2; 4] {
        [
            self.point(Compass::NW),
            self.point(Compass::NE),
            self.point(Compass::SE),
            self.point(Compass::SW),
        ]
    }

    pub fn contains_local(&self, p: Pos2) -> bool {
        let l = self.to_local(p);
        l.x.abs() <= self.half.x && l.y.abs() <= self.half.y
    }
}

/// View-space positions of every interactive element.
#[derive(Clone, Debug, PartialEq)]
pub struct HandleLayout {
    pub center: Pos2,
    pub angle: f32,
    /// NW, NE, SE, SW.
    pub corners: [Pos2; 4],
    pub scale: [(Compass, Pos2); 8],
    pub rotate: [(Compass, Pos2); 8],
    pub pivot: Pos2,
    pub show_pivot: bool,
    pub handle_half: f32,
    pub hit_padding: f32,
    pub rotate_radius: f32,
    pub pivot_radius: f32,
}

impl HandleLayout {
    pub fn compute(sel: &Selection, viewport: &Viewport, settings: &TransformSettings) -> Option<Self> {
        let frame = SelectionFrame::of(sel)?;
        let pivot = if sel.is_floating() { sel.pivot_position() } else { frame.center };
        let mut layout = Self::from_frame(&frame, pivot, viewport, settings);
        layout.show_pivot = sel.is_floating();
        Some(layout)
    }

    pub fn from_frame(
        frame: &SelectionFrame,
        pivot_doc: Pos2,
        viewport: &Viewport,
        settings: &TransformSettings,
    ) -> Self {
        let center = viewport.doc_to_view(frame.center);
        let half = frame.half * viewport.zoom();
        let angle = frame.angle;
        let place = |c: Compass, push: f32| {
            let u = c.unit();
            let dir = if u == Vec2::ZERO { Vec2::ZERO } else { u.normalized() };
            let local = center + c.offset(half) + dir * push;
            rotate_around(local, center, angle)
        };

        let scale = Compass::HANDLES.map(|c| (c, place(c, 0.0)));
        let rotate = Compass::HANDLES.map(|c| (c, place(c, settings.rotate_handle_offset)));
        let corners = [
            place(Compass::NW, 0.0),
            place(Compass::NE, 0.0),
            place(Compass::SE, 0.0),
            place(Compass::SW, 0.0),
        ];

        Self {
            center,
            angle,
            corners,
            scale,
            rotate,
            pivot: viewport.doc_to_view(pivot_doc),
            show_pivot: true,
            handle_half: settings.handle_size / 2.0,
            hit_padding: settings.handle_hit_padding,
            rotate_radius: settings.rotate_handle_radius,
            pivot_radius: settings.pivot_radius,
        }
    }

    pub fn scale_handle(&self, c: Compass) -> Option<Pos2> {
        self.scale.iter().find(|(h, _)| *h == c).map(|(_, p)| *p)
    }

    pub fn rotate_handle(&self, c: Compass) -> Option<Pos2> {
        self.rotate.iter().find(|(h, _)| *h == c).map(|(_, p)| *p)
    }

    /// Four corners of a scale handle square, rotated with the selection.
    pub fn handle_quad(&self, at: Pos2) -> [Pos2; 4] {
        let h = self.handle_half;
        [(-h, -h), (h, -h), (h, h), (-h, h)].map(|(x, y)| at + rotate_vec(Vec2::new(x, y), self.angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::FloatingBuffer;
    use egui::Rect;
    use image::{Rgba, RgbaImage};

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    fn floating(w: u32, h: u32, at: Pos2) -> Selection {
        let mut sel = Selection::new();
        sel.float(FloatingBuffer::new(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])), at));
        sel
    }

    #[test]
    fn unrotated_layout_sits_on_the_box() {
        let sel = floating(10, 20, Pos2::new(5.0, 5.0));
        let vp = Viewport::new(2.0, Rect::from_min_size(Pos2::new(100.0, 0.0), Vec2::splat(500.0)));
        let l = HandleLayout::compute(&sel, &vp, &TransformSettings::default()).expect("active");
        assert!(close(l.center, Pos2::new(120.0, 30.0)));
        assert_eq!(l.scale_handle(Compass::NW), Some(Pos2::new(110.0, 10.0)));
        assert_eq!(l.scale_handle(Compass::E), Some(Pos2::new(130.0, 30.0)));
        assert_eq!(l.corners[2], Pos2::new(130.0, 50.0));
    }

    #[test]
    fn rotation_handles_sit_outside_scale_handles() {
        let sel = floating(10, 10, Pos2::ZERO);
        let settings = TransformSettings::default();
        let l = HandleLayout::compute(&sel, &Viewport::default(), &settings).expect("active");
        for (c, p) in l.rotate {
            let inner = l.scale_handle(c).expect("handle");
            let d = (p - inner).length();
            assert!((d - settings.rotate_handle_offset).abs() < 1e-3, "{c:?}");
            assert!((p - l.center).length() > (inner - l.center).length());
        }
    }

    #[test]
    fn quarter_turn_moves_ne_to_se() {
        let mut sel = floating(10, 10, Pos2::ZERO);
        sel.set_cumulative_angle(90.0);
        let l = HandleLayout::compute(&sel, &Viewport::default(), &TransformSettings::default()).expect("active");
        assert_eq!(l.scale_handle(Compass::NE), Some(Pos2::new(10.0, 10.0)));
    }

    #[test]
    fn frame_round_trips_local_coordinates() {
        let f = SelectionFrame { center: Pos2::new(3.0, -4.0), half: Vec2::new(5.0, 2.0), angle: 0.7 };
        let p = Pos2::new(9.0, 1.5);
        assert!(close(f.to_global(f.to_local(p)), p));
        assert!(f.contains_local(f.point(Compass::SE) - (f.point(Compass::SE) - f.center) * 0.01));
    }

    #[test]
    fn static_region_has_no_pivot() {
        let mut sel = Selection::new();
        sel.set_region(Some(crate::selection::SelectionRegion::Rect(crate::geometry::PixelRect::new(0, 0, 4, 4))));
        let l = HandleLayout::compute(&sel, &Viewport::default(), &TransformSettings::default()).expect("active");
        assert!(!l.show_pivot);
        assert_eq!(l.angle, 0.0);
    }
}
