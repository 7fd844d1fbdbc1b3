// ============================================================================
// VIEWPORT — document ↔ view coordinate mapping
// ============================================================================

use egui::{Pos2, Rect, Vec2};

/// Zoom/pan mapping supplied by the host canvas each frame.
///
/// `dest_rect` is where the whole document lands in view space; only its
/// `min` corner matters for the mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub dest_rect: Rect,
}

impl Default for Viewport {
    /// Identity mapping: used when no zoom provider is attached.
    fn default() -> Self {
        Self {
            scale: 1.0,
            dest_rect: Rect::from_min_size(Pos2::ZERO, Vec2::ZERO),
        }
    }
}

impl Viewport {
    pub fn new(scale: f32, dest_rect: Rect) -> Self {
        Self { scale, dest_rect }
    }

    /// Zoom factor, falling back to 1.0 for degenerate values.
    pub fn zoom(&self) -> f32 {
        if self.scale.is_finite() && self.scale > 0.0 { self.scale } else { 1.0 }
    }

    pub fn origin(&self) -> Pos2 {
        self.dest_rect.min
    }

    /// `(doc × zoom) + viewOrigin`
    pub fn doc_to_view(&self, p: Pos2) -> Pos2 {
        let z = self.zoom();
        Pos2::new(self.origin().x + p.x * z, self.origin().y + p.y * z)
    }

    pub fn view_to_doc(&self, p: Pos2) -> Pos2 {
        let z = self.zoom();
        Pos2::new((p.x - self.origin().x) / z, (p.y - self.origin().y) / z)
    }

    pub fn doc_len_to_view(&self, len: f32) -> f32 {
        len * self.zoom()
    }

    pub fn view_len_to_doc(&self, len: f32) -> f32 {
        len / self.zoom()
    }

    /// Map a document-space rect into view space.
    pub fn doc_rect_to_view(&self, r: Rect) -> Rect {
        Rect::from_min_max(self.doc_to_view(r.min), self.doc_to_view(r.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_identity() {
        let vp = Viewport::default();
        let p = Pos2::new(12.5, -3.0);
        assert_eq!(vp.doc_to_view(p), p);
        assert_eq!(vp.view_to_doc(p), p);
    }

    #[test]
    fn maps_with_zoom_and_origin() {
        let vp = Viewport::new(4.0, Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(400.0, 400.0)));
        assert_eq!(vp.doc_to_view(Pos2::new(10.0, 5.0)), Pos2::new(140.0, 70.0));
        assert_eq!(vp.view_to_doc(Pos2::new(140.0, 70.0)), Pos2::new(10.0, 5.0));
    }

    #[test]
    fn degenerate_zoom_falls_back_to_one() {
        let vp = Viewport::new(0.0, Rect::from_min_size(Pos2::ZERO, Vec2::ZERO));
        assert_eq!(vp.zoom(), 1.0);
        let vp = Viewport::new(f32::NAN, Rect::from_min_size(Pos2::ZERO, Vec2::ZERO));
        assert_eq!(vp.view_to_doc(Pos2::new(3.0, 4.0)), Pos2::new(3.0, 4.0));
    }
}
