use egui::{Pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

use pixlift::document::{LayerStore, RasterLayer};
use pixlift::geometry::{PixelRect, rotate_around};
use pixlift::history::{HistoryLog, HistoryRecord};
use pixlift::ops::handles::HandleLayout;
use pixlift::ops::hit_test::{Hit, hit_test};
use pixlift::ops::transform::{self, FlipAxis, FlipDirection};
use pixlift::render::alpha::{premultiply_pixel, unpremultiply_pixel};
use pixlift::render::outline::AntsPhase;
use pixlift::render::renderer::SelectionRenderer;
use pixlift::render::surface::{DrawCommand, RecordingSurface};
use pixlift::selection::{Compass, FloatingBuffer, InteractionState, Selection, SelectionRegion};
use pixlift::settings::TransformSettings;
use pixlift::tool::{LiftMode, SelectionTool, ToolContext};
use pixlift::viewport::Viewport;

const RED: Rgba<u8> = Rgba([220, 30, 30, 255]);
const BLUE: Rgba<u8> = Rgba([20, 40, 200, 255]);

fn close(a: Pos2, b: Pos2, eps: f32) -> bool {
    (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps
}

fn floating(w: u32, h: u32, at: Pos2) -> Selection {
    let mut sel = Selection::new();
    sel.float(FloatingBuffer::new(RgbaImage::from_pixel(w, h, RED), at));
    sel
}

#[test]
fn lift_scale_commit_clips_to_canvas() {
    let mut img = RgbaImage::from_pixel(64, 64, BLUE);
    for y in 10..60 {
        for x in 10..60 {
            img.put_pixel(x, y, RED);
        }
    }
    let mut layer = RasterLayer::from_image(img);
    let mut history = HistoryLog::default();
    let vp = Viewport::default();
    let mut tool = SelectionTool::default();

    {
        let mut ctx = ToolContext { viewport: &vp, layer: &mut layer, history: &mut history };
        tool.selection.set_region(Some(SelectionRegion::Rect(PixelRect::new(10, 10, 50, 50))));
        assert!(tool.lift(LiftMode::Cut, &mut ctx));

        tool.set_scale_percent(200.0, 200.0, true, ctx.history);
        assert_eq!(tool.selection.scaled_size(), Vec2::new(100.0, 100.0));
        assert_eq!(tool.selection.center(), Pos2::new(35.0, 35.0));
        assert_eq!(tool.selection.position(), Pos2::new(-15.0, -15.0));

        let placed = tool.commit(&mut ctx);
        assert_eq!(placed, Some(PixelRect::new(-15, -15, 100, 100)));
    }

    assert!(!tool.selection.is_active());
    assert_eq!(layer.width(), 64);
    assert!(layer.pixels.pixels().all(|p| *p == RED));
    match history.last() {
        Some(HistoryRecord::Pixels { after, .. }) => assert_eq!(after.rect, PixelRect::new(0, 0, 64, 64)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn se_drag_never_moves_nw_corner() {
    let settings = TransformSettings::default();
    for target in [(150.0, 150.0), (120.0, 180.0), (40.0, 60.0), (300.0, 90.0), (-50.0, -50.0)] {
        let mut sel = floating(100, 100, Pos2::ZERO);
        let mut ix = InteractionState::default();
        transform::begin_scale(&mut sel, &mut ix, Compass::SE, Pos2::new(100.0, 100.0));
        transform::drag_scale(&mut sel, &mut ix, Pos2::new(target.0, target.1), &settings);
        assert!(close(sel.position(), Pos2::ZERO, 1e-3), "{target:?} -> {:?}", sel.position());
        transform::end_drag(&mut sel, &mut ix);
    }
}

#[test]
fn renderer_and_hit_test_agree_on_handles() {
    let settings = TransformSettings::default();
    let vp = Viewport::new(2.0, Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::splat(800.0)));
    for deg in [0.0f32, 45.0, 90.0, 137.0] {
        let mut sel = floating(40, 40, Pos2::new(100.0, 100.0));
        sel.set_cumulative_angle(deg);

        let mut renderer = SelectionRenderer::new();
        let mut surface = RecordingSurface::new();
        renderer.draw(&mut sel, &InteractionState::default(), None, &vp, &settings, &mut surface);

        // Scale handles are the only polygons, drawn NW, N, NE, ...
        let quads: Vec<&Vec<Pos2>> = surface
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polygon { points, .. } => Some(points),
                _ => None,
            })
            .collect();
        assert_eq!(quads.len(), 8);
        let drawn = quads[2].iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2()) / 4.0;
        let drawn = drawn.to_pos2();

        let layout = HandleLayout::compute(&sel, &vp, &settings).expect("layout");
        let ne = layout.scale_handle(Compass::NE).expect("ne");
        assert!(close(drawn, ne, 1e-3), "{deg}°: drawn {drawn:?} vs hit {ne:?}");
        assert_eq!(hit_test(&sel, drawn, &vp, &settings), Some(Hit::ScaleHandle(Compass::NE)), "{deg}°");
    }
}

#[test]
fn set_scale_twice_is_idempotent() {
    let settings = TransformSettings::default();
    let mut sel = floating(30, 20, Pos2::new(5.0, 7.0));
    transform::set_scale(&mut sel, 150.0, 150.0, true, &settings);
    let once = (sel.position(), sel.scaled_size(), *sel.transform());
    transform::set_scale(&mut sel, 150.0, 150.0, true, &settings);
    assert_eq!((sel.position(), sel.scaled_size(), *sel.transform()), once);
    assert_eq!(sel.scaled_size(), Vec2::new(45.0, 30.0));
}

#[test]
fn double_flip_restores_pixels_and_angle() {
    let mut img = RgbaImage::new(5, 3);
    for (x, y, p) in img.enumerate_pixels_mut() {
        *p = Rgba([x as u8 * 40, y as u8 * 80, 7, 255]);
    }
    let mut sel = Selection::new();
    sel.float(FloatingBuffer::new(img.clone(), Pos2::ZERO));
    sel.set_cumulative_angle(30.0);

    transform::flip(&mut sel, FlipDirection::Horizontal, FlipAxis::Global);
    assert_eq!(sel.transform().cumulative_angle_deg, 330.0);
    transform::flip(&mut sel, FlipDirection::Horizontal, FlipAxis::Global);

    assert_eq!(sel.floating().map(|f| &f.pixels), Some(&img));
    assert!((sel.transform().cumulative_angle_deg - 30.0).abs() < 1e-3);
}

#[test]
fn premultiply_round_trip_within_one() {
    for a in [128u8, 200, 255] {
        for c in (0..=255u16).step_by(5) {
            let c = c as u8;
            let back = unpremultiply_pixel(premultiply_pixel([c, 255 - c, c / 2, a]));
            for (orig, got) in [c, 255 - c, c / 2].into_iter().zip(back) {
                assert!((orig as i16 - got as i16).abs() <= 1, "alpha {a}: {orig} -> {got}");
            }
            assert_eq!(back[3], a);
        }
    }
    assert_eq!(premultiply_pixel([9, 9, 9, 0]), [0, 0, 0, 0]);
}

#[test]
fn premultiply_round_trip_error_bounded_at_every_alpha() {
    // Premultiplied channels carry only alpha + 1 distinct levels, so the
    // worst case is about half a step of 255 / alpha plus the final rounding.
    for a in 1..=255u16 {
        let bound = 129.0 / a as f32 + 0.5;
        for c in 0..=255u16 {
            let c = c as u8;
            let back = unpremultiply_pixel(premultiply_pixel([c, c, c, a as u8]));
            let err = (c as i16 - back[0] as i16).abs() as f32;
            assert!(err <= bound + 1e-3, "alpha {a}: {c} -> {} (bound {bound})", back[0]);
            assert_eq!(back[3], a as u8);
        }
    }
}

#[test]
fn ants_phase_stays_in_period() {
    let settings = TransformSettings::default();
    let period = settings.dash_period();
    let mut phase = AntsPhase::default();
    for frame in 0..10_000 {
        let p = phase.advance(settings.ants_speed, period);
        assert!((0.0..period).contains(&p), "frame {frame}: {p}");
    }
}

#[test]
fn rotate_around_is_exact_and_invertible() {
    let c = Pos2::new(3.0, -4.0);
    let p = Pos2::new(10.5, 2.25);
    assert_eq!(rotate_around(p, c, 0.0), p);
    for deg in [30.0f32, 90.0, 180.0, 270.0, 359.0] {
        let r = deg.to_radians();
        let back = rotate_around(rotate_around(p, c, r), c, -r);
        assert!(close(back, p, 1e-3), "{deg}");
    }
    assert_eq!(rotate_around(Pos2::new(1.0, 0.0), Pos2::ZERO, 90f32.to_radians()), Pos2::new(0.0, 1.0));
}
