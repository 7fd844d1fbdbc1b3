// ============================================================================
// pixlift CLI — headless select / transform / commit via command-line flags
// ============================================================================
//
// Usage examples:
//   pixlift -i sprite.png -o big.png --select 8,8,16,16 --scale 200
//   pixlift -i sheet.png -o out.png --select 0,0,32,32 --rotate 45 --rotate-filter rotsprite
//   pixlift -i in.png -o out.png --select 4,4,10,6 --pivot nw --flip h --move -2,3
//
// Runs the same selection tool the interactive host drives: the region is
// lifted (cut), transformed, and committed with the chosen filters.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::document::{LayerStore, RasterLayer};
use crate::geometry::PixelRect;
use crate::history::HistoryLog;
use crate::io::{ImageIoError, SaveFormat, load_image, save_image};
use crate::ops::resample::{RotationFilter, ScaleFilter, scaled_dims};
use crate::ops::transform::{FlipAxis, FlipDirection};
use crate::selection::{Compass, MAX_SCALED_DIM, Pivot, SelectionRegion};
use crate::settings::TransformSettings;
use crate::tool::{LiftMode, SelectionTool, ToolContext};
use crate::viewport::Viewport;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// pixlift headless selection transformer.
#[derive(Parser, Debug)]
#[command(
    name = "pixlift",
    about = "Lift a region of a pixel-art image, scale / rotate / flip / move it, and commit",
    long_about = "Lift a rectangular region out of an image, transform it with the\n\
                  pixel-art aware filters of the interactive tool, and composite it back.\n\n\
                  Example:\n  \
                  pixlift -i sprite.png -o big.png --select 8,8,16,16 --scale 200"
)]
pub struct CliArgs {
    /// Input image (png, jpeg, bmp, tga).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output image.  Format is inferred from the extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Region to lift as x,y,w,h.  Defaults to the whole image.
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect, allow_hyphen_values = true)]
    pub select: Option<PixelRect>,

    /// Scale in percent.  Alone it scales both axes.
    #[arg(long, value_name = "PCT")]
    pub scale: Option<f32>,

    /// Vertical scale in percent; unlinks the axes.
    #[arg(long, value_name = "PCT")]
    pub scale_y: Option<f32>,

    /// Rotation in degrees, clockwise.
    #[arg(long, value_name = "DEG", allow_hyphen_values = true)]
    pub rotate: Option<f32>,

    /// Pivot: center, n, ne, e, se, s, sw, w, nw.
    #[arg(long, value_name = "POINT", value_parser = parse_pivot)]
    pub pivot: Option<Compass>,

    /// Flip the lifted pixels; repeatable, applied in order (h or v).
    #[arg(long, value_name = "h|v", value_parser = parse_flip)]
    pub flip: Vec<FlipDirection>,

    /// Flip axis: global (canvas) or local (object).
    #[arg(long, value_name = "AXIS", default_value = "global", value_parser = parse_flip_axis)]
    pub flip_axis: FlipAxis,

    /// Move by whole pixels as dx,dy.
    #[arg(long = "move", value_name = "DX,DY", value_parser = parse_offset, allow_hyphen_values = true)]
    pub offset: Option<(i32, i32)>,

    /// Scale filter: nearest, bilinear, epx, scale2x.
    #[arg(long, value_name = "FILTER", value_parser = parse_scale_filter)]
    pub scale_filter: Option<ScaleFilter>,

    /// Rotation filter: nearest, rotsprite.
    #[arg(long, value_name = "FILTER", value_parser = parse_rotation_filter)]
    pub rotate_filter: Option<RotationFilter>,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Settings file (key = value); defaults to the per-user settings.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Write a session log to this file.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Print log lines and a summary to the terminal.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Errors
// ============================================================================

/// A malformed command-line value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgError {
    Rect(String),
    Offset(String),
    Pivot(String),
    Flip(String),
    FlipAxis(String),
    Filter(String),
}

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgError::Rect(s) => write!(f, "expected x,y,w,h with positive w and h, got '{}'", s),
            ArgError::Offset(s) => write!(f, "expected dx,dy, got '{}'", s),
            ArgError::Pivot(s) => write!(f, "unknown pivot '{}' (center, n, ne, e, se, s, sw, w, nw)", s),
            ArgError::Flip(s) => write!(f, "unknown flip '{}' (h or v)", s),
            ArgError::FlipAxis(s) => write!(f, "unknown flip axis '{}' (global or local)", s),
            ArgError::Filter(s) => write!(f, "unknown filter '{}'", s),
        }
    }
}

impl std::error::Error for ArgError {}

/// Why one run failed.
#[derive(Debug)]
pub enum CliError {
    Image(ImageIoError),
    EmptySelection(PixelRect),
    /// The requested scale would grow the selection past `MAX_SCALED_DIM`.
    ScaleTooLarge { width: u32, height: u32 },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Image(e) => write!(f, "{}", e),
            CliError::EmptySelection(r) => {
                write!(f, "selection {},{},{},{} does not overlap the image", r.x, r.y, r.w, r.h)
            }
            CliError::ScaleTooLarge { width, height } => {
                write!(f, "scaled selection {}x{} exceeds the {}px limit", width, height, MAX_SCALED_DIM)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<ImageIoError> for CliError {
    fn from(e: ImageIoError) -> Self {
        CliError::Image(e)
    }
}

// ============================================================================
// Value parsers
// ============================================================================

fn parse_ints(s: &str, n: usize) -> Option<Vec<i32>> {
    let parts: Vec<i32> = s.split(',').map(|p| p.trim().parse::<i32>()).collect::<Result<_, _>>().ok()?;
    (parts.len() == n).then_some(parts)
}

pub fn parse_rect(s: &str) -> Result<PixelRect, ArgError> {
    match parse_ints(s, 4).as_deref() {
        Some(&[x, y, w, h]) if w > 0 && h > 0 => Ok(PixelRect::new(x, y, w, h)),
        _ => Err(ArgError::Rect(s.to_string())),
    }
}

pub fn parse_offset(s: &str) -> Result<(i32, i32), ArgError> {
    match parse_ints(s, 2).as_deref() {
        Some(&[dx, dy]) => Ok((dx, dy)),
        _ => Err(ArgError::Offset(s.to_string())),
    }
}

pub fn parse_pivot(s: &str) -> Result<Compass, ArgError> {
    Compass::from_key(s).ok_or_else(|| ArgError::Pivot(s.to_string()))
}

pub fn parse_flip(s: &str) -> Result<FlipDirection, ArgError> {
    match s.trim().to_lowercase().as_str() {
        "h" | "horizontal" => Ok(FlipDirection::Horizontal),
        "v" | "vertical" => Ok(FlipDirection::Vertical),
        _ => Err(ArgError::Flip(s.to_string())),
    }
}

pub fn parse_flip_axis(s: &str) -> Result<FlipAxis, ArgError> {
    FlipAxis::from_key(s).ok_or_else(|| ArgError::FlipAxis(s.to_string()))
}

pub fn parse_scale_filter(s: &str) -> Result<ScaleFilter, ArgError> {
    ScaleFilter::from_key(s).ok_or_else(|| ArgError::Filter(s.to_string()))
}

pub fn parse_rotation_filter(s: &str) -> Result<RotationFilter, ArgError> {
    RotationFilter::from_key(s).ok_or_else(|| ArgError::Filter(s.to_string()))
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one CLI invocation and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    if let Some(path) = &args.log {
        crate::logger::init_at(path);
    }
    crate::logger::set_echo(args.verbose);

    let start = Instant::now();
    match run_one(&args) {
        Ok(summary) => {
            if args.verbose {
                println!("{} ({:.0}ms)", summary, start.elapsed().as_secs_f64() * 1000.0);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            crate::log_err!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> TransformSettings {
    match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(content) => TransformSettings::parse(&content),
            Err(e) => {
                crate::log_warn!("settings: could not read {}: {}", p.display(), e);
                TransformSettings::default()
            }
        },
        None => TransformSettings::load(),
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Load → select → lift → transform → commit → save.
pub fn run_one(args: &CliArgs) -> Result<String, CliError> {
    let mut settings = load_settings(args.settings.as_deref());
    if let Some(f) = args.scale_filter {
        settings.scale_filter = f;
    }
    if let Some(f) = args.rotate_filter {
        settings.rotation_filter = f;
    }

    let mut layer = RasterLayer::from_image(load_image(&args.input)?);
    let mut history = HistoryLog::default();
    let committed = transform_layer(&mut layer, &mut history, settings, args)?;

    let format = SaveFormat::from_path(&args.output);
    save_image(&layer.pixels, &args.output, format, args.quality)?;

    Ok(format!(
        "{} -> {}: placed {}x{} at ({}, {}), {} history records",
        args.input.display(),
        args.output.display(),
        committed.w,
        committed.h,
        committed.x,
        committed.y,
        history.len()
    ))
}

/// Apply the requested selection transform to `layer`.  Returns where the
/// result was placed.
pub fn transform_layer(
    layer: &mut RasterLayer,
    history: &mut HistoryLog,
    settings: TransformSettings,
    args: &CliArgs,
) -> Result<PixelRect, CliError> {
    let requested = args.select.unwrap_or_else(|| layer.bounds());
    let region = requested
        .clamp_to_surface(layer.width(), layer.height())
        .ok_or(CliError::EmptySelection(requested))?;

    let scale = (args.scale.is_some() || args.scale_y.is_some()).then(|| {
        let sx = args.scale.unwrap_or(100.0);
        (sx, args.scale_y.unwrap_or(sx), args.scale_y.is_none())
    });
    if let Some((sx, sy, _)) = scale {
        let (width, height) = scaled_dims(region.w as u32, region.h as u32, sx / 100.0, sy / 100.0);
        if width > MAX_SCALED_DIM || height > MAX_SCALED_DIM {
            return Err(CliError::ScaleTooLarge { width, height });
        }
    }

    let viewport = Viewport::default();
    let mut tool = SelectionTool::new(settings);
    let mut ctx = ToolContext { viewport: &viewport, layer, history };

    tool.selection.set_region(Some(SelectionRegion::Rect(region)));
    tool.lift(LiftMode::Cut, &mut ctx);

    if let Some(c) = args.pivot {
        tool.selection.set_pivot(Pivot::Snapped(c));
    }
    for dir in &args.flip {
        tool.flip(*dir, args.flip_axis, ctx.history);
    }
    if let Some((sx, sy, link)) = scale {
        tool.set_scale_percent(sx, sy, link, ctx.history);
    }
    if let Some(deg) = args.rotate {
        tool.set_rotation(deg, ctx.history);
    }
    if let Some((dx, dy)) = args.offset {
        tool.nudge(dx, dy, ctx.history);
    }

    tool.commit(&mut ctx).ok_or(CliError::EmptySelection(region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn rect_and_offset_parsing() {
        assert_eq!(parse_rect("1, -2,3,4"), Ok(PixelRect::new(1, -2, 3, 4)));
        assert!(parse_rect("1,2,0,4").is_err());
        assert!(parse_rect("1,2,3").is_err());
        assert_eq!(parse_offset("-3,7"), Ok((-3, 7)));
        assert_eq!(parse_offset("x,7"), Err(ArgError::Offset("x,7".into())));
    }

    #[test]
    fn named_values() {
        assert_eq!(parse_pivot("NE"), Ok(Compass::NE));
        assert_eq!(parse_flip("v"), Ok(FlipDirection::Vertical));
        assert_eq!(parse_flip_axis("local"), Ok(FlipAxis::Local));
        assert_eq!(parse_scale_filter("scale2x"), Ok(ScaleFilter::Scale2x));
        assert!(parse_rotation_filter("lanczos").is_err());
    }

    #[test]
    fn clap_accepts_full_command_line() {
        let args = CliArgs::try_parse_from([
            "pixlift", "-i", "in.png", "-o", "out.png", "--select", "-4,2,8,8", "--scale", "150",
            "--rotate", "-30", "--pivot", "sw", "--flip", "h", "--flip", "v", "--move", "-1,2",
            "--scale-filter", "epx",
        ])
        .expect("parse");
        assert_eq!(args.select, Some(PixelRect::new(-4, 2, 8, 8)));
        assert_eq!(args.rotate, Some(-30.0));
        assert_eq!(args.flip, vec![FlipDirection::Horizontal, FlipDirection::Vertical]);
        assert_eq!(args.flip_axis, FlipAxis::Global);
        assert_eq!(args.offset, Some((-1, 2)));
        assert_eq!(args.scale_filter, Some(ScaleFilter::Epx));
        assert!(CliArgs::try_parse_from(["pixlift", "-i", "a.png", "-o", "b.png", "--flip", "x"]).is_err());
    }

    #[test]
    fn transform_layer_moves_pixels() {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255]));
        img.put_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let mut layer = RasterLayer::from_image(img);
        let mut history = HistoryLog::default();
        let args = CliArgs::try_parse_from([
            "pixlift", "-i", "in.png", "-o", "out.png", "--select", "2,2,1,1", "--move", "5,5",
        ])
        .expect("parse");
        let placed = transform_layer(&mut layer, &mut history, TransformSettings::default(), &args).expect("run");
        assert_eq!(placed, PixelRect::new(7, 7, 1, 1));
        assert_eq!(*layer.pixels.get_pixel(7, 7), Rgba([255, 0, 0, 255]));
        assert_eq!(*layer.pixels.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn selection_off_image_is_rejected() {
        let mut layer = RasterLayer::new(4, 4);
        let mut history = HistoryLog::default();
        let args = CliArgs::try_parse_from(["pixlift", "-i", "a", "-o", "b", "--select", "10,10,2,2"]).expect("parse");
        let err = transform_layer(&mut layer, &mut history, TransformSettings::default(), &args);
        assert!(matches!(err, Err(CliError::EmptySelection(_))));
    }

    #[test]
    fn oversized_scale_is_rejected_before_touching_the_layer() {
        let mut layer = RasterLayer::from_image(RgbaImage::from_pixel(64, 64, Rgba([9, 9, 9, 255])));
        let original = layer.pixels.clone();
        let mut history = HistoryLog::default();
        let args = CliArgs::try_parse_from(["pixlift", "-i", "a", "-o", "b", "--scale", "1000000"]).expect("parse");
        let err = transform_layer(&mut layer, &mut history, TransformSettings::default(), &args);
        assert!(matches!(err, Err(CliError::ScaleTooLarge { width: 640_000, height: 640_000 })), "{err:?}");
        assert_eq!(layer.pixels, original);
        assert!(history.is_empty());

        // One axis over the cap is enough.
        let args = CliArgs::try_parse_from([
            "pixlift", "-i", "a", "-o", "b", "--select", "0,0,2,2", "--scale", "100", "--scale-y", "409700",
        ])
        .expect("parse");
        let err = transform_layer(&mut layer, &mut history, TransformSettings::default(), &args);
        assert!(matches!(err, Err(CliError::ScaleTooLarge { width: 2, height: 8194 })), "{err:?}");
        assert_eq!(layer.pixels, original);
    }
}
