// ============================================================================
// IMAGE I/O — load and save flat RGBA images for the batch binary
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError, RgbaImage};

/// Output formats the batch binary can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn all() -> &'static [SaveFormat] {
        &[SaveFormat::Png, SaveFormat::Jpeg, SaveFormat::Bmp, SaveFormat::Tga]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }

    /// Infer from a file extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> SaveFormat {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "jpg" | "jpeg" => SaveFormat::Jpeg,
            "bmp" => SaveFormat::Bmp,
            "tga" => SaveFormat::Tga,
            _ => SaveFormat::Png,
        }
    }
}

#[derive(Debug)]
pub enum ImageIoError {
    Io(std::io::Error),
    Decode(String),
    Encode(String),
}

impl std::fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageIoError::Io(e) => write!(f, "I/O error: {}", e),
            ImageIoError::Decode(e) => write!(f, "decode error: {}", e),
            ImageIoError::Encode(e) => write!(f, "encode error: {}", e),
        }
    }
}

impl std::error::Error for ImageIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageIoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImageIoError {
    fn from(e: std::io::Error) -> Self {
        ImageIoError::Io(e)
    }
}

impl From<ImageError> for ImageIoError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => ImageIoError::Io(io),
            ImageError::Encoding(_) => ImageIoError::Encode(e.to_string()),
            other => ImageIoError::Decode(other.to_string()),
        }
    }
}

/// Decode any supported file to straight-alpha RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, ImageIoError> {
    let img = image::open(path)?;
    crate::log_info!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img.to_rgba8())
}

/// Encode `image` to `path`.  JPEG drops alpha.
pub fn save_image(image: &RgbaImage, path: &Path, format: SaveFormat, quality: u8) -> Result<(), ImageIoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let (w, h) = image.dimensions();

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            TgaEncoder::new(&mut writer).encode(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
    }
    crate::log_info!("saved {} ({}x{}, {})", path.display(), w, h, format.extension());
    Ok(())
}
