//! Image processing operations.
//!
//! Loading and fitting source images to a key, and converting finished key
//! faces into a device's native on-wire format.

use std::io::Cursor;
use std::path::Path;

use clap::ValueEnum;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::device::{ImageEncoding, KeyImageFormat, Mirror, Rotation};
use crate::error::{DeckError, Result};

/// JPEG quality used for key images.
pub const JPEG_QUALITY: u8 = 94;

/// Strategy for resizing images to match key dimensions.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStrategy {
    /// Fit within key, maintain aspect ratio (black bars).
    Fit,
    /// Fill key, maintain aspect ratio (centre crop).
    #[default]
    Fill,
    /// Stretch to fill (may distort).
    Stretch,
}

/// Load an image and resize it to exactly `width` x `height`.
///
/// # Errors
///
/// Returns a render error if the file cannot be opened or decoded.
pub fn load_and_resize(
    path: &Path,
    width: u32,
    height: u32,
    strategy: ResizeStrategy,
) -> Result<RgbImage> {
    let img = image::open(path)
        .map_err(|e| DeckError::render(format!("cannot load {}", path.display()), e))?;

    let filter = FilterType::Lanczos3;

    let resized = match strategy {
        ResizeStrategy::Fit => {
            // Pad onto a black canvas so the output is always key-sized
            let resized = img.resize(width, height, filter).to_rgb8();
            let mut canvas = RgbImage::new(width, height);
            let (rw, rh) = resized.dimensions();
            let x = (width - rw) / 2;
            let y = (height - rh) / 2;
            imageops::overlay(&mut canvas, &resized, x.into(), y.into());
            canvas
        }
        ResizeStrategy::Fill => img.resize_to_fill(width, height, filter).to_rgb8(),
        ResizeStrategy::Stretch => img.resize_exact(width, height, filter).to_rgb8(),
    };

    Ok(resized)
}

/// Rotate then mirror a key face the way the device expects it.
pub fn apply_orientation(image: RgbImage, rotation: Rotation, mirror: Mirror) -> RgbImage {
    let rotated = match rotation {
        Rotation::Rot0 => image,
        Rotation::Rot90 => imageops::rotate90(&image),
        Rotation::Rot180 => imageops::rotate180(&image),
        Rotation::Rot270 => imageops::rotate270(&image),
    };

    match mirror {
        Mirror::None => rotated,
        Mirror::X => imageops::flip_horizontal(&rotated),
        Mirror::Y => imageops::flip_vertical(&rotated),
        Mirror::Both => imageops::flip_vertical(&imageops::flip_horizontal(&rotated)),
    }
}

/// Orient and encode a key face into the device's native format.
///
/// # Errors
///
/// Returns a render error if the encoder fails.
pub fn encode_native(image: RgbImage, format: &KeyImageFormat) -> Result<Vec<u8>> {
    let oriented = apply_orientation(image, format.rotation, format.mirror);

    match format.encoding {
        ImageEncoding::Raw => Ok(oriented.into_raw()),
        ImageEncoding::Jpeg => {
            let mut buf = Vec::new();
            DynamicImage::ImageRgb8(oriented)
                .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))
                .map_err(|e| DeckError::render("JPEG encoding failed", e))?;
            Ok(buf)
        }
        ImageEncoding::Bmp => {
            let mut cursor = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(oriented)
                .write_with_encoder(BmpEncoder::new(&mut cursor))
                .map_err(|e| DeckError::render("BMP encoding failed", e))?;
            Ok(cursor.into_inner())
        }
    }
}
