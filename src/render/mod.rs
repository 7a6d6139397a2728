//! Button face rendering.
//!
//! A face is either a fitted image file or a solid background with a
//! centred label. Output is always in the device's native key format.

mod canvas;
pub mod font;

pub use font::{ButtonFont, DEFAULT_FONT_CANDIDATES, FontCache};

use image::RgbImage;
use tracing::{debug, trace};

use crate::config::path::expand_home;
use crate::device::KeyImageFormat;
use crate::error::{DeckError, Result};
use crate::image_ops::{ResizeStrategy, encode_native, load_and_resize};
use crate::model::ButtonConfig;

/// Limit a label size to `1..=4 * height` pixels for a key `height` tall.
pub fn clamp_font_size(size: u32, height: u32) -> u32 {
    size.clamp(1, height.saturating_mul(4).max(1))
}

/// Capability for turning a [`ButtonConfig`] into key image bytes.
pub trait ImageBackend: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Render `face` in the native `format`.
    fn render(&mut self, format: &KeyImageFormat, face: &ButtonConfig) -> Result<Vec<u8>>;
}

/// Type alias for boxed trait object.
pub type BoxedImageBackend = Box<dyn ImageBackend>;

/// Renderer backed by `image`, `imageproc` and `ab_glyph`.
#[derive(Debug, Default)]
pub struct KeyRenderer {
    fonts: FontCache,
    fit: ResizeStrategy,
}

impl KeyRenderer {
    pub fn new(fonts: FontCache, fit: ResizeStrategy) -> Self {
        Self { fonts, fit }
    }

    /// Font cache used for labels.
    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    /// Compose the face as an upright RGB image of the key size.
    pub fn compose(&mut self, width: u32, height: u32, face: &ButtonConfig) -> Result<RgbImage> {
        if let Some(raw) = face.image_path.as_deref() {
            let path = expand_home(raw);
            if path.is_file() {
                trace!(path = %path.display(), "Rendering image face");
                return load_and_resize(&path, width, height, self.fit);
            }
            debug!(path = %path.display(), "Image not found, rendering text face");
        }

        let [r, g, b] = face.bg_color.channels();
        let mut canvas = RgbImage::from_pixel(width, height, image::Rgb([r, g, b]));

        if let Some(text) = face.text.as_deref().filter(|t| !t.is_empty()) {
            let font = self.fonts.get_font(clamp_font_size(face.font_size, height));
            font.draw_centered(&mut canvas, text, face.text_color);
        }

        Ok(canvas)
    }
}

impl ImageBackend for KeyRenderer {
    fn name(&self) -> &'static str {
        "image"
    }

    fn render(&mut self, format: &KeyImageFormat, face: &ButtonConfig) -> Result<Vec<u8>> {
        let image = self.compose(format.width, format.height, face)?;
        encode_native(image, format)
    }
}

/// Stub selected when no imaging support is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullImageBackend;

impl ImageBackend for NullImageBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn render(&mut self, _format: &KeyImageFormat, _face: &ButtonConfig) -> Result<Vec<u8>> {
        Err(DeckError::render(
            "cannot render button",
            "no image backend is available",
        ))
    }
}
