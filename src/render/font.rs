//! Font resolution for button labels.
//!
//! Candidate TrueType files are tried in order for each requested point
//! size and the first that loads is memoized under that size. When none of
//! them load, the built-in 10x20 bitmap font is cached once and returned
//! for every later size; [`ButtonFont::is_builtin`] tells callers that the
//! requested size had no effect.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::{Font, FontVec, GlyphId, PxScale, Rect, ScaleFont, point};
use image::RgbImage;
use imageproc::drawing::draw_text_mut;
use tracing::{debug, warn};

use super::canvas::draw_builtin_text;
use crate::model::Rgb;

/// Platform font files tried when no candidates are configured.
pub const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/SFNSText.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "C:/Windows/Fonts/arial.ttf",
];

/// A font ready to draw labels.
#[derive(Clone)]
pub enum ButtonFont {
    /// Scalable font loaded from disk, at a fixed point size.
    TrueType { font: Arc<FontVec>, size: u32 },
    /// Fixed-size bitmap font compiled into the binary.
    Builtin,
}

impl fmt::Debug for ButtonFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrueType { size, .. } => f.debug_struct("TrueType").field("size", size).finish(),
            Self::Builtin => f.write_str("Builtin"),
        }
    }
}

impl ButtonFont {
    /// True for the bitmap fallback, which ignores the requested size.
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// Draw `text` centred on both axes of `image`.
    pub fn draw_centered(&self, image: &mut RgbImage, text: &str, color: Rgb) {
        match self {
            Self::Builtin => draw_builtin_text(image, text, color),
            Self::TrueType { font, size } => {
                #[allow(clippy::cast_precision_loss)]
                let scale = PxScale::from(*size as f32);
                let Some(bounds) = ink_bounds(font.as_ref(), scale, text) else {
                    // Whitespace only
                    return;
                };

                let (width, height) = image.dimensions();
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                let (x, y) = (
                    ((width as f32 - bounds.width()) / 2.0 - bounds.min.x).round() as i32,
                    ((height as f32 - bounds.height()) / 2.0 - bounds.min.y).round() as i32,
                );

                let [r, g, b] = color.channels();
                draw_text_mut(image, image::Rgb([r, g, b]), x, y, scale, font.as_ref(), text);
            }
        }
    }
}

/// Pixel box covered by the glyphs of `text` when laid out from the origin
/// with the baseline at the font's ascent.
///
/// Follows the same caret and kerning walk `draw_text_mut` uses, so the box
/// lines up with what ends up drawn.
pub fn ink_bounds(font: &FontVec, scale: PxScale, text: &str) -> Option<Rect> {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0_f32;
    let mut last: Option<GlyphId> = None;
    let mut bounds: Option<Rect> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        if let Some(prev) = last {
            caret += scaled.kern(id, prev);
        }
        last = Some(id);

        let b = outlined.px_bounds();
        bounds = Some(bounds.map_or(b, |acc| Rect {
            min: point(acc.min.x.min(b.min.x), acc.min.y.min(b.min.y)),
            max: point(acc.max.x.max(b.max.x), acc.max.y.max(b.max.y)),
        }));
    }

    bounds
}

/// Memoizing font resolver.
#[derive(Debug)]
pub struct FontCache {
    candidates: Vec<PathBuf>,
    by_size: HashMap<u32, ButtonFont>,
    fallback: Option<ButtonFont>,
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_CANDIDATES.iter().map(PathBuf::from))
    }
}

impl FontCache {
    pub fn new(candidates: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            by_size: HashMap::new(),
            fallback: None,
        }
    }

    /// True once probing has failed and the built-in font is in use.
    pub const fn in_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Resolve a font for `size`.
    pub fn get_font(&mut self, size: u32) -> ButtonFont {
        if let Some(font) = &self.fallback {
            return font.clone();
        }
        if let Some(font) = self.by_size.get(&size) {
            return font.clone();
        }

        for path in &self.candidates {
            if let Some(font) = load_font(path) {
                debug!(path = %path.display(), size, "Loaded font");
                let font = ButtonFont::TrueType {
                    font: Arc::new(font),
                    size,
                };
                self.by_size.insert(size, font.clone());
                return font;
            }
        }

        warn!(
            requested_size = size,
            "No usable font found, using built-in bitmap font; font sizes will be ignored"
        );
        self.fallback = Some(ButtonFont::Builtin);
        ButtonFont::Builtin
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = fs::read(path).ok()?;
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Font file rejected");
            None
        }
    }
}
