//! Input validation for keys, page names, colours and actions.
//!
//! Pure functions; every failure maps to a distinct [`DeckError`] kind.

use crate::error::{DeckError, Result};
use crate::model::Rgb;

/// Maximum page name length in characters.
pub const MAX_PAGE_NAME_LENGTH: usize = 50;

/// Validate a key index, bounding it by the key count of a connected device.
pub fn validate_key(key: i64, key_count: Option<u8>) -> Result<u8> {
    if key < 0 {
        return Err(DeckError::InvalidKey {
            key,
            detail: format!("key must be a non-negative integer, got: {key}"),
        });
    }

    let index = u8::try_from(key).map_err(|_| DeckError::InvalidKey {
        key,
        detail: format!("key {key} is larger than any supported device"),
    })?;

    if let Some(count) = key_count {
        if index >= count {
            return Err(DeckError::InvalidKey {
                key,
                detail: format!(
                    "out of range, this deck has {count} keys (0-{})",
                    count.saturating_sub(1)
                ),
            });
        }
    }

    Ok(index)
}

/// Validate a page name: 1-50 characters of `[A-Za-z0-9_- ]`.
pub fn validate_page_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DeckError::InvalidPageName(
            "page name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_PAGE_NAME_LENGTH {
        return Err(DeckError::InvalidPageName(format!(
            "page name too long (max {MAX_PAGE_NAME_LENGTH} characters)"
        )));
    }

    if let Some(bad) = name.chars().find(|&c| !is_page_name_char(c)) {
        return Err(DeckError::InvalidPageName(format!(
            "'{bad}' not allowed; use letters, numbers, underscores, hyphens and spaces"
        )));
    }

    Ok(())
}

const fn is_page_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' ')
}

/// Validate and normalize an RGB triple.
///
/// Components are truncated toward zero before the range check, so `12.7`
/// becomes `12`.
pub fn validate_color(components: &[f64], name: &str) -> Result<Rgb> {
    let invalid = |detail: String| DeckError::InvalidColor {
        name: name.to_string(),
        detail,
    };

    let [r, g, b] = components else {
        return Err(invalid(format!(
            "must be [R, G, B] with 3 values, got {}",
            components.len()
        )));
    };

    let channel = |index: usize, value: f64| -> Result<u8> {
        if !value.is_finite() {
            return Err(invalid(format!("component {index} must be a number")));
        }
        let truncated = value.trunc();
        if !(0.0..=255.0).contains(&truncated) {
            return Err(invalid(format!("values must be 0-255, got {truncated}")));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked above
        Ok(truncated as u8)
    };

    Ok(Rgb(channel(0, *r)?, channel(1, *g)?, channel(2, *b)?))
}

/// Validate an optional colour, falling back to `default` when absent.
pub fn validate_color_or(components: Option<&[f64]>, name: &str, default: Rgb) -> Result<Rgb> {
    components.map_or(Ok(default), |c| validate_color(c, name))
}

/// Parse a `r,g,b` command-line colour into raw components.
///
/// Only splits and parses numbers; range checks stay in [`validate_color`].
pub fn parse_color_arg(raw: &str) -> std::result::Result<Vec<f64>, String> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part.trim()))
        })
        .collect()
}

/// Validate an action string.
pub fn validate_action(action: &str) -> Result<()> {
    if action.trim().is_empty() {
        return Err(DeckError::EmptyAction);
    }
    Ok(())
}
