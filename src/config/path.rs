//! Path resolution helpers.
//!
//! Supports "~" home directory expansion and locating the default config
//! directory.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{DeckError, Result};

/// Name of the default config directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".stream-deck-pages";

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| DeckError::Config("Could not determine home directory".to_string()))
}

/// Default config directory, `~/.stream-deck-pages`.
pub fn default_config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(CONFIG_DIR_NAME))
}

/// Expand a leading `~` or `~/` to the home directory.
///
/// Paths without the prefix, and every path when the home directory is
/// unknown, are returned unchanged.
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw {
        "~" => Some(""),
        _ => raw.strip_prefix("~/"),
    };

    let Some(rest) = rest else {
        return PathBuf::from(raw);
    };
    let Ok(home) = home_dir() else {
        return PathBuf::from(raw);
    };

    let resolved = if rest.is_empty() { home } else { home.join(rest) };
    trace!(original = raw, resolved = %resolved.display(), "Expanded home directory path");
    resolved
}

/// Resolve the config directory from an explicit override or the default.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(expand_home(&dir.to_string_lossy())),
        None => default_config_dir(),
    }
}
