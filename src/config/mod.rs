//! Application configuration.
//!
//! Optional `config.toml` in the config directory, next to the page and
//! action documents:
//!
//! ```toml
//! brightness = 70
//! image_fit = "fill"
//! font_candidates = ["/usr/share/fonts/TTF/DejaVuSans.ttf"]
//!
//! [connection]
//! min_interval_ms = 1000
//! max_attempts = 3
//!
//! [logging]
//! level = "sdp=debug"
//! ```

pub mod path;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::device::ConnectionSettings;
use crate::error::{DeckError, Result};
use crate::image_ops::ResizeStrategy;
use crate::render::{DEFAULT_FONT_CANDIDATES, FontCache};

/// File name of the application config inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Default brightness applied on first connect.
pub const DEFAULT_BRIGHTNESS: u8 = 70;

/// Top-level `config.toml` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Brightness (0-100) applied on the first connect.
    pub brightness: u8,
    /// How image files are fitted to a key.
    pub image_fit: ResizeStrategy,
    /// Font files tried for labels, in order.
    pub font_candidates: Vec<PathBuf>,
    pub connection: ConnectionConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            image_fit: ResizeStrategy::Fill,
            font_candidates: DEFAULT_FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
            connection: ConnectionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[connection]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Minimum milliseconds between connect attempts.
    pub min_interval_ms: u64,
    /// Consecutive failed connects before giving up.
    pub max_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let defaults = ConnectionSettings::default();
        Self {
            min_interval_ms: u64::try_from(defaults.min_interval.as_millis()).unwrap_or(1000),
            max_attempts: defaults.max_attempts,
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Bare level (`debug`) or full filter directive (`sdp=debug,hidapi=warn`),
    /// used when `RUST_LOG` is unset and no `-v`/`-q` is given.
    pub level: Option<String>,
}

impl AppConfig {
    /// Validate value ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.brightness > 100 {
            return Err(DeckError::Config(format!(
                "brightness must be 0-100, got {}",
                self.brightness
            )));
        }
        if self.connection.max_attempts == 0 {
            return Err(DeckError::Config(
                "connection.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Session pacing derived from this config.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            min_interval: Duration::from_millis(self.connection.min_interval_ms),
            max_attempts: self.connection.max_attempts,
            initial_brightness: self.brightness,
        }
    }

    /// Font cache probing the configured candidates.
    pub fn font_cache(&self) -> FontCache {
        FontCache::new(self.font_candidates.iter().cloned())
    }
}

/// Parse config text.
pub fn load_config_from_str(content: &str) -> Result<AppConfig> {
    let config: AppConfig =
        toml::from_str(content).map_err(|e| DeckError::Config(format!("TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from `dir`; a missing file yields defaults.
#[instrument(fields(dir = %dir.display()))]
pub fn load_config(dir: &Path) -> Result<AppConfig> {
    let path = dir.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config file, using defaults");
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(DeckError::Io(e)),
    };

    load_config_from_str(&content).map_err(|e| match e {
        DeckError::Config(detail) => DeckError::Config(format!("{}: {detail}", path.display())),
        other => other,
    })
}
