//! Device information types for Stream Deck devices.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// On-wire encoding of key images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    /// Raw RGB bytes, row-major
    Raw,
    Bmp,
    Jpeg,
}

/// Rotation applied before encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Rot0,
    Rot90,
    Rot180,
    Rot270,
}

/// Mirroring applied after rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    X,
    Y,
    Both,
}

/// Native key image format of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyImageFormat {
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
    pub rotation: Rotation,
    pub mirror: Mirror,
}

impl KeyImageFormat {
    /// Plain JPEG format with no transforms.
    pub const fn jpeg(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            encoding: ImageEncoding::Jpeg,
            rotation: Rotation::Rot0,
            mirror: Mirror::None,
        }
    }

    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Information about a connected Stream Deck device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Device serial number
    pub serial: String,
    /// Human-readable product name
    pub product_name: String,
    /// Firmware version string
    pub firmware_version: String,
    /// Number of keys on the device
    pub key_count: u8,
    /// Number of key rows
    pub rows: u8,
    /// Number of key columns
    pub cols: u8,
    /// Native key image format
    pub image_format: KeyImageFormat,
    /// Device kind/model identifier
    pub kind: String,
}

/// Supported Stream Deck device models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceModel {
    /// Stream Deck Mini (6 keys, 3x2)
    Mini,
    /// Stream Deck Original (15 keys, 5x3)
    Original,
    /// Stream Deck MK.2 (15 keys, 5x3)
    Mk2,
    /// Stream Deck XL (32 keys, 8x4)
    Xl,
    /// Stream Deck + (8 keys + LCD + dials)
    Plus,
    /// Stream Deck Neo (8 keys + touch strip)
    Neo,
}

impl DeviceModel {
    /// Returns the number of keys for this device model.
    #[must_use]
    pub const fn key_count(self) -> u8 {
        match self {
            Self::Mini => 6,
            Self::Original | Self::Mk2 => 15,
            Self::Xl => 32,
            Self::Plus | Self::Neo => 8,
        }
    }

    /// Returns the key layout (columns, rows).
    #[must_use]
    pub const fn layout(self) -> (u8, u8) {
        match self {
            Self::Mini => (3, 2),
            Self::Original | Self::Mk2 => (5, 3),
            Self::Xl => (8, 4),
            Self::Plus | Self::Neo => (4, 2),
        }
    }

    /// Returns the native key image format.
    #[must_use]
    pub const fn image_format(self) -> KeyImageFormat {
        match self {
            Self::Mini => KeyImageFormat {
                width: 80,
                height: 80,
                encoding: ImageEncoding::Bmp,
                rotation: Rotation::Rot90,
                mirror: Mirror::Y,
            },
            Self::Original => KeyImageFormat {
                width: 72,
                height: 72,
                encoding: ImageEncoding::Bmp,
                rotation: Rotation::Rot0,
                mirror: Mirror::Both,
            },
            Self::Mk2 => KeyImageFormat {
                width: 72,
                height: 72,
                encoding: ImageEncoding::Jpeg,
                rotation: Rotation::Rot0,
                mirror: Mirror::Both,
            },
            Self::Xl => KeyImageFormat {
                width: 96,
                height: 96,
                encoding: ImageEncoding::Jpeg,
                rotation: Rotation::Rot0,
                mirror: Mirror::Both,
            },
            Self::Plus => KeyImageFormat::jpeg(120, 120),
            Self::Neo => KeyImageFormat::jpeg(96, 96),
        }
    }

    /// Returns a human-readable name for this device model.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Mini => "Stream Deck Mini",
            Self::Original => "Stream Deck (Original)",
            Self::Mk2 => "Stream Deck MK.2",
            Self::Xl => "Stream Deck XL",
            Self::Plus => "Stream Deck +",
            Self::Neo => "Stream Deck Neo",
        }
    }
}

/// Key press/release event from the hardware reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    /// Key index (0-based)
    pub key: u8,
    /// True if pressed, false if released
    pub pressed: bool,
}

/// Connection pacing for [`super::DeviceSession`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Minimum time between connection attempts (default: 1000ms).
    pub min_interval: Duration,
    /// Consecutive failures before connecting is refused (default: 3).
    pub max_attempts: u32,
    /// Brightness applied on the first connect (default: 70).
    pub initial_brightness: u8,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1000),
            max_attempts: 3,
            initial_brightness: 70,
        }
    }
}
