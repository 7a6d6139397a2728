//! Error types for Stream Deck page controller operations.

use thiserror::Error;

/// Boxed cause carried by render failures.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for controller operations.
#[derive(Error, Debug)]
pub enum DeckError {
    // Validation errors
    #[error("Invalid key {key}: {detail}")]
    InvalidKey { key: i64, detail: String },

    #[error("Invalid {name}: {detail}")]
    InvalidColor { name: String, detail: String },

    #[error("Invalid page name: {0}")]
    InvalidPageName(String),

    #[error("Action cannot be empty")]
    EmptyAction,

    // Page errors
    #[error("Page '{name}' does not exist")]
    UnknownPage { name: String },

    #[error("Cannot delete the 'main' page")]
    CannotDeleteMain,

    // Device errors
    #[error("No Stream Deck found. Check USB connection and permissions.")]
    NoDeviceFound,

    #[error("Failed to connect after {attempts} attempts. Check USB connection and permissions.")]
    ConnectionExhausted { attempts: u32 },

    #[error("No Stream Deck connected. Connect first.")]
    DeviceNotConnected,

    #[error("Stream Deck disconnected. Reconnect to continue.")]
    DeviceDisconnected,

    #[error("Device communication error: {0}")]
    Device(String),

    // Image errors
    #[error("Failed to render button image: {message}")]
    Render {
        message: String,
        #[source]
        source: BoxedCause,
    },

    // Persistence and configuration errors
    #[error("Failed to persist {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeckError {
    /// Wrap an underlying cause as a render failure.
    pub fn render<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedCause>,
    {
        Self::Render {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey { .. }
                | Self::InvalidColor { .. }
                | Self::InvalidPageName(_)
                | Self::EmptyAction
                | Self::UnknownPage { .. }
                | Self::CannotDeleteMain
                | Self::NoDeviceFound
                | Self::DeviceNotConnected
                | Self::DeviceDisconnected
        )
    }

    /// Returns true for errors caused by the device connection state.
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NoDeviceFound
                | Self::ConnectionExhausted { .. }
                | Self::DeviceNotConnected
                | Self::DeviceDisconnected
                | Self::Device(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoDeviceFound => Some("Ensure the Stream Deck is plugged in and udev rules allow access"),
            Self::ConnectionExhausted { .. } => Some("Replug the device, then run: sdp info"),
            Self::DeviceNotConnected | Self::DeviceDisconnected => Some("Run: sdp info to reconnect"),
            Self::InvalidColor { .. } => Some("Use three values between 0 and 255, e.g. 255,128,0"),
            Self::InvalidPageName(_) => {
                Some("Use 1-50 letters, digits, spaces, underscores or hyphens")
            }
            Self::UnknownPage { .. } => Some("Run: sdp page list"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using DeckError.
pub type Result<T> = std::result::Result<T, DeckError>;
