//! Device abstraction layer for Stream Deck devices.
//!
//! Hardware is reached through two capability traits: a [`DeviceBackend`]
//! enumerates and opens devices, and the [`DeviceHandle`] it returns drives
//! one open device. Real hardware, a stub for hosts without HID support and
//! a recording mock all implement them, so the session and controller never
//! branch on what is installed.

mod hid;
mod info;
pub mod mock;
mod session;

pub use hid::{HidBackend, UnavailableBackend, select_backend};
pub use info::{
    ConnectionSettings, DeviceInfo, DeviceModel, ImageEncoding, KeyEvent, KeyImageFormat, Mirror,
    Rotation,
};
pub use session::DeviceSession;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::error::Result;

/// Sending half of the key event channel handed to open devices.
pub type KeyEventSender = UnboundedSender<KeyEvent>;

/// Receiving half of the key event channel.
pub type KeyEventReceiver = UnboundedReceiver<KeyEvent>;

/// One open device.
///
/// # Implementation Notes
///
/// - Key indices are 0-based, left-to-right, top-to-bottom
/// - Image data passed to [`write_key_image`](Self::write_key_image) is
///   already in the device's native format
pub trait DeviceHandle: Send {
    /// Get device information.
    fn info(&self) -> &DeviceInfo;

    /// Query the key count from the device.
    ///
    /// Unlike `info().key_count` this is a round trip, used as a health
    /// check.
    fn key_count(&self) -> Result<u8>;

    /// Native key image format.
    fn key_image_format(&self) -> KeyImageFormat {
        self.info().image_format
    }

    /// Reset the device to its idle state.
    fn reset(&self) -> Result<()>;

    /// Set display brightness (0-100).
    fn set_brightness(&self, percent: u8) -> Result<()>;

    /// Write an encoded image to a key.
    fn write_key_image(&self, key: u8, data: &[u8]) -> Result<()>;

    /// Clear a single key (set to black).
    fn clear_key(&self, key: u8) -> Result<()>;

    /// Clear all keys (set to black).
    fn clear_all_keys(&self) -> Result<()>;

    /// Start delivering key press/release events to `sink`.
    fn subscribe(&mut self, sink: KeyEventSender) -> Result<()>;

    /// Stop event delivery and release the device.
    fn close(&mut self) -> Result<()>;
}

/// Type alias for boxed trait object.
pub type BoxedDevice = Box<dyn DeviceHandle>;

/// Source of devices.
pub trait DeviceBackend: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// List attached devices.
    fn enumerate(&self) -> Result<Vec<DeviceInfo>>;

    /// Open a device returned by [`enumerate`](Self::enumerate).
    fn open(&self, device: &DeviceInfo) -> Result<BoxedDevice>;
}

/// Type alias for boxed trait object.
pub type BoxedBackend = Box<dyn DeviceBackend>;
