//! Connection lifecycle of one device.
//!
//! The session owns at most one open handle. Connecting is paced and gives
//! up after a run of consecutive failures until [`DeviceSession::reset_attempts`]
//! is called or a connect succeeds. A failed health check tears the handle
//! down.

use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use super::info::{ConnectionSettings, DeviceInfo, KeyImageFormat};
use super::{BoxedBackend, BoxedDevice, DeviceHandle, KeyEventSender};
use crate::error::{DeckError, Result};

pub struct DeviceSession {
    backend: BoxedBackend,
    settings: ConnectionSettings,
    handle: Option<BoxedDevice>,
    brightness: u8,
    failed_attempts: u32,
    last_attempt: Option<Instant>,
    events: Option<KeyEventSender>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("backend", &self.backend.name())
            .field("connected", &self.is_connected())
            .field("brightness", &self.brightness)
            .field("failed_attempts", &self.failed_attempts)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    pub fn new(backend: BoxedBackend, settings: ConnectionSettings) -> Self {
        Self {
            backend,
            brightness: settings.initial_brightness.min(100),
            settings,
            handle: None,
            failed_attempts: 0,
            last_attempt: None,
            events: None,
        }
    }

    /// Sink subscribed to every device opened from now on.
    pub fn set_event_sink(&mut self, sink: KeyEventSender) {
        self.events = Some(sink);
    }

    /// Drop the stored sink so the event channel can close.
    pub fn detach_event_sink(&mut self) -> Option<KeyEventSender> {
        self.events.take()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Remembered brightness, applied on the next connect.
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Clear the consecutive failure counter so connecting is allowed again.
    pub fn reset_attempts(&mut self) {
        if self.failed_attempts > 0 {
            info!(previous = self.failed_attempts, "Connection attempts reset");
        }
        self.failed_attempts = 0;
    }

    /// Info of the open device.
    pub fn info(&self) -> Option<&DeviceInfo> {
        self.handle.as_deref().map(DeviceHandle::info)
    }

    /// Key count of the open device, without a round trip.
    pub fn key_count(&self) -> Option<u8> {
        self.info().map(|info| info.key_count)
    }

    pub fn key_image_format(&self) -> Option<KeyImageFormat> {
        self.handle.as_deref().map(DeviceHandle::key_image_format)
    }

    /// Open the first attached device.
    ///
    /// Any handle already open is released first.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub fn connect(&mut self) -> Result<&DeviceInfo> {
        let max = self.settings.max_attempts;
        if self.failed_attempts >= max {
            warn!(attempts = self.failed_attempts, "Refusing to connect, attempts exhausted");
            return Err(DeckError::ConnectionExhausted {
                attempts: self.failed_attempts,
            });
        }

        if let Some(old) = self.handle.take() {
            debug!("Releasing previous handle before reconnecting");
            release(old, false);
        }

        self.pace();

        match self.open_first() {
            Ok(handle) => {
                self.failed_attempts = 0;
                let handle = self.handle.insert(handle);
                let info = handle.info();
                info!(
                    serial = %info.serial,
                    product = %info.product_name,
                    keys = info.key_count,
                    "Connected to Stream Deck"
                );
                Ok(info)
            }
            Err(e) => {
                self.failed_attempts += 1;
                if self.failed_attempts >= max {
                    error!(attempts = self.failed_attempts, error = %e, "Giving up connecting");
                    Err(DeckError::ConnectionExhausted {
                        attempts: self.failed_attempts,
                    })
                } else {
                    warn!(attempt = self.failed_attempts, max, error = %e, "Connect failed");
                    Err(e)
                }
            }
        }
    }

    /// Sleep until the minimum interval since the previous attempt elapsed.
    fn pace(&mut self) {
        if let Some(last) = self.last_attempt {
            let elapsed = last.elapsed();
            if let Some(wait) = self.settings.min_interval.checked_sub(elapsed) {
                if !wait.is_zero() {
                    debug!(wait_ms = wait.as_millis(), "Rate limiting connect");
                    thread::sleep(wait);
                }
            }
        }
        self.last_attempt = Some(Instant::now());
    }

    fn open_first(&self) -> Result<BoxedDevice> {
        let devices = self.backend.enumerate()?;
        let target = devices.first().ok_or(DeckError::NoDeviceFound)?;
        debug!(found = devices.len(), serial = %target.serial, "Opening first device");

        let mut handle = self.backend.open(target)?;
        if let Err(e) = self.prepare(handle.as_mut()) {
            release(handle, false);
            return Err(e);
        }
        Ok(handle)
    }

    fn prepare(&self, handle: &mut dyn DeviceHandle) -> Result<()> {
        handle.reset()?;
        handle.set_brightness(self.brightness)?;
        if let Some(sink) = &self.events {
            handle.subscribe(sink.clone())?;
        }
        Ok(())
    }

    /// Verify the device still answers.
    ///
    /// A failed round trip releases the handle.
    pub fn health_check(&mut self) -> Result<&dyn DeviceHandle> {
        let Some(handle) = self.handle.as_deref() else {
            return Err(DeckError::DeviceNotConnected);
        };

        if let Err(e) = handle.key_count() {
            warn!(error = %e, "Health check failed, dropping device");
            if let Some(handle) = self.handle.take() {
                release(handle, false);
            }
            return Err(DeckError::DeviceDisconnected);
        }

        self.handle.as_deref().ok_or(DeckError::DeviceNotConnected)
    }

    fn handle(&self) -> Result<&dyn DeviceHandle> {
        self.handle.as_deref().ok_or(DeckError::DeviceNotConnected)
    }

    /// Clamp to 0-100, push, and remember for the next connect.
    pub fn set_brightness(&mut self, percent: i64) -> Result<u8> {
        let level = u8::try_from(percent.clamp(0, 100)).unwrap_or(100);
        self.health_check()?.set_brightness(level)?;
        self.brightness = level;
        info!(level, "Brightness set");
        Ok(level)
    }

    /// Write an encoded image to a key; `None` blanks it.
    pub fn push_key_image(&self, key: u8, image: Option<&[u8]>) -> Result<()> {
        let handle = self.handle()?;
        match image {
            Some(data) => handle.write_key_image(key, data),
            None => handle.clear_key(key),
        }
    }

    pub fn clear_all_keys(&self) -> Result<()> {
        self.handle()?.clear_all_keys()
    }

    /// Reset and release the device. Teardown failures are only logged.
    pub fn disconnect(&mut self) {
        match self.handle.take() {
            Some(handle) => {
                info!(serial = %handle.info().serial, "Disconnecting Stream Deck");
                release(handle, true);
            }
            None => debug!("Disconnect with no device open"),
        }
    }
}

fn release(mut handle: BoxedDevice, reset: bool) {
    if reset {
        if let Err(e) = handle.reset() {
            warn!(error = %e, "Reset during disconnect failed");
        }
    }
    if let Err(e) = handle.close() {
        warn!(error = %e, "Close during disconnect failed");
    }
}
