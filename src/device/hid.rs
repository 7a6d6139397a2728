//! Real Stream Deck backend.
//!
//! Wraps the `elgato-streamdeck` crate. An open deck is shared between the
//! handle and a reader thread that turns button state changes into
//! [`KeyEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use elgato_streamdeck::info::{ImageMirroring, ImageMode, ImageRotation, Kind};
use elgato_streamdeck::{StreamDeck, StreamDeckInput};
use hidapi::HidApi;
use tracing::{debug, info, trace, warn};

use super::info::{DeviceInfo, ImageEncoding, KeyEvent, KeyImageFormat, Mirror, Rotation};
use super::{BoxedBackend, BoxedDevice, DeviceBackend, DeviceHandle, KeyEventSender};
use crate::error::{DeckError, Result};

/// Read timeout per poll of the reader thread.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Pause between polls so writers can take the lock.
const POLL_PAUSE: Duration = Duration::from_millis(10);

fn device_error(e: impl std::fmt::Display) -> DeckError {
    DeckError::Device(e.to_string())
}

/// Backend over hidapi.
pub struct HidBackend {
    hid: Mutex<HidApi>,
}

impl HidBackend {
    /// Initialise hidapi.
    pub fn new() -> Result<Self> {
        let hid = elgato_streamdeck::new_hidapi().map_err(device_error)?;
        Ok(Self {
            hid: Mutex::new(hid),
        })
    }

    fn hid(&self) -> MutexGuard<'_, HidApi> {
        self.hid.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceBackend for HidBackend {
    fn name(&self) -> &'static str {
        "hid"
    }

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let mut hid = self.hid();
        // Pick up devices plugged in since the last call
        hid.refresh_devices().map_err(device_error)?;

        let devices = elgato_streamdeck::list_devices(&hid)
            .into_iter()
            .map(|(kind, serial)| describe(kind, serial, String::new()))
            .collect::<Vec<_>>();
        debug!(count = devices.len(), "Enumerated Stream Deck devices");
        Ok(devices)
    }

    fn open(&self, device: &DeviceInfo) -> Result<BoxedDevice> {
        let hid = self.hid();
        let kind = elgato_streamdeck::list_devices(&hid)
            .into_iter()
            .find(|(_, serial)| *serial == device.serial)
            .map(|(kind, _)| kind)
            .ok_or(DeckError::NoDeviceFound)?;

        let deck = StreamDeck::connect(&hid, kind, &device.serial).map_err(|e| {
            DeckError::Device(format!("failed to open {}: {e}", device.serial))
        })?;

        let firmware = deck
            .firmware_version()
            .unwrap_or_else(|_| "unknown".to_string());
        let info = describe(kind, device.serial.clone(), firmware);
        info!(serial = %info.serial, product = %info.product_name, "Opened Stream Deck");

        Ok(Box::new(HidDevice {
            deck: Arc::new(Mutex::new(deck)),
            info,
            reader: None,
        }))
    }
}

/// Stub backend for hosts where HID cannot be initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl DeviceBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        Ok(Vec::new())
    }

    fn open(&self, _device: &DeviceInfo) -> Result<BoxedDevice> {
        Err(DeckError::NoDeviceFound)
    }
}

/// The HID backend when available, otherwise the stub.
pub fn select_backend() -> BoxedBackend {
    match HidBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            warn!(error = %e, "HID unavailable, no devices will be found");
            Box::new(UnavailableBackend)
        }
    }
}

struct Reader {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// One open deck.
struct HidDevice {
    deck: Arc<Mutex<StreamDeck>>,
    info: DeviceInfo,
    reader: Option<Reader>,
}

impl HidDevice {
    fn deck(&self) -> MutexGuard<'_, StreamDeck> {
        self.deck.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.stop.store(true, Ordering::SeqCst);
            if reader.thread.join().is_err() {
                warn!(serial = %self.info.serial, "Key reader thread panicked");
            }
        }
    }
}

impl DeviceHandle for HidDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn key_count(&self) -> Result<u8> {
        // Serial number is a feature report, so it really hits the device
        self.deck().serial_number().map_err(device_error)?;
        Ok(self.info.key_count)
    }

    fn reset(&self) -> Result<()> {
        self.deck().reset().map_err(device_error)
    }

    fn set_brightness(&self, percent: u8) -> Result<()> {
        self.deck().set_brightness(percent).map_err(device_error)
    }

    fn write_key_image(&self, key: u8, data: &[u8]) -> Result<()> {
        let deck = self.deck();
        deck.write_image(key, data).map_err(device_error)?;
        deck.flush().map_err(device_error)
    }

    fn clear_key(&self, key: u8) -> Result<()> {
        let deck = self.deck();
        deck.clear_button_image(key).map_err(device_error)?;
        deck.flush().map_err(device_error)
    }

    fn clear_all_keys(&self) -> Result<()> {
        let deck = self.deck();
        deck.clear_all_button_images().map_err(device_error)?;
        deck.flush().map_err(device_error)
    }

    fn subscribe(&mut self, sink: KeyEventSender) -> Result<()> {
        self.stop_reader();

        let stop = Arc::new(AtomicBool::new(false));
        let deck = Arc::clone(&self.deck);
        let key_count = usize::from(self.info.key_count);
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("sdp-keys-{}", self.info.serial))
            .spawn(move || read_keys(&deck, &flag, &sink, key_count))
            .map_err(DeckError::Io)?;

        self.reader = Some(Reader { stop, thread });
        debug!(serial = %self.info.serial, "Key reader started");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stop_reader();
        debug!(serial = %self.info.serial, "Closed Stream Deck");
        Ok(())
    }
}

impl Drop for HidDevice {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

/// Poll button states and forward edges until stopped, the device fails or
/// nobody listens anymore.
fn read_keys(deck: &Mutex<StreamDeck>, stop: &AtomicBool, sink: &KeyEventSender, key_count: usize) {
    let mut previous = vec![false; key_count];

    while !stop.load(Ordering::SeqCst) {
        let input = deck
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_input(Some(READ_TIMEOUT));

        match input {
            Ok(StreamDeckInput::ButtonStateChange(states)) => {
                for (index, (&now, before)) in states.iter().zip(previous.iter_mut()).enumerate() {
                    if now == *before {
                        continue;
                    }
                    *before = now;
                    let Ok(key) = u8::try_from(index) else {
                        continue;
                    };
                    trace!(key, pressed = now, "Key state changed");
                    if sink.send(KeyEvent { key, pressed: now }).is_err() {
                        debug!("Key event receiver gone, stopping reader");
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Reading key input failed, stopping reader");
                return;
            }
        }

        thread::sleep(POLL_PAUSE);
    }
}

fn describe(kind: Kind, serial: String, firmware_version: String) -> DeviceInfo {
    DeviceInfo {
        serial,
        product_name: kind_to_name(kind),
        firmware_version,
        key_count: kind.key_count(),
        rows: kind.row_count(),
        cols: kind.column_count(),
        image_format: native_format(kind),
        kind: format!("{kind:?}"),
    }
}

fn native_format(kind: Kind) -> KeyImageFormat {
    let format = kind.key_image_format();
    KeyImageFormat {
        width: u32::try_from(format.size.0).unwrap_or(0),
        height: u32::try_from(format.size.1).unwrap_or(0),
        encoding: match format.mode {
            ImageMode::JPEG => ImageEncoding::Jpeg,
            ImageMode::BMP => ImageEncoding::Bmp,
            ImageMode::None => ImageEncoding::Raw,
        },
        rotation: match format.rotation {
            ImageRotation::Rot0 => Rotation::Rot0,
            ImageRotation::Rot90 => Rotation::Rot90,
            ImageRotation::Rot180 => Rotation::Rot180,
            ImageRotation::Rot270 => Rotation::Rot270,
        },
        mirror: match format.mirror {
            ImageMirroring::None => Mirror::None,
            ImageMirroring::X => Mirror::X,
            ImageMirroring::Y => Mirror::Y,
            ImageMirroring::Both => Mirror::Both,
        },
    }
}

/// Convert device kind to human-readable name.
fn kind_to_name(kind: Kind) -> String {
    match kind {
        Kind::Original => "Stream Deck (Original)",
        Kind::OriginalV2 => "Stream Deck (Original V2)",
        Kind::Mini => "Stream Deck Mini",
        Kind::MiniMk2 => "Stream Deck Mini MK.2",
        Kind::Xl => "Stream Deck XL",
        Kind::XlV2 => "Stream Deck XL V2",
        Kind::Mk2 => "Stream Deck MK.2",
        Kind::Pedal => "Stream Deck Pedal",
        Kind::Plus => "Stream Deck +",
        Kind::Neo => "Stream Deck Neo",
        _ => "Unknown Stream Deck",
    }
    .to_string()
}
