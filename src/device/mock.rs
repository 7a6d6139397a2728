//! Mock devices for testing without hardware.
//!
//! A [`MockDevice`] records every operation and supports assertions. Clones
//! share state, so a test keeps one clone while the session owns another.
//! A [`MockBackend`] hands out mock devices and can simulate unplugged
//! hardware and failing opens.
//!
//! # Example
//!
//! ```rust,ignore
//! use sdp::device::mock::{MockBackend, MockDevice, Operation};
//! use sdp::device::{ConnectionSettings, DeviceSession};
//!
//! let device = MockDevice::xl();
//! let backend = MockBackend::with_device(device.clone());
//! let mut session = DeviceSession::new(Box::new(backend), ConnectionSettings::default());
//!
//! session.connect().unwrap();
//! device.assert_contains(&Operation::Reset);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use super::info::{DeviceInfo, DeviceModel, ImageEncoding, KeyEvent, KeyImageFormat, Mirror, Rotation};
use super::{BoxedDevice, DeviceBackend, DeviceHandle, KeyEventSender};
use crate::error::{DeckError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Recorded operation for assertions.
///
/// Health check round trips are counted separately, see
/// [`MockDevice::round_trips`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Reset,
    SetBrightness { level: u8 },
    WriteKeyImage { key: u8, bytes: usize },
    ClearKey { key: u8 },
    ClearAllKeys,
    Subscribe,
    Close,
}

/// State of a key on the mock device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyState {
    /// Key is cleared (black)
    Clear,
    /// Key shows the last written image data
    Image(Vec<u8>),
}

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail after N operations (for testing error recovery).
    pub fail_after_ops: Option<usize>,
    /// Specific keys that should fail on operations.
    pub failing_keys: Vec<u8>,
}

struct MockState {
    brightness: AtomicU8,
    keys: Mutex<Vec<KeyState>>,
    operation_log: Mutex<Vec<Operation>>,
    error_injection: Mutex<Option<DeckError>>,
    config: Mutex<MockConfig>,
    op_count: AtomicUsize,
    round_trips: AtomicUsize,
    connected: AtomicBool,
    sink: Mutex<Option<KeyEventSender>>,
}

/// Mock device for testing without real hardware.
#[derive(Clone)]
pub struct MockDevice {
    info: DeviceInfo,
    state: Arc<MockState>,
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("serial", &self.info.serial)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl MockDevice {
    /// Create a new mock device for the specified model.
    #[must_use]
    pub fn new(model: DeviceModel) -> Self {
        let (cols, rows) = model.layout();
        let key_count = model.key_count();

        debug!(?model, "Creating mock device");

        Self {
            info: DeviceInfo {
                serial: format!("MOCK-{model:?}-001"),
                product_name: model.display_name().to_string(),
                firmware_version: "1.0.0-mock".to_string(),
                key_count,
                rows,
                cols,
                image_format: model.image_format(),
                kind: format!("{model:?}"),
            },
            state: Arc::new(MockState {
                brightness: AtomicU8::new(100),
                keys: Mutex::new(vec![KeyState::Clear; usize::from(key_count)]),
                operation_log: Mutex::new(Vec::new()),
                error_injection: Mutex::new(None),
                config: Mutex::new(MockConfig::default()),
                op_count: AtomicUsize::new(0),
                round_trips: AtomicUsize::new(0),
                connected: AtomicBool::new(true),
                sink: Mutex::new(None),
            }),
        }
    }

    /// Create mock for Stream Deck XL (most common for testing).
    #[must_use]
    pub fn xl() -> Self {
        Self::new(DeviceModel::Xl)
    }

    /// Create mock for Stream Deck Mini.
    #[must_use]
    pub fn mini() -> Self {
        Self::new(DeviceModel::Mini)
    }

    /// Create mock for Stream Deck MK.2.
    #[must_use]
    pub fn mk2() -> Self {
        Self::new(DeviceModel::Mk2)
    }

    // === Configuration ===

    /// Configure mock behavior.
    pub fn set_config(&self, config: MockConfig) {
        *lock(&self.state.config) = config;
    }

    /// Inject an error for the next operation.
    pub fn inject_error(&self, error: DeckError) {
        *lock(&self.state.error_injection) = Some(error);
    }

    /// Simulate the cable being pulled: every call fails from now on.
    pub fn disconnect(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
    }

    /// Set device as connected.
    pub fn reconnect(&self) {
        self.state.connected.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    // === Input Simulation ===

    /// Send a key event to the subscriber, if any.
    ///
    /// Returns false when nothing is subscribed or the receiver is gone.
    pub fn send_key(&self, key: u8, pressed: bool) -> bool {
        lock(&self.state.sink)
            .as_ref()
            .is_some_and(|sink| sink.send(KeyEvent { key, pressed }).is_ok())
    }

    /// Simulate a key press.
    pub fn press_key(&self, key: u8) -> bool {
        self.send_key(key, true)
    }

    /// Simulate a key release.
    pub fn release_key(&self, key: u8) -> bool {
        self.send_key(key, false)
    }

    /// True while a key event sink is attached.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        lock(&self.state.sink).is_some()
    }

    // === Assertions ===

    /// Get all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        lock(&self.state.operation_log).clone()
    }

    /// Get the number of operations performed.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        lock(&self.state.operation_log).len()
    }

    /// Number of key count round trips (health checks) performed.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.state.round_trips.load(Ordering::SeqCst)
    }

    /// Assert specific operations were performed.
    ///
    /// # Panics
    ///
    /// Panics if the operations don't match.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "Operation mismatch.\nExpected: {expected:#?}\nActual: {actual:#?}",
        );
    }

    /// Assert no operations were performed.
    ///
    /// # Panics
    ///
    /// Panics if any operations were recorded.
    pub fn assert_no_operations(&self) {
        let ops = self.operations();
        assert!(ops.is_empty(), "Expected no operations, but found: {ops:#?}");
    }

    /// Assert a specific operation was performed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    /// Get the state of a specific key.
    #[must_use]
    pub fn get_key_state(&self, key: u8) -> Option<KeyState> {
        lock(&self.state.keys).get(usize::from(key)).cloned()
    }

    /// Image data currently shown on a key.
    #[must_use]
    pub fn key_image(&self, key: u8) -> Option<Vec<u8>> {
        match self.get_key_state(key) {
            Some(KeyState::Image(data)) => Some(data),
            _ => None,
        }
    }

    /// Assert key has an image.
    ///
    /// # Panics
    ///
    /// Panics if the key doesn't have an image.
    pub fn assert_key_has_image(&self, key: u8) {
        match self.get_key_state(key) {
            Some(KeyState::Image(_)) => {}
            other => panic!("Key {key} expected to have image, but has: {other:?}"),
        }
    }

    /// Assert key is cleared.
    ///
    /// # Panics
    ///
    /// Panics if the key is not cleared.
    pub fn assert_key_cleared(&self, key: u8) {
        match self.get_key_state(key) {
            None | Some(KeyState::Clear) => {}
            other => panic!("Key {key} expected to be cleared, but has: {other:?}"),
        }
    }

    /// Get current brightness level.
    #[must_use]
    pub fn get_brightness(&self) -> u8 {
        self.state.brightness.load(Ordering::SeqCst)
    }

    /// Clear the operation log for fresh assertions.
    pub fn clear_operations(&self) {
        lock(&self.state.operation_log).clear();
        self.state.op_count.store(0, Ordering::SeqCst);
        self.state.round_trips.store(0, Ordering::SeqCst);
    }

    // === Internal Helpers ===

    fn record_op(&self, op: Operation) {
        trace!(?op, "Recording operation");
        lock(&self.state.operation_log).push(op);
        self.state.op_count.fetch_add(1, Ordering::SeqCst);
    }

    fn check_error(&self) -> Result<()> {
        if let Some(error) = lock(&self.state.error_injection).take() {
            return Err(error);
        }

        if !self.is_connected() {
            return Err(DeckError::Device("Mock device disconnected".to_string()));
        }

        if let Some(limit) = lock(&self.state.config).fail_after_ops {
            if self.state.op_count.load(Ordering::SeqCst) >= limit {
                return Err(DeckError::Device(
                    "Mock failure after ops limit".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn check_key(&self, key: u8) -> Result<()> {
        if lock(&self.state.config).failing_keys.contains(&key) {
            return Err(DeckError::Device(format!("Mock key {key} configured to fail")));
        }
        if key >= self.info.key_count {
            return Err(DeckError::Device(format!(
                "Mock key {key} out of range (device has {})",
                self.info.key_count
            )));
        }
        Ok(())
    }

    fn set_key(&self, key: u8, state: KeyState) {
        if let Some(slot) = lock(&self.state.keys).get_mut(usize::from(key)) {
            *slot = state;
        }
    }
}

impl DeviceHandle for MockDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn key_count(&self) -> Result<u8> {
        self.check_error()?;
        self.state.round_trips.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.key_count)
    }

    fn reset(&self) -> Result<()> {
        self.check_error()?;
        self.record_op(Operation::Reset);
        for key in lock(&self.state.keys).iter_mut() {
            *key = KeyState::Clear;
        }
        Ok(())
    }

    fn set_brightness(&self, percent: u8) -> Result<()> {
        self.check_error()?;
        self.record_op(Operation::SetBrightness { level: percent });
        self.state.brightness.store(percent.min(100), Ordering::SeqCst);
        Ok(())
    }

    fn write_key_image(&self, key: u8, data: &[u8]) -> Result<()> {
        self.check_error()?;
        self.check_key(key)?;
        self.record_op(Operation::WriteKeyImage {
            key,
            bytes: data.len(),
        });
        self.set_key(key, KeyState::Image(data.to_vec()));
        Ok(())
    }

    fn clear_key(&self, key: u8) -> Result<()> {
        self.check_error()?;
        self.check_key(key)?;
        self.record_op(Operation::ClearKey { key });
        self.set_key(key, KeyState::Clear);
        Ok(())
    }

    fn clear_all_keys(&self) -> Result<()> {
        self.check_error()?;
        self.record_op(Operation::ClearAllKeys);
        for key in lock(&self.state.keys).iter_mut() {
            *key = KeyState::Clear;
        }
        Ok(())
    }

    fn subscribe(&mut self, sink: KeyEventSender) -> Result<()> {
        self.check_error()?;
        self.record_op(Operation::Subscribe);
        *lock(&self.state.sink) = Some(sink);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.record_op(Operation::Close);
        lock(&self.state.sink).take();
        self.check_error()
    }
}

/// Builder for creating `MockDevice` with common configurations.
pub struct MockDeviceBuilder {
    model: DeviceModel,
    config: MockConfig,
    initial_brightness: u8,
    image_format: Option<KeyImageFormat>,
    serial: Option<String>,
}

impl MockDeviceBuilder {
    /// Create a new builder for the specified model.
    #[must_use]
    pub fn new(model: DeviceModel) -> Self {
        Self {
            model,
            config: MockConfig::default(),
            initial_brightness: 100,
            image_format: None,
            serial: None,
        }
    }

    /// Create a builder for Stream Deck XL.
    #[must_use]
    pub fn xl() -> Self {
        Self::new(DeviceModel::Xl)
    }

    /// Create a builder for Stream Deck Mini.
    #[must_use]
    pub fn mini() -> Self {
        Self::new(DeviceModel::Mini)
    }

    /// Set specific keys to fail.
    #[must_use]
    pub fn with_failing_keys(mut self, keys: Vec<u8>) -> Self {
        self.config.failing_keys = keys;
        self
    }

    /// Set initial brightness.
    #[must_use]
    pub fn with_brightness(mut self, level: u8) -> Self {
        self.initial_brightness = level;
        self
    }

    #[must_use]
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Use unrotated raw RGB key images so tests can inspect pixels.
    #[must_use]
    pub fn raw_images(mut self) -> Self {
        let (width, height) = self.model.image_format().size();
        self.image_format = Some(KeyImageFormat {
            width,
            height,
            encoding: ImageEncoding::Raw,
            rotation: Rotation::Rot0,
            mirror: Mirror::None,
        });
        self
    }

    /// Build the mock device.
    #[must_use]
    pub fn build(self) -> MockDevice {
        let mut device = MockDevice::new(self.model);
        if let Some(format) = self.image_format {
            device.info.image_format = format;
        }
        if let Some(serial) = self.serial {
            device.info.serial = serial;
        }
        device.set_config(self.config);
        device
            .state
            .brightness
            .store(self.initial_brightness, Ordering::SeqCst);
        device
    }
}

#[derive(Default)]
struct BackendState {
    devices: Mutex<Vec<MockDevice>>,
    failing_opens: AtomicU32,
    enumerations: AtomicUsize,
    opens: AtomicUsize,
}

/// Backend serving mock devices.
///
/// Clones share state, so tests keep a clone for assertions and hot-plug.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<BackendState>,
}

impl MockBackend {
    /// Backend with nothing attached.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backend with one attached device.
    #[must_use]
    pub fn with_device(device: MockDevice) -> Self {
        let backend = Self::default();
        backend.plug(device);
        backend
    }

    /// Attach a device.
    pub fn plug(&self, device: MockDevice) {
        lock(&self.state.devices).push(device);
    }

    /// Detach every device; open handles are marked disconnected.
    pub fn unplug_all(&self) {
        for device in lock(&self.state.devices).drain(..) {
            device.disconnect();
        }
    }

    /// Make the next `count` opens fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.state.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Number of enumerations performed.
    #[must_use]
    pub fn enumerations(&self) -> usize {
        self.state.enumerations.load(Ordering::SeqCst)
    }

    /// Number of open attempts performed.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }
}

impl DeviceBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        self.state.enumerations.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.state.devices)
            .iter()
            .map(|device| device.info.clone())
            .collect())
    }

    fn open(&self, info: &DeviceInfo) -> Result<BoxedDevice> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);

        let failing = self.state.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.state.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(DeckError::Device("Mock open failure".to_string()));
        }

        let device = lock(&self.state.devices)
            .iter()
            .find(|device| device.info.serial == info.serial)
            .cloned()
            .ok_or(DeckError::NoDeviceFound)?;
        device.reconnect();
        Ok(Box::new(device))
    }
}
