//! Test fixture helpers: mock-backed controllers and images on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use sdp::controller::Controller;
use sdp::device::mock::{MockBackend, MockDevice, MockDeviceBuilder};
use sdp::device::{ConnectionSettings, DeviceSession};
use sdp::image_ops::ResizeStrategy;
use sdp::launcher::RecordingLauncher;
use sdp::render::{FontCache, KeyRenderer};
use sdp::store::PersistenceStore;

/// Connection settings without pacing so tests do not sleep.
#[must_use]
pub fn fast_settings() -> ConnectionSettings {
    ConnectionSettings {
        min_interval: Duration::ZERO,
        ..ConnectionSettings::default()
    }
}

/// A controller over a mock device in a temporary config directory.
///
/// The device, backend and launcher are clones sharing state with the ones
/// inside the controller.
pub struct TestDeck {
    pub controller: Controller,
    pub device: MockDevice,
    pub backend: MockBackend,
    pub launcher: RecordingLauncher,
    pub dir: TempDir,
}

impl TestDeck {
    /// Mini (6 keys) with raw, unrotated key images.
    #[must_use]
    pub fn mini() -> Self {
        Self::with_device(MockDeviceBuilder::mini().raw_images().build())
    }

    /// XL (32 keys) with raw, unrotated key images.
    #[must_use]
    pub fn xl() -> Self {
        Self::with_device(MockDeviceBuilder::xl().raw_images().build())
    }

    #[must_use]
    pub fn with_device(device: MockDevice) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let backend = MockBackend::with_device(device.clone());
        let launcher = RecordingLauncher::new();
        let controller = build(dir.path(), backend.clone(), launcher.clone());
        Self {
            controller,
            device,
            backend,
            launcher,
            dir,
        }
    }

    /// Connected deck, panicking if the mock refuses.
    #[must_use]
    pub fn connected(mut self) -> Self {
        self.controller.connect().expect("mock connect failed");
        self
    }

    /// A second controller over the same directory and backend, as after a
    /// process restart.
    #[must_use]
    pub fn restart(&self) -> Controller {
        build(self.dir.path(), self.backend.clone(), self.launcher.clone())
    }

    #[must_use]
    pub fn pages_file(&self) -> PathBuf {
        self.dir.path().join("pages.json")
    }

    #[must_use]
    pub fn buttons_file(&self) -> PathBuf {
        self.dir.path().join("buttons.json")
    }
}

/// Controller wired to a mock backend and a label-only renderer.
#[must_use]
pub fn build(dir: &Path, backend: MockBackend, launcher: RecordingLauncher) -> Controller {
    let session = DeviceSession::new(Box::new(backend), fast_settings());
    Controller::new(
        PersistenceStore::new(dir),
        session,
        Box::new(KeyRenderer::new(
            FontCache::new(Vec::new()),
            ResizeStrategy::Fill,
        )),
        Box::new(launcher),
    )
}

/// Write a solid-colour PNG and return its path.
///
/// # Panics
///
/// Panics if the image cannot be written.
#[must_use]
pub fn solid_png(dir: &Path, name: &str, size: (u32, u32), color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(size.0, size.1, Rgb(color))
        .save(&path)
        .expect("Failed to write test image");
    path
}
