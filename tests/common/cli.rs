//! Runner for the `sdp` binary.
//!
//! Every command gets its own config directory and a short connect pacing so
//! runs without hardware fail fast.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

/// A config directory plus a way to run `sdp` against it.
pub struct CliEnv {
    pub dir: TempDir,
}

impl Default for CliEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl CliEnv {
    /// Fresh directory with a `config.toml` that keeps connects quick.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be prepared.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(
            dir.path().join("config.toml"),
            "[connection]\nmin_interval_ms = 0\nmax_attempts = 1\n",
        )
        .expect("Failed to write config.toml");
        Self { dir }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `sdp` with `SDP_CONFIG_DIR` pointing at this directory.
    ///
    /// # Panics
    ///
    /// Panics if the binary was not built.
    #[must_use]
    pub fn sdp(&self) -> Command {
        let mut cmd = Command::cargo_bin("sdp").expect("sdp binary not built");
        cmd.env("SDP_CONFIG_DIR", self.dir.path())
            .env_remove("SDP_JSON")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Parsed `pages.json`.
    ///
    /// # Panics
    ///
    /// Panics if the file is missing or not JSON.
    #[must_use]
    pub fn pages_json(&self) -> serde_json::Value {
        read_json(&self.dir.path().join("pages.json"))
    }

    /// Parsed `buttons.json`.
    ///
    /// # Panics
    ///
    /// Panics if the file is missing or not JSON.
    #[must_use]
    pub fn buttons_json(&self) -> serde_json::Value {
        read_json(&self.dir.path().join("buttons.json"))
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(path).expect("Failed to read state file");
    serde_json::from_str(&raw).expect("State file is not JSON")
}
