//! Common test utilities for the `sdp` crate.
//!
//! - `cli`: `assert_cmd` runner pointed at a throwaway config directory
//! - `env`: environment variable guards
//! - `fixtures`: mock-backed controllers and test images
#![allow(dead_code)]

pub mod cli;
pub mod env;
pub mod fixtures;

use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
