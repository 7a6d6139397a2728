//! Stream Deck pages - named pages of labelled keys with bound actions.
//!
//! This library exposes the core of the `sdp` CLI for use in tests and
//! other front ends.
//!
//! # Modules
//!
//! - `controller`: Page/button orchestration over a device session
//! - `device`: Device abstraction layer (HID, stub and mock backends)
//! - `render`: Key face composition and font cache
//! - `store`: JSON persistence of pages and action bindings
//! - `validate`: Key, page-name and colour validation
//! - `events`: Key event pump
//! - `error`: Error types with user-recoverable hints
//! - `config`: `config.toml` handling and config directory resolution
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod events;
pub mod image_ops;
pub mod launcher;
pub mod logging;
pub mod model;
pub mod render;
pub mod store;
pub mod validate;
