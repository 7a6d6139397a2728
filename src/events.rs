//! Key event pump.
//!
//! Device reader threads only send [`KeyEvent`]s. A single consumer applies
//! them to the shared controller under its mutex, so dispatch is serialised
//! with caller-driven operations.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, trace};

use crate::controller::Controller;
use crate::device::{KeyEventReceiver, KeyEventSender};

/// Controller shared between callers and the event pump.
pub type SharedController = Arc<Mutex<Controller>>;

/// Wrap a controller for sharing.
pub fn share(controller: Controller) -> SharedController {
    Arc::new(Mutex::new(controller))
}

/// New key event channel.
pub fn channel() -> (KeyEventSender, KeyEventReceiver) {
    unbounded_channel()
}

/// Apply events until every sender is gone; returns how many were handled.
///
/// Blocks the calling thread, so run it on a dedicated thread or through
/// `tokio::task::spawn_blocking`.
pub fn run_event_loop(shared: &SharedController, mut events: KeyEventReceiver) -> usize {
    debug!("Key event loop started");
    let mut handled = 0;

    while let Some(event) = events.blocking_recv() {
        trace!(key = event.key, pressed = event.pressed, "Key event");
        shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_key_event(event.key, event.pressed);
        handled += 1;
    }

    info!(handled, "Key event loop finished");
    handled
}
