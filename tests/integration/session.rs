//! Connection pacing, exhaustion and health checks seen through the controller.

use std::time::{Duration, Instant};

use sdp::device::mock::{MockBackend, MockDeviceBuilder, Operation};
use sdp::device::{ConnectionSettings, DeviceSession};
use sdp::error::DeckError;
use sdp::model::{ButtonRequest, MAIN_PAGE};

use crate::common::fixtures::TestDeck;

#[test]
fn test_connect_draws_current_page() {
    let mut deck = TestDeck::mini().connected();
    deck.controller
        .set_button(&ButtonRequest::text(1, "One"), true)
        .unwrap();

    // A later process connects and redraws from disk
    let device = MockDeviceBuilder::mini().raw_images().build();
    deck.backend.unplug_all();
    deck.backend.plug(device.clone());
    let mut restarted = deck.restart();
    let info = restarted.connect().unwrap();

    assert!(info.connected);
    assert_eq!(info.key_count, Some(6));
    assert_eq!(info.current_page, MAIN_PAGE);
    device.assert_key_has_image(1);
    device.assert_key_cleared(0);
}

#[test]
fn test_unplugged_device_is_detected_before_writes() {
    let mut deck = TestDeck::mini().connected();
    deck.backend.unplug_all();

    let err = deck
        .controller
        .set_button(&ButtonRequest::text(0, "x"), true)
        .unwrap_err();
    assert!(matches!(err, DeckError::DeviceDisconnected));
    assert!(!deck.controller.info().connected);

    // The handle is gone, so the next call reports not connected
    let err = deck.controller.clear_button(0).unwrap_err();
    assert!(matches!(err, DeckError::DeviceNotConnected));
    assert!(deck.controller.page(MAIN_PAGE).unwrap().is_empty());
}

#[test]
fn test_reconnect_after_replug() {
    let mut deck = TestDeck::mini().connected();
    deck.controller
        .set_button(&ButtonRequest::text(3, "Three"), true)
        .unwrap();
    deck.controller.set_brightness(25).unwrap();

    deck.backend.unplug_all();
    assert!(deck.controller.set_brightness(30).is_err());

    let replacement = MockDeviceBuilder::mini().raw_images().build();
    deck.backend.plug(replacement.clone());
    deck.controller.connect().unwrap();

    // Brightness from before the unplug is reapplied
    assert_eq!(replacement.get_brightness(), 25);
    replacement.assert_key_has_image(3);
    assert_eq!(deck.controller.info().brightness, 25);
}

#[test]
fn test_connect_gives_up_after_three_failures() {
    let mut deck = TestDeck::with_device(MockDeviceBuilder::mini().build());
    deck.backend.unplug_all();

    assert!(matches!(
        deck.controller.connect(),
        Err(DeckError::NoDeviceFound)
    ));
    assert!(matches!(
        deck.controller.connect(),
        Err(DeckError::NoDeviceFound)
    ));
    assert!(matches!(
        deck.controller.connect(),
        Err(DeckError::ConnectionExhausted { attempts: 3 })
    ));

    // Exhausted sessions do not touch the backend again
    let enumerations = deck.backend.enumerations();
    deck.backend.plug(MockDeviceBuilder::mini().build());
    assert!(matches!(
        deck.controller.connect(),
        Err(DeckError::ConnectionExhausted { .. })
    ));
    assert_eq!(deck.backend.enumerations(), enumerations);

    deck.controller.session_mut().reset_attempts();
    assert!(deck.controller.connect().is_ok());
}

#[test]
fn test_failed_opens_then_success_resets_counter() {
    let mut deck = TestDeck::mini();
    deck.backend.fail_next_opens(2);

    assert!(deck.controller.connect().is_err());
    assert!(deck.controller.connect().is_err());
    assert!(deck.controller.connect().is_ok());
    assert_eq!(deck.controller.session().failed_attempts(), 0);
    assert_eq!(deck.backend.opens(), 3);
}

#[test]
fn test_connect_attempts_are_paced() {
    let settings = ConnectionSettings {
        min_interval: Duration::from_millis(150),
        ..ConnectionSettings::default()
    };
    let backend = MockBackend::with_device(MockDeviceBuilder::mini().build());
    let mut session = DeviceSession::new(Box::new(backend), settings);

    let start = Instant::now();
    session.connect().unwrap();
    assert!(start.elapsed() < Duration::from_millis(150));
    session.connect().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[test]
fn test_brightness_is_clamped() {
    let mut deck = TestDeck::mini().connected();
    assert_eq!(deck.controller.set_brightness(-20).unwrap(), 0);
    assert_eq!(deck.device.get_brightness(), 0);
    assert_eq!(deck.controller.set_brightness(250).unwrap(), 100);
    assert_eq!(deck.device.get_brightness(), 100);
}

#[test]
fn test_shutdown_resets_and_closes() {
    let mut deck = TestDeck::mini().connected();
    deck.device.clear_operations();

    deck.controller.shutdown();

    deck.device
        .assert_operations(&[Operation::Reset, Operation::Close]);
    assert!(!deck.controller.info().connected);
    // Second shutdown is a no-op
    deck.controller.shutdown();
    assert_eq!(deck.device.operation_count(), 2);
}
