//! Key presses flowing from the device through the event pump.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sdp::events::{SharedController, channel, run_event_loop, share};
use sdp::model::{ActionType, ButtonRequest, MAIN_PAGE};

use crate::common::fixtures::TestDeck;
use crate::common::init_test_logging;

/// Poll `check` until it holds or two seconds pass.
fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

fn current_page(shared: &SharedController) -> String {
    shared.lock().unwrap().current_page().to_string()
}

#[test]
fn test_presses_drive_commands_and_page_switches() {
    init_test_logging();
    let TestDeck {
        mut controller,
        device,
        launcher,
        dir: _dir,
        ..
    } = TestDeck::mini();

    controller.create_page("media").unwrap();
    controller
        .set_action(0, "page:media", ActionType::Command, true)
        .unwrap();
    controller
        .set_action(1, "echo main", ActionType::Command, true)
        .unwrap();
    controller.switch_page("media").unwrap();
    controller
        .set_action(0, MAIN_PAGE, ActionType::Page, true)
        .unwrap();
    controller
        .set_action(2, "playerctl next", ActionType::Command, true)
        .unwrap();
    controller.switch_page(MAIN_PAGE).unwrap();

    let (sender, receiver) = channel();
    controller.session_mut().set_event_sink(sender);
    controller.connect().unwrap();
    assert!(device.is_subscribed());

    let shared = share(controller);
    let pump = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || run_event_loop(&shared, receiver))
    };

    // Release events and unbound keys do nothing
    assert!(device.release_key(1));
    assert!(device.press_key(5));
    assert!(device.press_key(1));
    assert!(eventually(|| launcher.launched() == vec!["echo main"]));

    assert!(device.press_key(0));
    assert!(eventually(|| current_page(&shared) == "media"));

    assert!(device.press_key(2));
    assert!(eventually(|| launcher.launched().len() == 2));
    assert_eq!(launcher.launched()[1], "playerctl next");

    assert!(device.press_key(0));
    assert!(eventually(|| current_page(&shared) == MAIN_PAGE));

    shared.lock().unwrap().shutdown();
    let handled = pump.join().unwrap();
    assert_eq!(handled, 6);
    assert!(!device.is_subscribed());
}

#[test]
fn test_page_switch_press_redraws_device() {
    let TestDeck {
        mut controller,
        device,
        dir: _dir,
        ..
    } = TestDeck::mini();

    let (sender, receiver) = channel();
    controller.session_mut().set_event_sink(sender);
    controller.connect().unwrap();
    controller.create_page("two").unwrap();
    controller
        .set_button(&ButtonRequest::text(0, "Go").with_action("page:two"), true)
        .unwrap();
    controller.switch_page("two").unwrap();
    controller
        .set_button(&ButtonRequest::text(4, "Back").with_action("page:main"), true)
        .unwrap();
    controller.switch_page(MAIN_PAGE).unwrap();
    device.assert_key_has_image(0);
    device.assert_key_cleared(4);

    let shared = share(controller);
    let pump = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || run_event_loop(&shared, receiver))
    };

    device.press_key(0);
    assert!(eventually(|| current_page(&shared) == "two"));
    device.assert_key_cleared(0);
    device.assert_key_has_image(4);

    shared.lock().unwrap().shutdown();
    assert_eq!(pump.join().unwrap(), 1);
}

#[test]
fn test_press_on_unknown_target_page_is_ignored() {
    let TestDeck {
        mut controller,
        device,
        launcher,
        dir: _dir,
        ..
    } = TestDeck::mini();
    controller
        .set_action(3, "page:gone", ActionType::Command, true)
        .unwrap();

    let (sender, receiver) = channel();
    controller.session_mut().set_event_sink(sender);
    controller.connect().unwrap();
    let shared = share(controller);
    let pump = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || run_event_loop(&shared, receiver))
    };

    device.press_key(3);
    shared.lock().unwrap().shutdown();
    assert_eq!(pump.join().unwrap(), 1);
    assert_eq!(current_page(&shared), MAIN_PAGE);
    assert!(launcher.launched().is_empty());
}
