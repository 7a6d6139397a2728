//! State surviving restarts and damaged files.

use std::fs;

use sdp::model::{
    Action, ActionBinding, ActionType, Bindings, ButtonConfig, ButtonRequest, MAIN_PAGE, Page,
    Pages, Rgb, default_pages,
};
use sdp::config::path::resolve_config_dir;
use sdp::store::PersistenceStore;
use tempfile::TempDir;

use crate::common::env::with_home;
use crate::common::fixtures::TestDeck;

#[test]
fn test_state_survives_restart() {
    let mut deck = TestDeck::mini().connected();
    deck.controller.create_page("media").unwrap();
    deck.controller.switch_page("media").unwrap();
    deck.controller
        .set_button(
            &ButtonRequest::text(2, "Play")
                .with_colors([0.0, 128.0, 0.0], [255.0, 255.0, 255.0])
                .with_action("playerctl play-pause"),
            true,
        )
        .unwrap();
    deck.controller
        .set_action(5, "main", ActionType::Page, true)
        .unwrap();

    let restarted = deck.restart();

    // The current page is not persisted
    assert_eq!(restarted.current_page(), MAIN_PAGE);
    let play = &restarted.page("media").unwrap()[&2];
    assert_eq!(play.text.as_deref(), Some("Play"));
    assert_eq!(play.bg_color, Rgb(0, 128, 0));
    let bindings = restarted.bindings("media").unwrap();
    assert_eq!(
        bindings[&2].action,
        Action::Command("playerctl play-pause".to_string())
    );
    assert_eq!(bindings[&5].action, Action::SwitchPage(MAIN_PAGE.to_string()));
}

#[test]
fn test_documents_use_string_keys_and_colour_arrays() {
    let mut deck = TestDeck::mini().connected();
    deck.controller
        .set_button(
            &ButtonRequest::text(4, "Hi").with_colors([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]),
            true,
        )
        .unwrap();
    deck.controller
        .set_action(4, "page:main", ActionType::Command, true)
        .unwrap();

    let pages: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(deck.pages_file()).unwrap()).unwrap();
    let key = &pages["main"]["4"];
    assert_eq!(key["text"], "Hi");
    assert_eq!(key["bg_color"], serde_json::json!([1, 2, 3]));
    assert_eq!(key["text_color"], serde_json::json!([4, 5, 6]));
    assert_eq!(key["font_size"], 14);

    let buttons: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(deck.buttons_file()).unwrap()).unwrap();
    assert_eq!(buttons["main"]["4"]["action"], "page:main");
    assert_eq!(buttons["main"]["4"]["type"], "page");
}

#[test]
fn test_save_load_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = PersistenceStore::new(temp.path().join("nested"));

    let mut pages: Pages = default_pages();
    let mut gaming = Page::new();
    gaming.insert(
        0,
        ButtonConfig {
            text: Some("Fire".to_string()),
            image_path: Some("~/icons/fire.png".to_string()),
            bg_color: Rgb(200, 10, 10),
            text_color: Rgb(0, 0, 0),
            font_size: 22,
        },
    );
    pages.insert("gaming".to_string(), gaming);

    let mut bindings = Bindings::new();
    bindings.entry("gaming".to_string()).or_default().insert(
        0,
        ActionBinding::new(Action::SwitchPage(MAIN_PAGE.to_string())),
    );
    bindings.entry(MAIN_PAGE.to_string()).or_default().insert(
        3,
        ActionBinding::new(Action::Command("echo 'quoted' && true".to_string())),
    );

    store.try_save(&pages, &bindings).unwrap();
    let snapshot = store.load();

    assert_eq!(snapshot.pages, pages);
    assert_eq!(snapshot.bindings, bindings);
}

#[test]
fn test_malformed_pages_file_gives_fresh_state() {
    let deck = TestDeck::mini();
    fs::write(deck.pages_file(), "{ this is not json").unwrap();
    fs::write(deck.buttons_file(), "[1, 2, 3]").unwrap();

    let restarted = deck.restart();

    assert_eq!(restarted.pages(), &default_pages());
    assert!(restarted.bindings(MAIN_PAGE).is_none());
    assert_eq!(restarted.current_page(), MAIN_PAGE);
}

#[test]
fn test_pages_file_without_main_gives_fresh_state() {
    let deck = TestDeck::mini();
    fs::write(deck.pages_file(), r#"{"other": {}}"#).unwrap();

    let restarted = deck.restart();
    assert_eq!(restarted.pages(), &default_pages());
}

#[test]
fn test_binding_type_defaults_to_command() {
    let deck = TestDeck::mini();
    fs::write(deck.pages_file(), r#"{"main": {}}"#).unwrap();
    fs::write(
        deck.buttons_file(),
        r#"{"main": {"0": {"action": "echo hi"}, "1": {"action": "page:main"}}}"#,
    )
    .unwrap();

    let restarted = deck.restart();
    let bindings = restarted.bindings(MAIN_PAGE).unwrap();
    assert_eq!(bindings[&0].action, Action::Command("echo hi".to_string()));
    assert_eq!(bindings[&1].action, Action::SwitchPage(MAIN_PAGE.to_string()));
}

#[test]
fn test_saves_leave_no_stray_files() {
    let mut deck = TestDeck::mini();
    for name in ["a", "b", "c"] {
        deck.controller.create_page(name).unwrap();
    }

    let mut names: Vec<_> = fs::read_dir(deck.dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["buttons.json", "pages.json"]);
}

#[test]
fn test_default_config_dir_lives_under_home() {
    let home = TempDir::new().unwrap();
    let _guard = with_home(home.path().to_str().unwrap());

    let dir = resolve_config_dir(None).unwrap();
    assert_eq!(dir, home.path().join(".stream-deck-pages"));

    let explicit = home.path().join("elsewhere");
    assert_eq!(resolve_config_dir(Some(&explicit)).unwrap(), explicit);
}

#[test]
fn test_bad_entries_are_dropped_and_the_rest_survives_a_save() {
    let deck = TestDeck::mini();
    fs::write(
        deck.pages_file(),
        r#"{"main": {"0": {"text": "ok"}, "1": {"text": "hot", "bg_color": [300, 0, 0]}},
            "gaming": {"2": {"text": "Fire"}}}"#,
    )
    .unwrap();
    fs::write(
        deck.buttons_file(),
        r#"{"main": {"0": {"action": "echo ok"}, "1": {"action": "x", "type": "shell"}}}"#,
    )
    .unwrap();

    let mut restarted = deck.restart();
    assert_eq!(restarted.page(MAIN_PAGE).unwrap().len(), 1);
    assert_eq!(
        restarted.page("gaming").unwrap()[&2].text.as_deref(),
        Some("Fire")
    );
    assert_eq!(restarted.bindings(MAIN_PAGE).unwrap().len(), 1);

    // Saving writes back what was kept, not the defaults
    restarted.create_page("extra").unwrap();
    let pages: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(deck.pages_file()).unwrap()).unwrap();
    assert_eq!(pages["gaming"]["2"]["text"], "Fire");
    assert_eq!(pages["main"]["0"]["text"], "ok");
    assert!(pages["main"].get("1").is_none());
}
