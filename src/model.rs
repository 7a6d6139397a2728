//! Page, button and action data model.
//!
//! These types are persisted as two JSON documents (see [`crate::store`]):
//! key indices become string object keys and colours become `[r, g, b]`
//! arrays.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Name of the page that always exists.
pub const MAIN_PAGE: &str = "main";

/// Prefix marking a page-switch action inside a free-text action string.
pub const PAGE_ACTION_PREFIX: &str = "page:";

/// Default point size for button labels.
pub const DEFAULT_FONT_SIZE: u32 = 14;

/// An RGB colour, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Self = Self(0, 0, 0);
    pub const WHITE: Self = Self(255, 255, 255);

    /// Components as an array.
    pub const fn channels(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0, self.1, self.2)
    }
}

/// Visual intent for one key on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default = "default_bg_color")]
    pub bg_color: Rgb,
    #[serde(default = "default_text_color")]
    pub text_color: Rgb,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

const fn default_bg_color() -> Rgb {
    Rgb::BLACK
}

const fn default_text_color() -> Rgb {
    Rgb::WHITE
}

const fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            text: None,
            image_path: None,
            bg_color: Rgb::BLACK,
            text_color: Rgb::WHITE,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// Wire-level action type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Command,
    Page,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Page => f.write_str("page"),
        }
    }
}

/// What pressing a key does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Hand the string to the external command launcher.
    Command(String),
    /// Switch to the named page.
    SwitchPage(String),
}

impl Action {
    /// Decode the stored `(action, type)` pair.
    ///
    /// A `page:` prefix or a `page` type both mean a page switch; the prefix
    /// is stripped when present.
    pub fn decode(action: &str, kind: ActionType) -> Self {
        if let Some(target) = action.strip_prefix(PAGE_ACTION_PREFIX) {
            return Self::SwitchPage(target.trim().to_string());
        }
        match kind {
            ActionType::Page => Self::SwitchPage(action.trim().to_string()),
            ActionType::Command => Self::Command(action.to_string()),
        }
    }

    /// Encode back to the stored `(action, type)` pair.
    pub fn encode(&self) -> (String, ActionType) {
        match self {
            Self::Command(command) => (command.clone(), ActionType::Command),
            Self::SwitchPage(page) => (format!("{PAGE_ACTION_PREFIX}{page}"), ActionType::Page),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(command) => write!(f, "command `{command}`"),
            Self::SwitchPage(page) => write!(f, "switch to page '{page}'"),
        }
    }
}

/// Persisted behavior for one key on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBinding", into = "RawBinding")]
pub struct ActionBinding {
    pub action: Action,
}

impl ActionBinding {
    pub const fn new(action: Action) -> Self {
        Self { action }
    }
}

/// On-disk shape of an [`ActionBinding`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBinding {
    action: String,
    #[serde(rename = "type", default)]
    kind: ActionType,
}

impl TryFrom<RawBinding> for ActionBinding {
    type Error = String;

    fn try_from(raw: RawBinding) -> Result<Self, Self::Error> {
        if raw.action.trim().is_empty() {
            return Err("binding has an empty action".to_string());
        }
        Ok(Self::new(Action::decode(&raw.action, raw.kind)))
    }
}

impl From<ActionBinding> for RawBinding {
    fn from(binding: ActionBinding) -> Self {
        let (action, kind) = binding.action.encode();
        Self { action, kind }
    }
}

/// Button configs of one page, keyed by key index.
pub type Page = BTreeMap<u8, ButtonConfig>;

/// All pages, keyed by page name.
pub type Pages = BTreeMap<String, Page>;

/// Action bindings of one page, keyed by key index.
pub type PageBindings = BTreeMap<u8, ActionBinding>;

/// All action bindings, keyed by page name.
pub type Bindings = BTreeMap<String, PageBindings>;

/// Fresh page set containing only `main`.
pub fn default_pages() -> Pages {
    let mut pages = Pages::new();
    pages.insert(MAIN_PAGE.to_string(), Page::new());
    pages
}

/// Caller request to configure one button.
///
/// Arguments arrive already type-coerced but not yet validated; colours
/// are raw numbers so that out-of-range input reaches the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonRequest {
    pub key: i64,
    pub text: Option<String>,
    pub image_path: Option<String>,
    pub bg_color: Option<Vec<f64>>,
    pub text_color: Option<Vec<f64>>,
    pub font_size: Option<u32>,
    /// Optional action bound after the appearance is applied.
    pub action: Option<String>,
}

impl ButtonRequest {
    /// Request for a text button with default colours.
    pub fn text(key: i64, text: impl Into<String>) -> Self {
        Self {
            key,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Request for an image button.
    pub fn image(key: i64, path: impl Into<String>) -> Self {
        Self {
            key,
            image_path: Some(path.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_colors(mut self, bg: [f64; 3], fg: [f64; 3]) -> Self {
        self.bg_color = Some(bg.to_vec());
        self.text_color = Some(fg.to_vec());
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}
