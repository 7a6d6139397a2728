//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::{ActionType, ButtonRequest};
use crate::validate::parse_color_arg;

/// Stream Deck pages - named pages of labelled keys with bound actions.
///
/// State lives in ~/.stream-deck-pages (pages.json, buttons.json, config.toml).
#[derive(Parser, Debug)]
#[command(name = "sdp", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON output for scripts and agents
    #[arg(long, global = true, env = "SDP_JSON")]
    pub json: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Config directory holding pages.json and buttons.json
    #[arg(long, global = true, env = "SDP_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Switch to this page before running the command
    #[arg(long, short = 'p', global = true, value_name = "NAME")]
    pub page: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Device ===
    /// Connect, render the current page and run key actions until Ctrl-C
    Serve,

    /// Show device and page information
    Info,

    /// Set display brightness (0-100, out-of-range values are clamped)
    Brightness(BrightnessArgs),

    // === Buttons ===
    /// Set a key's label or image on the current page
    SetButton(SetButtonArgs),

    /// Set several keys from a JSON file of button requests
    SetButtons(SetButtonsArgs),

    /// Bind an action to a key on the current page
    SetAction(SetActionArgs),

    /// Clear a key on the current page
    ClearButton(ClearButtonArgs),

    /// Clear every key on the device
    ClearAll,

    // === Pages ===
    /// Create, switch, delete or list pages
    #[command(subcommand)]
    Page(PageCommand),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum PageCommand {
    /// Create an empty page
    Create(PageArgs),
    /// Make a page current and redraw the device
    Switch(PageArgs),
    /// Delete a page (main cannot be deleted)
    Delete(PageArgs),
    /// List pages
    List,
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct PageArgs {
    /// Page name (letters, digits, spaces, '-' and '_')
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct BrightnessArgs {
    /// Brightness level (0-100)
    #[arg(allow_negative_numbers = true)]
    pub level: i64,
}

/// Unvalidated `r,g,b` components; range checks happen in the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorArg(pub Vec<f64>);

fn parse_color(raw: &str) -> Result<ColorArg, String> {
    parse_color_arg(raw).map(ColorArg)
}

#[derive(Parser, Debug)]
pub struct SetButtonArgs {
    /// Key index (0-based, left-to-right, top-to-bottom)
    #[arg(allow_negative_numbers = true)]
    pub key: i64,

    /// Label drawn centred on the key
    #[arg(long, short = 't')]
    pub text: Option<String>,

    /// Image file shown instead of the label ('~' is expanded)
    #[arg(long, short = 'i')]
    pub image: Option<String>,

    /// Background colour as r,g,b
    #[arg(long, value_parser = parse_color, value_name = "R,G,B")]
    pub bg: Option<ColorArg>,

    /// Text colour as r,g,b
    #[arg(long, value_parser = parse_color, value_name = "R,G,B")]
    pub fg: Option<ColorArg>,

    /// Label size in points
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Command to run on press ("page:<name>" switches page)
    #[arg(long, short = 'a')]
    pub action: Option<String>,
}

impl SetButtonArgs {
    /// Build the controller request.
    pub fn to_request(&self) -> ButtonRequest {
        ButtonRequest {
            key: self.key,
            text: self.text.clone(),
            image_path: self.image.clone(),
            bg_color: self.bg.clone().map(|c| c.0),
            text_color: self.fg.clone().map(|c| c.0),
            font_size: self.font_size,
            action: self.action.clone(),
        }
    }
}

/// Arguments for setting several keys at once.
///
/// # Examples
///
/// ```bash
/// # layout.json: [{"key": 0, "text": "Mute", "action": "pactl set-sink-mute 0 toggle"}]
/// sdp set-buttons layout.json
///
/// # Fill the media page
/// sdp --page media set-buttons media.json
/// ```
#[derive(Parser, Debug)]
pub struct SetButtonsArgs {
    /// JSON file holding an array of button requests
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct SetActionArgs {
    /// Key index
    #[arg(allow_negative_numbers = true)]
    pub key: i64,

    /// Command line, or a page name with --type page
    pub action: String,

    /// How the action string is interpreted
    #[arg(long = "type", default_value = "command")]
    pub action_type: ActionType,
}

#[derive(Parser, Debug)]
pub struct ClearButtonArgs {
    /// Key index to clear
    #[arg(allow_negative_numbers = true)]
    pub key: i64,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
