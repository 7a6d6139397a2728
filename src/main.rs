//! Stream Deck pages - named pages of labelled keys with bound actions.
#![forbid(unsafe_code)]

use std::io;
use std::path::Path;
use std::sync::{Arc, PoisonError};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use sdp::cli::{
    BrightnessArgs, ClearButtonArgs, Cli, Commands, CompletionsArgs, PageCommand,
    SetActionArgs, SetButtonArgs, SetButtonsArgs,
};
use sdp::config::path::resolve_config_dir;
use sdp::config::{AppConfig, load_config};
use sdp::controller::{Controller, DeckInfo};
use sdp::device::{DeviceSession, select_backend};
use sdp::error::DeckError;
use sdp::events;
use sdp::launcher::ShellLauncher;
use sdp::logging::init_logging;
use sdp::model::ButtonRequest;
use sdp::render::KeyRenderer;
use sdp::store::PersistenceStore;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn rustc_channel() -> &'static str {
        option_env!("VERGEN_RUSTC_CHANNEL").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }

    pub fn os_version() -> &'static str {
        option_env!("VERGEN_SYSINFO_OS_VERSION").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // These never touch the config directory
    match &cli.command {
        Commands::Version => return cmd_version(cli),
        Commands::Completions(args) => return cmd_completions(args),
        _ => {}
    }

    let dir = resolve_config_dir(cli.config_dir.as_deref())?;
    let config = load_config(&dir)?;
    init_logging(
        cli.json,
        cli.verbose,
        cli.quiet,
        config.logging.level.as_deref(),
    );
    info!(dir = %dir.display(), "Using config directory");

    let mut controller = build_controller(&dir, &config);
    // Not connected yet, so this only selects the page the connect will draw
    if let Some(page) = &cli.page {
        controller.switch_page(page)?;
    }

    match &cli.command {
        Commands::Serve => cmd_serve(cli, controller),
        Commands::Info => cmd_info(cli, &mut controller),
        Commands::Brightness(args) => cmd_brightness(cli, &mut controller, args),
        Commands::SetButton(args) => cmd_set_button(cli, &mut controller, args),
        Commands::SetButtons(args) => cmd_set_buttons(cli, &mut controller, args),
        Commands::SetAction(args) => cmd_set_action(cli, &mut controller, args),
        Commands::ClearButton(args) => cmd_clear_button(cli, &mut controller, args),
        Commands::ClearAll => cmd_clear_all(cli, &mut controller),
        Commands::Page(command) => cmd_page(cli, &mut controller, command),
        Commands::Version | Commands::Completions(_) => Ok(()),
    }
}

fn build_controller(dir: &Path, config: &AppConfig) -> Controller {
    let session = DeviceSession::new(select_backend(), config.connection_settings());
    let renderer = KeyRenderer::new(config.font_cache(), config.image_fit);
    Controller::new(
        PersistenceStore::new(dir),
        session,
        Box::new(renderer),
        Box::new(ShellLauncher),
    )
}

// === Device Commands ===

fn cmd_serve(cli: &Cli, controller: Controller) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(serve(cli, controller))
}

async fn serve(cli: &Cli, mut controller: Controller) -> Result<()> {
    let (sender, receiver) = events::channel();
    controller.session_mut().set_event_sink(sender);
    let deck = controller.connect()?;
    print_info(cli, &deck)?;

    let shared = events::share(controller);
    let pump = {
        let shared = Arc::clone(&shared);
        tokio::task::spawn_blocking(move || events::run_event_loop(&shared, receiver))
    };

    info!("Serving key events, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");

    shared
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .shutdown();
    let handled = pump.await.context("key event loop panicked")?;
    info!(handled, "Stopped");
    Ok(())
}

fn cmd_info(cli: &Cli, controller: &mut Controller) -> Result<()> {
    let deck = match controller.connect() {
        Ok(deck) => deck,
        Err(e) if e.is_connection_error() => {
            warn!(error = %e, "No device, showing page state only");
            controller.info()
        }
        Err(e) => return Err(e.into()),
    };
    print_info(cli, &deck)
}

fn print_info(cli: &Cli, deck: &DeckInfo) -> Result<()> {
    if cli.json {
        return output_json(deck);
    }

    match (&deck.product_name, deck.key_count) {
        (Some(product), Some(keys)) => {
            println!("Device:      {product}");
            if let Some(serial) = &deck.serial {
                println!("Serial:      {serial}");
            }
            if let Some(firmware) = &deck.firmware {
                println!("Firmware:    {firmware}");
            }
            if let (Some(cols), Some(rows)) = (deck.columns, deck.rows) {
                println!("Keys:        {keys} ({cols}x{rows})");
            }
            if let Some((width, height)) = deck.key_size {
                println!("Key size:    {width}x{height}");
            }
            println!("Brightness:  {}%", deck.brightness);
        }
        _ => println!("Device:      not connected"),
    }
    println!("Page:        {}", deck.current_page);
    Ok(())
}

fn cmd_brightness(cli: &Cli, controller: &mut Controller, args: &BrightnessArgs) -> Result<()> {
    controller.connect()?;
    let level = controller.set_brightness(args.level)?;
    if cli.json {
        output_json(&serde_json::json!({ "brightness": level }))
    } else {
        println!("Brightness set to {level}%");
        Ok(())
    }
}

// === Button Commands ===

fn cmd_set_button(cli: &Cli, controller: &mut Controller, args: &SetButtonArgs) -> Result<()> {
    controller.connect()?;
    let request = args.to_request();
    controller.set_button(&request, true)?;
    report(
        cli,
        &serde_json::json!({
            "key": request.key,
            "page": controller.current_page(),
            "action": request.action,
        }),
        &format!("Key {} set on page '{}'", request.key, controller.current_page()),
    )
}

fn cmd_set_buttons(cli: &Cli, controller: &mut Controller, args: &SetButtonsArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let requests: Vec<ButtonRequest> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of buttons", args.file.display()))?;

    controller.connect()?;
    let applied = controller.set_buttons(&requests)?;
    report(
        cli,
        &serde_json::json!({
            "applied": applied,
            "requested": requests.len(),
            "page": controller.current_page(),
        }),
        &format!(
            "Applied {applied} of {} buttons on page '{}'",
            requests.len(),
            controller.current_page()
        ),
    )
}

fn cmd_set_action(cli: &Cli, controller: &mut Controller, args: &SetActionArgs) -> Result<()> {
    let action = controller.set_action(args.key, &args.action, args.action_type, true)?;
    let (stored, kind) = action.encode();
    report(
        cli,
        &serde_json::json!({
            "key": args.key,
            "page": controller.current_page(),
            "action": stored,
            "type": kind,
        }),
        &format!(
            "Key {} on page '{}' now runs {kind} '{stored}'",
            args.key,
            controller.current_page()
        ),
    )
}

fn cmd_clear_button(cli: &Cli, controller: &mut Controller, args: &ClearButtonArgs) -> Result<()> {
    controller.connect()?;
    controller.clear_button(args.key)?;
    report(
        cli,
        &serde_json::json!({ "cleared": args.key, "page": controller.current_page() }),
        &format!("Key {} cleared", args.key),
    )
}

fn cmd_clear_all(cli: &Cli, controller: &mut Controller) -> Result<()> {
    controller.connect()?;
    controller.clear_all()?;
    report(
        cli,
        &serde_json::json!({ "cleared": "all", "page": controller.current_page() }),
        "All keys cleared",
    )
}

// === Page Commands ===

fn cmd_page(cli: &Cli, controller: &mut Controller, command: &PageCommand) -> Result<()> {
    match command {
        PageCommand::Create(args) => {
            let created = controller.create_page(&args.name)?;
            let message = if created {
                format!("Page '{}' created", args.name)
            } else {
                format!("Page '{}' already exists", args.name)
            };
            report(
                cli,
                &serde_json::json!({ "page": args.name, "created": created }),
                &message,
            )
        }
        PageCommand::Switch(args) => {
            controller.connect()?;
            controller.switch_page(&args.name)?;
            report(
                cli,
                &serde_json::json!({ "current_page": controller.current_page() }),
                &format!("Switched to page '{}'", controller.current_page()),
            )
        }
        PageCommand::Delete(args) => {
            controller.delete_page(&args.name)?;
            report(
                cli,
                &serde_json::json!({
                    "deleted": args.name,
                    "current_page": controller.current_page(),
                }),
                &format!("Page '{}' deleted", args.name),
            )
        }
        PageCommand::List => {
            let pages = controller.list_pages();
            if cli.json {
                return output_json(&pages);
            }
            for page in pages {
                let marker = if page.current { "*" } else { " " };
                println!(
                    "{marker} {:<20} {} buttons, {} actions",
                    page.name, page.buttons, page.actions
                );
            }
            Ok(())
        }
    }
}

// === Utilities ===

fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.json {
        output_json(&serde_json::json!({
            "version": build_info::VERSION,
            "build_timestamp": build_info::build_timestamp(),
            "rustc_version": build_info::rustc_semver(),
            "rustc_channel": build_info::rustc_channel(),
            "target": build_info::target(),
            "os": build_info::os_version(),
        }))
    } else {
        println!("sdp {}", build_info::VERSION);
        println!("built: {}", build_info::build_timestamp());
        println!(
            "rustc: {} ({})",
            build_info::rustc_semver(),
            build_info::rustc_channel()
        );
        println!("target: {}", build_info::target());
        println!("os: {}", build_info::os_version());
        Ok(())
    }
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "sdp", &mut io::stdout());
    Ok(())
}

/// JSON in `--json` mode, otherwise the human message.
fn report<T: Serialize>(cli: &Cli, data: &T, message: &str) -> Result<()> {
    if cli.json {
        output_json(data)
    } else {
        println!("{message}");
        Ok(())
    }
}

fn output_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn output_error(cli: &Cli, error: &anyhow::Error) {
    let deck_error = error.downcast_ref::<DeckError>();
    let suggestion = deck_error.and_then(DeckError::suggestion);
    let recoverable = deck_error.is_some_and(DeckError::is_user_recoverable);

    if cli.json {
        let json = serde_json::json!({
            "error": true,
            "message": format!("{error:#}"),
            "suggestion": suggestion,
            "recoverable": recoverable,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => eprintln!("{text}"),
            Err(_) => eprintln!("{json}"),
        }
    } else {
        eprintln!("Error: {error:#}");
        if let Some(suggestion) = suggestion {
            eprintln!("Hint: {suggestion}");
        }
    }
}
