//! Structured logging initialization.
//!
//! Supports both human-friendly and machine-readable (JSON) output formats,
//! with TTY detection and verbosity control. Everything goes to stderr so
//! stdout stays clean for command output.

use std::io::{self, IsTerminal};
use tracing::warn;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter directive for the given flags.
///
/// `-q` wins over everything, `-v` flags win over the configured level.
/// A configured bare level (`debug`) applies to this crate; anything with a
/// target or several directives (`sdp=debug,hidapi=warn`) is used as is.
pub fn default_directive(verbose: u8, quiet: bool, configured: Option<&str>) -> String {
    if quiet {
        return "sdp=error".to_string();
    }
    match (verbose, configured.map(str::trim)) {
        (0, Some(level)) if level.contains(['=', ',']) => level.to_string(),
        (0, Some(level)) => format!("sdp={level}"),
        (0, None) => "sdp=info".to_string(),
        (1, _) => "sdp=debug".to_string(),
        _ => "sdp=trace".to_string(),
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Arguments
///
/// * `json` - If true, output structured JSON logs
/// * `verbose` - Verbosity level: 0 = configured or info, 1 = debug, 2+ = trace
/// * `quiet` - If true, only errors are logged
/// * `configured` - Level from the `[logging]` table of `config.toml`
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override the filter (e.g., "sdp=debug,elgato_streamdeck=warn")
///
/// # Output Behavior
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | JSON | any | JSON lines to stderr |
/// | Text | yes | Pretty colored output to stderr |
/// | Text | no | Compact plain output to stderr |
pub fn init_logging(json: bool, verbose: u8, quiet: bool, configured: Option<&str>) {
    let directive = default_directive(verbose, quiet, configured);
    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => directive_filter(&directive),
    };

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else if io::stderr().is_terminal() {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        // Piped or redirected
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }

    if let Some(error) = rejected {
        warn!(
            directive = %directive,
            error = %error,
            "Ignoring invalid log level from config, using sdp=info"
        );
    }
}

/// Parse `directive`, falling back to `sdp=info` and returning the parse
/// error when it is invalid.
pub fn directive_filter(directive: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("sdp=info"), Some(e.to_string())),
    }
}
