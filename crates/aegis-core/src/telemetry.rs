//! Tracing setup for the sentinel binary.
//!
//! Stdout carries the response protocol, so every log line goes to stderr.
//! The host usually captures stderr into a file, so colour is only used
//! when stderr is a terminal.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let ansi = std::io::stderr().is_terminal();

    let (json_layer, text_layer) = if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(std::io::stderr);
        (None, Some(layer))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
