//! saavy-net - terminal monitor for a live module network
//!
//! Run with: cargo run [-- --null]
//!
//! `--null` renders without an audio device. Logs go to `saavy-net.log`;
//! set `RUST_LOG` to change the filter.

mod app;
mod ui;

use std::fs::File;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing_subscriber::EnvFilter;

use app::{App, Output};

const LOG_FILE: &str = "saavy-net.log";

fn init_tracing() -> EyreResult<()> {
    let file = File::create(LOG_FILE).wrap_err("failed to create log file")?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so log to a file
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .try_init()
        .ok();
    Ok(())
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    init_tracing()?;

    let output = if std::env::args().any(|arg| arg == "--null") {
        Output::Null
    } else {
        Output::Device
    };

    App::new(output).run()
}
