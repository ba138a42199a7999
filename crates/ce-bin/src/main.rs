//! Cerulean entrypoint: argument handling, logging, session bootstrap, and
//! the terminal event loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod command;
mod draw;

use app::App;

/// CLI arguments: positional file paths, nothing else required.
#[derive(Parser, Debug)]
#[command(name = "ce", version, about = "cerulean editor")]
struct Args {
    /// Files to open; the first becomes the primary view.
    pub paths: Vec<PathBuf>,
}

/// Route tracing to a file so the screen stays clean. `CE_LOG` filters.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("cerulean");
    std::fs::create_dir_all(&log_dir).context("creating log directory")?;
    let appender = tracing_appender::rolling::never(&log_dir, "ce.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn main() -> Result<()> {
    let _log_guard = init_logging()?;
    let args = Args::parse();
    info!(target: "runtime", files = args.paths.len(), "startup");
    let mut app = App::new(&args.paths)?;
    app.run()?;
    info!(target: "runtime", "clean_exit");
    Ok(())
}
