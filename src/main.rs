// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

mod app;
mod config;
mod engine;
mod errors;
mod session;
mod theme;
mod tui;

use std::env;
use std::fs;
use std::io::stdout;
use std::path::PathBuf;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use crate::app::App;
use crate::engine::sim::{SimConfig, SimEngine};

const DEFAULT_LOG_FILTER: LevelFilter = LevelFilter::INFO;

/// Terminal monitor for a single in-progress download, driven here by the
/// simulated engine backend.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Display name of the fabricated download.
    #[arg(long, default_value = "debian-13.1.0-amd64-netinst.iso")]
    name: String,

    /// Number of chunks in the fabricated download.
    #[arg(long, default_value_t = 512)]
    chunks: u32,

    /// Number of file entries.
    #[arg(long, default_value_t = 6)]
    files: usize,

    /// Peers connected at startup.
    #[arg(long, default_value_t = 12)]
    peers: usize,

    /// Alternate settings file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let base_data_dir = config::get_app_paths()
        .map(|(_, data_dir)| data_dir)
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let log_dir = base_data_dir.join("logs");
    let _subscriber_result = if fs::create_dir_all(&log_dir).is_ok() {
        let general_log = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(7)
            .filename_prefix("app")
            .filename_suffix("log")
            .build(&log_dir)?;
        let (non_blocking_general, guard) = tracing_appender::non_blocking(general_log);
        // Keep the writer guard alive for the lifetime of the process.
        std::mem::forget(guard);
        let general_layer = fmt::layer()
            .with_writer(non_blocking_general)
            .with_ansi(false)
            .with_filter(DEFAULT_LOG_FILTER);
        tracing_subscriber::registry().with(general_layer).try_init()
    } else {
        tracing_subscriber::registry().try_init()
    };

    tracing::info!("STARTING SEEDWATCH");

    let settings = config::load_settings(cli.config.clone());

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = cleanup_terminal();
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let sim = SimEngine::new(SimConfig {
        name: cli.name,
        chunks_total: cli.chunks.max(1),
        chunk_size: 256 * 1024,
        file_count: cli.files.max(1),
        seed_peers: cli.peers,
    });
    sim.spawn_activity();

    let run_result = match App::new(sim, settings) {
        Ok(mut app) => app.run(&mut terminal).await,
        Err(e) => Err(e),
    };

    cleanup_terminal()?;

    if let Err(e) = run_result {
        eprintln!("[Error] Monitor failed: {}", e);
    }

    Ok(())
}

fn cleanup_terminal() -> Result<(), Box<dyn std::error::Error>> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}
