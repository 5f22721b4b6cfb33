mod adapter;

use std::env;
use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing::{error, info};

use ksh_config::logging::{self, LOG_ENV, MAX_LOG_FILES, MAX_LOG_SIZE};
use ksh_config::{default_config_dir, load_settings, ResolveContext, Settings};

fn main() -> Result<()> {
    if env::args().skip(1).any(|arg| arg == "--version" || arg == "-V") {
        println!("ksh-debug-adapter {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Settings come first so the log section is honoured.
    let loaded = match default_config_dir() {
        Some(dir) => load_settings(&dir).map_err(|e| e.to_string()),
        None => Err("no home directory".to_string()),
    };
    let settings = loaded.as_ref().cloned().unwrap_or_default();

    let log_path = logging::log_file_path(&settings.log);
    logging::ensure_log_dir(&log_path).ok();
    logging::rotate_log_files(&log_path, MAX_LOG_SIZE, MAX_LOG_FILES).ok();

    let env_level = env::var(LOG_ENV).ok();
    let filter_str = logging::effective_filter(env_level.as_deref(), &settings.log);
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter_str)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries the protocol, so logs only ever go to the file.
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(log_file) => tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .with_env_filter(env_filter)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter(env_filter)
            .init(),
    }

    info!("ksh-debug-adapter starting, log level: {}", filter_str);
    if let Err(e) = &loaded {
        error!("settings load failed, using defaults: {}", e);
    }

    run(settings)
}

fn run(settings: Settings) -> Result<()> {
    let context = ResolveContext::from_environment(settings.defaults)
        .context("failed to locate the adapter installation")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let result = runtime.block_on(adapter::serve(tokio::io::stdin(), tokio::io::stdout(), context));
    if let Err(e) = &result {
        error!("adapter stopped: {e:#}");
    }
    info!("ksh-debug-adapter exiting");
    // Helper processes may still hold pipes open; do not wait on them.
    runtime.shutdown_background();
    result
}
