//! Tracing setup.
//!
//! The board owns the terminal, so it logs to a daily file under the data
//! dir. Every other subcommand logs to stderr. `RUST_LOG` overrides the
//! default filter in both cases.

use std::panic::PanicHookInfo;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn filter(debug: bool) -> EnvFilter {
    let default = if debug { "todoboard=debug" } else { "todoboard=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn log_dir() -> std::io::Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .map(|dir| dir.join("todoboard").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("todoboard").join("logs"));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Log to `todoboard.log.<date>` in the log dir.
pub fn init_file(debug: bool) -> Result<LoggingGuard> {
    let log_dir = log_dir().or_else(|_| -> std::io::Result<PathBuf> {
        let dir = std::env::temp_dir().join("todoboard").join("logs");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "todoboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|err| anyhow!(err))?;

    chain_panic_hook(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    });

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");
    Ok(LoggingGuard { _guard: guard })
}

/// Run `hook` on panic, then whatever hook was installed before it.
pub fn chain_panic_hook<F>(hook: F)
where
    F: Fn(&PanicHookInfo<'_>) + Send + Sync + 'static,
{
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        hook(panic_info);
        previous(panic_info);
    }));
}

/// Compact logging to stderr, for the non-interactive subcommands.
pub fn init_stderr(debug: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
