use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Split a log file path into the directory and file name the appender wants.
fn log_target(log_file: &Path) -> Option<(PathBuf, String)> {
    let name = log_file.file_name()?.to_string_lossy().into_owned();
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, name))
}

fn bootstrap_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::Subscriber::builder()
        .with_target(false)
        .with_writer(writer)
        .finish()
}

/// Run `f` under a console-only subscriber. Used while loading the
/// configuration, before `init_logging` can be called, so warnings about
/// bad environment values still reach the terminal.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(bootstrap_subscriber(std::io::stdout), f)
}

/// Install the global subscriber: console output always, plus a plain-text
/// file layer when file logging is enabled. Keep the returned guard alive
/// until exit or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let default_directive = if verbose {
        "drivescribe=debug"
    } else {
        "drivescribe=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    let console_layer = fmt::layer().with_target(false);

    let (file_layer, guard) = if config.enable_file_logging {
        let (dir, name) = log_target(&config.log_file)
            .with_context(|| format!("Invalid log file path: {}", config.log_file.display()))?;
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
