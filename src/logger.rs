use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

pub const LOG_FILE: &str = "channel-store.log";

/// Installs the global subscriber.
///
/// - `log_level` is an `EnvFilter` directive (e.g. `"info"` or
///   `"channel_store=trace"`).
/// - stderr always gets a human readable layer, keeping stdout for command output.
/// - with `log_dir`, a plain-text daily rolling file is written there as well.
pub fn init_tracing(log_level: &str, log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level directive `{log_level}`"))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("could not create log dir {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE);
            Some(
                fmt::Layer::default()
                    .with_writer(appender)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;
    Ok(())
}
