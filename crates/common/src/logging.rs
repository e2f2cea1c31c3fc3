//! Logging setup and configuration

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where formatted log lines are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Append to a file. Used while the terminal UI owns the screen.
    File(PathBuf),
}

/// Setup tracing subscriber for the application
///
/// `RUST_LOG` takes precedence over `default_level` when set.
pub fn setup_logging(default_level: &str, target: LogTarget) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    match target {
        LogTarget::Stdout => registry.with(fmt::layer()).init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            registry
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .init();
        }
    }

    Ok(())
}
