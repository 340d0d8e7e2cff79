use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// Per-run log file name, e.g. `dms-clone_26-10-19-14-05-09.log`.
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("dms-clone_{}.log", now.format("%y-%m-%d-%H-%M-%S"))
}

/// Install the global subscriber.
///
/// stderr policy:
///   --quiet   → off
///   --verbose → debug for this crate, info for the rest
///   default   → RUST_LOG if set, otherwise info
///
/// When `log_dir` is given, every run also writes an info-level log to a
/// fresh file there. Returns the path of that file.
pub fn init(verbosity: Verbosity, log_dir: Option<&Path>, ansi: bool) -> Result<Option<PathBuf>> {
    let stderr_filter = match verbosity {
        Verbosity::Quiet => EnvFilter::new("off"),
        Verbosity::Verbose => EnvFilter::new("dms_clone=debug,info"),
        Verbosity::Normal => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name(Local::now()));
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("info"));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(log_path)
}
