//! Log output setup
//!
//! Events always go to stderr, as text or as JSON lines when `LOG_FORMAT=json`.
//! With `--log-file` the same events are also appended, without colours, to a
//! file that survives between runs.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "lichess_client=info";

/// Opens a log file for appending, creating it when missing
pub fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Plain-text layer writing to a log file
pub fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer().with_ansi(false).with_writer(Mutex::new(file))
}

/// Installs the global subscriber
///
/// # Arguments
/// * `log_file` - Optional file that receives a copy of every event
///
/// # Returns
/// * `Err` if the log file cannot be opened
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file = log_file.map(open_log_file).transpose()?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(file.map(file_layer));

    if json_format {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
    Ok(())
}
