use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::StorageError;

pub const LOG_FILE: &str = "taskdeck.log";
pub const LOG_ENV: &str = "TASKDECK_LOG";

/// Routes `tracing` output to `<data_dir>/taskdeck.log`; the terminal belongs
/// to the board. The filter comes from `TASKDECK_LOG`, default `info`.
pub fn init_tracing(data_dir: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(data_dir).map_err(|source| StorageError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;
    let path = data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| StorageError::Io { path, source })?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, repeated CLI calls in-process) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init();
    Ok(())
}
