use core::fmt::Arguments;
use std::io;
use std::path::{Path, PathBuf};

use log::{LevelFilter, Record};

pub const LOG_FILE_NAME: &str = "megabattle.log";

/// Default log location: the user cache dir, since the terminal belongs to the TUI.
pub fn default_log_path() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("megabattle")
        .join(LOG_FILE_NAME)
}

/// Routes `log` records to `path`. Dependencies stay at `warn`; this crate
/// logs at `level`.
pub fn init(path: &Path, level: LevelFilter) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    fern::Dispatch::new()
        .format(file_format)
        .level(LevelFilter::Warn)
        .level_for("megabattle", level)
        .chain(fern::log_file(path)?)
        .apply()
        .map_err(io::Error::other)
}

fn file_format(callback: fern::FormatCallback, message: &Arguments, record: &Record) {
    callback.finish(format_args!(
        "{} {} {} {}",
        chrono::Local::now().format("%F %T%.3f"),
        record.level(),
        record.target(),
        message,
    ))
}
