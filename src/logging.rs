//! Logger setup for the CLI.
//!
//! Records go to stderr and to a per-run file `run_<YYYYmmdd_HHMMSS>.log` in
//! the log directory. The filter defaults to `info` and follows `RUST_LOG`.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Writes every buffer to stderr and to a file.
pub struct TeeWriter {
    file: File,
}

impl TeeWriter {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A closed stderr must not stop the file log.
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Path of the log file for a run started at `started`.
pub fn log_file_path(log_dir: &Path, started: NaiveDateTime) -> PathBuf {
    log_dir.join(format!("run_{}.log", started.format("%Y%m%d_%H%M%S")))
}

fn builder() -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder
}

/// Install the global logger, teeing into a run log under `log_dir`.
///
/// Falls back to stderr-only logging when the file cannot be created.
///
/// # Returns
///
/// The log file path, or `None` when only stderr is used.
pub fn init(log_dir: &Path, started: NaiveDateTime) -> Option<PathBuf> {
    let path = log_file_path(log_dir, started);
    let file = fs::create_dir_all(log_dir).and_then(|_| File::create(&path));

    match file {
        Ok(file) => {
            let _ = builder()
                .target(env_logger::Target::Pipe(Box::new(TeeWriter::new(file))))
                .try_init();
            Some(path)
        }
        Err(e) => {
            let _ = builder().try_init();
            log::warn!(
                "[WX-EXPORT] cannot create log file {}: {}; logging to stderr only",
                path.display(),
                e
            );
            None
        }
    }
}

/// Install a stderr-only logger (commands that do not export).
pub fn init_stderr() {
    let _ = builder().try_init();
}
