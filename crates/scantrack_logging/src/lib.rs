//! Logging setup shared by the Scantrack binaries.
//!
//! Installs one `tracing` subscriber with two sinks: a size-rotated file under
//! `~/.scantrack/logs/` and stderr.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "scantrack=info,scantrack_server=info,scantrack_db=info";
const KEEP_ROTATED_FILES: usize = 4;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging options for one binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only
    pub verbose: bool,
    /// Keep stderr at `warn` unless verbose (one-shot CLI commands)
    pub quiet_console: bool,
}

/// Initialize tracing with a rotating file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = SharedLogFile::open(&log_dir, config.app_name)
        .with_context(|| format!("Failed to open log file for {}", config.app_name))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.quiet_console && !config.verbose {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Scantrack home directory: `$SCANTRACK_HOME` or `~/.scantrack`.
pub fn scantrack_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("SCANTRACK_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scantrack")
}

/// Logs directory: `~/.scantrack/logs`
pub fn logs_dir() -> PathBuf {
    scantrack_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Append-only log file that shifts `name.log` → `name.log.1` → ... once it
/// would exceed `max_size`. At most `keep` rotated files survive.
struct SizeRotatedFile {
    current: PathBuf,
    keep: usize,
    max_size: u64,
    file: File,
    written: u64,
}

impl SizeRotatedFile {
    fn open(dir: &Path, app_name: &str, keep: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let current = dir.join(format!("{}.log", file_stem(app_name)));
        let (file, written) = open_append(&current)?;
        let mut log = Self {
            current,
            keep,
            max_size,
            file,
            written,
        };
        if log.written > log.max_size {
            log.rotate()?;
        }
        Ok(log)
    }

    fn rotated(&self, generation: usize) -> PathBuf {
        let mut name = self.current.clone().into_os_string();
        name.push(format!(".{generation}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.keep == 0 {
            fs::remove_file(&self.current)?;
        } else {
            let oldest = self.rotated(self.keep);
            if oldest.exists() {
                fs::remove_file(oldest)?;
            }
            for generation in (1..self.keep).rev() {
                let from = self.rotated(generation);
                if from.exists() {
                    fs::rename(from, self.rotated(generation + 1))?;
                }
            }
            fs::rename(&self.current, self.rotated(1))?;
        }

        let (file, written) = open_append(&self.current)?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

impl Write for SizeRotatedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

/// Cloneable handle so every tracing event writes through one rotating file.
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<SizeRotatedFile>>);

impl SharedLogFile {
    fn open(dir: &Path, app_name: &str) -> io::Result<Self> {
        let file = SizeRotatedFile::open(dir, app_name, KEEP_ROTATED_FILES, MAX_LOG_FILE_SIZE)?;
        Ok(Self(Arc::new(Mutex::new(file))))
    }
}

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?
            .flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogFile {
    type Writer = SharedLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
