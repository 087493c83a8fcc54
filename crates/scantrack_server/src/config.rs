//! Store and server configuration.
//!
//! All defaults live under `~/.scantrack/` (see [`scantrack_logging::scantrack_home`]).

use scantrack_db::{JsonFileScanStore, ScanStore, SqliteScanStore, StoreError};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Default HTTP bind address (TCP loopback).
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StoreKind {
    /// SQLite database file
    #[default]
    Sqlite,
    /// Single JSON document
    Json,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Sqlite => "sqlite",
            StoreKind::Json => "json",
        }
    }
}

/// Default SQLite path: ~/.scantrack/scantrack.sqlite3
pub fn default_db_path() -> PathBuf {
    scantrack_logging::scantrack_home().join("scantrack.sqlite3")
}

/// Default JSON store path: ~/.scantrack/barcodes.json
pub fn default_json_path() -> PathBuf {
    scantrack_logging::scantrack_home().join("barcodes.json")
}

/// Where scans are stored.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Storage backend
    #[arg(long, value_enum, env = "SCANTRACK_STORE", default_value = "sqlite", global = true)]
    pub store: StoreKind,

    /// SQLite database path (default: ~/.scantrack/scantrack.sqlite3)
    #[arg(long, env = "SCANTRACK_DB", global = true)]
    pub db: Option<PathBuf>,

    /// JSON store path (default: ~/.scantrack/barcodes.json)
    #[arg(long, env = "SCANTRACK_JSON_FILE", global = true)]
    pub json_file: Option<PathBuf>,
}

impl StoreArgs {
    /// Path of the selected backend's file.
    pub fn location(&self) -> PathBuf {
        match self.store {
            StoreKind::Sqlite => self.db.clone().unwrap_or_else(default_db_path),
            StoreKind::Json => self.json_file.clone().unwrap_or_else(default_json_path),
        }
    }

    /// Open the selected backend.
    pub async fn open(&self) -> Result<Arc<dyn ScanStore>, StoreError> {
        let path = self.location();
        let store: Arc<dyn ScanStore> = match self.store {
            StoreKind::Sqlite => Arc::new(SqliteScanStore::open(&path).await?),
            StoreKind::Json => Arc::new(JsonFileScanStore::open(&path).await?),
        };
        Ok(store)
    }
}

/// HTTP server options.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "SCANTRACK_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,

    /// Seconds to wait for in-flight requests after a shutdown signal
    #[arg(long, default_value_t = 5)]
    pub shutdown_grace_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn location_prefers_explicit_paths() {
        let args = StoreArgs {
            store: StoreKind::Json,
            db: Some(PathBuf::from("/tmp/a.db")),
            json_file: Some(PathBuf::from("/tmp/b.json")),
        };
        assert_eq!(args.location(), PathBuf::from("/tmp/b.json"));

        let args = StoreArgs {
            store: StoreKind::Sqlite,
            ..args
        };
        assert_eq!(args.location(), PathBuf::from("/tmp/a.db"));
    }

    #[tokio::test]
    async fn open_selects_backend() {
        let tmp = TempDir::new().unwrap();
        let args = StoreArgs {
            store: StoreKind::Json,
            db: None,
            json_file: Some(tmp.path().join("scans.json")),
        };
        assert_eq!(args.open().await.unwrap().backend_tag(), "json-file");

        let args = StoreArgs {
            store: StoreKind::Sqlite,
            db: Some(tmp.path().join("scans.db")),
            json_file: None,
        };
        assert_eq!(args.open().await.unwrap().backend_tag(), "sqlite");
    }
}
