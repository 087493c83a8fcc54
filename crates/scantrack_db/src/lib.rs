//! Storage layer for Scantrack
//!
//! Every interface (HTTP server, CLI) goes through the [`ScanStore`] trait.
//! Two backends implement it:
//!
//! - [`SqliteScanStore`]: SQLite via sqlx (default)
//! - [`JsonFileScanStore`]: a single JSON document on disk
//!
//! # Usage
//!
//! ```rust,ignore
//! use scantrack_db::{ScanStore, ScanUpdate, SqliteScanStore};
//!
//! let store = SqliteScanStore::open("~/.scantrack/scantrack.sqlite3").await?;
//! let update = ScanUpdate { barcode: "ABC123".into(), responsible: "Alice".into(), delta: 1 };
//! let record = store.apply_scan(&update, chrono::Utc::now()).await?;
//! ```

mod error;
mod json_file;
mod schema;
mod sqlite;
mod types;

pub use error::{Result, StoreError};
pub use json_file::JsonFileScanStore;
pub use sqlite::SqliteScanStore;
pub use types::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Upper bound on log entries returned for one barcode.
pub const MAX_LOG_ENTRIES: usize = 50;

/// Persistence for scan counters and their movement log.
///
/// Counter updates and log appends are separate calls; a caller that needs
/// both issues them one after the other with no transaction spanning them.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Short name used in logs ("sqlite", "json-file").
    fn backend_tag(&self) -> &'static str;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<()>;

    /// Apply a signed change to a barcode's counter.
    ///
    /// Existing records get `max(0, quantity + delta)`. Unknown barcodes are
    /// created with `quantity = delta` when `delta > 0`; otherwise nothing is
    /// written and `None` is returned.
    async fn apply_scan(&self, update: &ScanUpdate, now: DateTime<Utc>)
        -> Result<Option<ScanRecord>>;

    /// Append a movement-log entry.
    async fn append_log(&self, entry: &NewLogEntry) -> Result<ScanLogEntry>;

    async fn get_record(&self, barcode: &str) -> Result<Option<ScanRecord>>;

    /// All records, most recently scanned first.
    async fn list_records(&self) -> Result<Vec<ScanRecord>>;

    /// Newest-first log entries for `barcode`, at most `limit` (capped at
    /// [`MAX_LOG_ENTRIES`]).
    async fn list_logs(&self, barcode: &str, limit: usize) -> Result<Vec<ScanLogEntry>>;

    async fn totals(&self) -> Result<ScanTotals>;
}

/// Clamp a requested page size to `1..=MAX_LOG_ENTRIES`.
pub fn clamp_log_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LOG_ENTRIES)
}

/// Convert stored milliseconds to DateTime.
pub fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StoreError::invalid_state(format!("Timestamp out of range: {} ms", millis))
    })
}

/// Drop sub-millisecond precision so every backend stores the same instant.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_limit_is_clamped() {
        assert_eq!(clamp_log_limit(0), 1);
        assert_eq!(clamp_log_limit(10), 10);
        assert_eq!(clamp_log_limit(500), MAX_LOG_ENTRIES);
    }

    #[test]
    fn truncation_keeps_milliseconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let truncated = truncate_to_millis(at);
        assert_eq!(truncated.timestamp_millis(), at.timestamp_millis());
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn out_of_range_millis_are_rejected() {
        let at = millis_to_datetime(1_700_000_000_123).unwrap();
        assert_eq!(at.timestamp_millis(), 1_700_000_000_123);

        let err = millis_to_datetime(i64::MAX).unwrap_err();
        assert!(matches!(err, StoreError::InvalidState(_)));
        assert!(!err.is_unavailable());
    }
}
