//! SQLite-backed scan store.

use crate::error::{Result, StoreError};
use crate::types::*;
use crate::{clamp_log_limit, millis_to_datetime, ScanStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const RECORD_COLUMNS: &str = "id, barcode, quantity, first_scan, last_scan, responsible";

// INTEGER arithmetic that overflows turns into REAL in SQLite, so positive
// deltas saturate at i64::MAX before the addition happens.
const SATURATING_QUANTITY: &str = "CASE \
    WHEN ? > 0 AND quantity > 9223372036854775807 - ? THEN 9223372036854775807 \
    ELSE MAX(0, quantity + ?) END";

/// Scan store on a SQLite database file.
#[derive(Clone)]
pub struct SqliteScanStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteScanStore {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;

        info!(path = %path.display(), "Scan database opened");

        Ok(store)
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection. Later calls fail as unavailable.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn update_existing(
        &self,
        update: &ScanUpdate,
        now_ms: i64,
    ) -> Result<Option<ScanRecord>> {
        let sql = format!(
            r#"
            UPDATE scans SET
                quantity = {SATURATING_QUANTITY},
                last_scan = ?,
                responsible = ?
            WHERE barcode = ?
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(update.delta)
            .bind(update.delta)
            .bind(update.delta)
            .bind(now_ms)
            .bind(&update.responsible)
            .bind(&update.barcode)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_record(&row)).transpose()
    }

    /// Insert a first scan. A concurrent first scan of the same barcode
    /// turns into an increment instead of a constraint failure.
    async fn insert_new(&self, update: &ScanUpdate, now_ms: i64) -> Result<ScanRecord> {
        let sql = format!(
            r#"
            INSERT INTO scans (barcode, quantity, first_scan, last_scan, responsible)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(barcode) DO UPDATE SET
                quantity = CASE
                    WHEN scans.quantity > 9223372036854775807 - excluded.quantity
                        THEN 9223372036854775807
                    ELSE MAX(0, scans.quantity + excluded.quantity)
                END,
                last_scan = excluded.last_scan,
                responsible = excluded.responsible
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&update.barcode)
            .bind(update.delta)
            .bind(now_ms)
            .bind(now_ms)
            .bind(&update.responsible)
            .fetch_one(&self.pool)
            .await?;

        row_to_record(&row)
    }
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn apply_scan(
        &self,
        update: &ScanUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<ScanRecord>> {
        let now_ms = now.timestamp_millis();

        if let Some(record) = self.update_existing(update, now_ms).await? {
            return Ok(Some(record));
        }
        if update.delta <= 0 {
            return Ok(None);
        }
        self.insert_new(update, now_ms).await.map(Some)
    }

    async fn append_log(&self, entry: &NewLogEntry) -> Result<ScanLogEntry> {
        let result = sqlx::query(
            r#"
            INSERT INTO scan_logs (scan_id, barcode, delta, quantity_after, actor_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.scan_id)
        .bind(&entry.barcode)
        .bind(entry.delta)
        .bind(entry.quantity_after)
        .bind(&entry.actor_name)
        .bind(entry.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(ScanLogEntry {
            id: result.last_insert_rowid(),
            scan_id: entry.scan_id,
            barcode: entry.barcode.clone(),
            delta: entry.delta,
            quantity_after: entry.quantity_after,
            actor_name: entry.actor_name.clone(),
            created_at: crate::truncate_to_millis(entry.created_at),
        })
    }

    async fn get_record(&self, barcode: &str) -> Result<Option<ScanRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM scans WHERE barcode = ?");
        let row = sqlx::query(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_record(&row)).transpose()
    }

    async fn list_records(&self) -> Result<Vec<ScanRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM scans ORDER BY last_scan DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn list_logs(&self, barcode: &str, limit: usize) -> Result<Vec<ScanLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, scan_id, barcode, delta, quantity_after, actor_name, created_at
            FROM scan_logs
            WHERE barcode = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(barcode)
        .bind(clamp_log_limit(limit) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_log_entry).collect()
    }

    async fn totals(&self) -> Result<ScanTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_codes,
                COALESCE(SUM(quantity), 0) AS total_quantity
            FROM scans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ScanTotals {
            total_codes: row.try_get("total_codes")?,
            total_products_scanned: row.try_get("total_quantity")?,
        })
    }
}

fn row_to_record(row: &SqliteRow) -> Result<ScanRecord> {
    let barcode: String = row.try_get("barcode")?;
    let quantity: i64 = row.try_get("quantity").map_err(|err| {
        StoreError::invalid_state(format!("Unreadable quantity for barcode {}: {}", barcode, err))
    })?;
    if quantity < 0 {
        return Err(StoreError::invalid_state(format!(
            "Negative quantity {} stored for barcode {}",
            quantity, barcode
        )));
    }

    Ok(ScanRecord {
        id: row.try_get("id")?,
        barcode,
        quantity,
        first_scan: millis_to_datetime(row.try_get("first_scan")?)?,
        last_scan: millis_to_datetime(row.try_get("last_scan")?)?,
        responsible: row.try_get("responsible")?,
    })
}

fn row_to_log_entry(row: &SqliteRow) -> Result<ScanLogEntry> {
    Ok(ScanLogEntry {
        id: row.try_get("id")?,
        scan_id: row.try_get("scan_id")?,
        barcode: row.try_get("barcode")?,
        delta: row.try_get("delta")?,
        quantity_after: row.try_get("quantity_after")?,
        actor_name: row.try_get("actor_name")?,
        created_at: millis_to_datetime(row.try_get("created_at")?)?,
    })
}
