//! SQLite schema for the scan tables.
//!
//! All CREATE TABLE statements live here.

use crate::error::Result;
use crate::sqlite::SqliteScanStore;
use tracing::info;

impl SqliteScanStore {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // One row per barcode
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                barcode TEXT NOT NULL UNIQUE,
                quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                first_scan INTEGER NOT NULL,
                last_scan INTEGER NOT NULL,
                responsible TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // Append-only movement log
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS scan_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scan_id INTEGER NOT NULL REFERENCES scans(id),
                barcode TEXT NOT NULL,
                delta INTEGER NOT NULL,
                quantity_after INTEGER NOT NULL,
                actor_name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scans_last_scan ON scans(last_scan)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_scan_logs_barcode ON scan_logs(barcode, created_at)",
        )
        .execute(&self.pool)
        .await?;

        info!("Scan schema verified");
        Ok(())
    }
}
