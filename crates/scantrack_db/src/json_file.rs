//! Scan store kept in a single JSON document.
//!
//! Mirrors the SQLite tables for deployments without a database. The whole
//! document is rewritten on every change (temp file + rename), and an async
//! mutex serialises read-modify-write cycles within the process.

use crate::error::{Result, StoreError};
use crate::types::*;
use crate::{clamp_log_limit, truncate_to_millis, ScanStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanDocument {
    #[serde(default)]
    records: BTreeMap<String, ScanRecord>,
    #[serde(default)]
    logs: Vec<ScanLogEntry>,
    #[serde(default)]
    last_record_id: i64,
    #[serde(default)]
    last_log_id: i64,
}

/// Scan store on a JSON file.
pub struct JsonFileScanStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileScanStore {
    /// Open a store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let store = Self {
            path,
            guard: Mutex::new(()),
        };
        // Surface a corrupt file at startup rather than on the first scan
        let doc = store.load().await?;
        info!(
            path = %store.path.display(),
            records = doc.records.len(),
            "Scan file opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ScanDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(ScanDocument::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ScanDocument::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, doc: &ScanDocument) -> Result<()> {
        let data = serde_json::to_vec_pretty(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), "Scan file written");
        Ok(())
    }
}

#[async_trait]
impl ScanStore for JsonFileScanStore {
    fn backend_tag(&self) -> &'static str {
        "json-file"
    }

    async fn ping(&self) -> Result<()> {
        let _guard = self.guard.lock().await;
        self.load().await.map(|_| ())
    }

    async fn apply_scan(
        &self,
        update: &ScanUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<ScanRecord>> {
        let now = truncate_to_millis(now);
        let _guard = self.guard.lock().await;
        let mut doc = self.load().await?;

        let record = match doc.records.get_mut(&update.barcode) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(update.delta).max(0);
                existing.last_scan = now;
                existing.responsible = update.responsible.clone();
                existing.clone()
            }
            None if update.delta <= 0 => return Ok(None),
            None => {
                doc.last_record_id += 1;
                let record = ScanRecord {
                    id: doc.last_record_id,
                    barcode: update.barcode.clone(),
                    quantity: update.delta,
                    first_scan: now,
                    last_scan: now,
                    responsible: update.responsible.clone(),
                };
                doc.records.insert(update.barcode.clone(), record.clone());
                record
            }
        };

        self.save(&doc).await?;
        Ok(Some(record))
    }

    async fn append_log(&self, entry: &NewLogEntry) -> Result<ScanLogEntry> {
        let _guard = self.guard.lock().await;
        let mut doc = self.load().await?;

        doc.last_log_id += 1;
        let stored = ScanLogEntry {
            id: doc.last_log_id,
            scan_id: entry.scan_id,
            barcode: entry.barcode.clone(),
            delta: entry.delta,
            quantity_after: entry.quantity_after,
            actor_name: entry.actor_name.clone(),
            created_at: truncate_to_millis(entry.created_at),
        };
        doc.logs.push(stored.clone());

        self.save(&doc).await?;
        Ok(stored)
    }

    async fn get_record(&self, barcode: &str) -> Result<Option<ScanRecord>> {
        let _guard = self.guard.lock().await;
        let doc = self.load().await?;
        Ok(doc.records.get(barcode).cloned())
    }

    async fn list_records(&self) -> Result<Vec<ScanRecord>> {
        let _guard = self.guard.lock().await;
        let doc = self.load().await?;

        let mut records: Vec<ScanRecord> = doc.records.into_values().collect();
        records.sort_by(|a, b| b.last_scan.cmp(&a.last_scan).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn list_logs(&self, barcode: &str, limit: usize) -> Result<Vec<ScanLogEntry>> {
        let _guard = self.guard.lock().await;
        let doc = self.load().await?;

        let mut logs: Vec<ScanLogEntry> = doc
            .logs
            .into_iter()
            .filter(|entry| entry.barcode == barcode)
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        logs.truncate(clamp_log_limit(limit));
        Ok(logs)
    }

    async fn totals(&self) -> Result<ScanTotals> {
        let _guard = self.guard.lock().await;
        let doc = self.load().await?;

        let total_products_scanned = doc
            .records
            .values()
            .try_fold(0i64, |acc, r| acc.checked_add(r.quantity))
            .ok_or_else(|| StoreError::invalid_state("Total quantity overflows a 64-bit integer"))?;

        Ok(ScanTotals {
            total_codes: doc.records.len() as i64,
            total_products_scanned,
        })
    }
}
