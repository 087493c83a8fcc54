//! Scan ingestion and read operations, independent of transport.

use crate::error::ScanError;
use chrono::{DateTime, Utc};
use scantrack_db::{
    NewLogEntry, ScanLogEntry, ScanRecord, ScanStore, ScanTotals, ScanUpdate, StoreError,
    MAX_LOG_ENTRIES,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Body of `POST /scans`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
    /// Signed change, 1 when absent
    #[serde(default)]
    pub increment: Option<i64>,
}

impl ScanRequest {
    pub fn new(barcode: impl Into<String>, responsible: impl Into<String>) -> Self {
        Self {
            barcode: Some(barcode.into()),
            responsible: Some(responsible.into()),
            increment: None,
        }
    }

    pub fn with_increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    fn into_update(self) -> Result<ScanUpdate, ScanError> {
        let barcode = non_blank(self.barcode);
        let responsible = non_blank(self.responsible);
        match (barcode, responsible) {
            (Some(barcode), Some(responsible)) => Ok(ScanUpdate {
                barcode,
                responsible,
                delta: self.increment.unwrap_or(1),
            }),
            _ => Err(ScanError::validation("Barcode and responsible are required")),
        }
    }
}

/// Query string of `GET /scans/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The scan workflow on top of a [`ScanStore`].
pub struct ScanService {
    store: Arc<dyn ScanStore>,
}

impl ScanService {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ScanStore> {
        &self.store
    }

    pub async fn record_scan(&self, request: ScanRequest) -> Result<ScanRecord, ScanError> {
        self.record_scan_at(request, Utc::now()).await
    }

    /// Apply a scan at `now`, then append its log entry.
    ///
    /// The log append is best-effort: a failure is logged and the updated
    /// record is still returned.
    pub async fn record_scan_at(
        &self,
        request: ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<ScanRecord, ScanError> {
        let update = request.into_update()?;

        let record = self
            .store
            .apply_scan(&update, now)
            .await?
            .ok_or_else(|| ScanError::CannotCreate {
                barcode: update.barcode.clone(),
            })?;

        let entry = NewLogEntry::for_record(&record, update.delta);
        if let Err(err) = self.store.append_log(&entry).await {
            warn!(
                barcode = %record.barcode,
                delta = update.delta,
                backend = self.store.backend_tag(),
                error = %err,
                "Failed to log scan activity"
            );
        }

        info!(
            barcode = %record.barcode,
            delta = update.delta,
            quantity = record.quantity,
            responsible = %record.responsible,
            "Scan recorded"
        );
        Ok(record)
    }

    /// Every record, most recent activity first.
    pub async fn records(&self) -> Result<Vec<ScanRecord>, ScanError> {
        Ok(self.store.list_records().await?)
    }

    /// Newest-first history for one barcode.
    pub async fn history(&self, query: LogQuery) -> Result<Vec<ScanLogEntry>, ScanError> {
        let barcode = non_blank(query.barcode)
            .ok_or_else(|| ScanError::validation("Barcode parameter is required"))?;
        let limit = query.limit.unwrap_or(MAX_LOG_ENTRIES);
        Ok(self.store.list_logs(&barcode, limit).await?)
    }

    pub async fn totals(&self) -> Result<ScanTotals, ScanError> {
        Ok(self.store.totals().await?)
    }

    /// Any store failure here counts as unavailable.
    pub async fn health(&self) -> Result<(), ScanError> {
        self.store
            .ping()
            .await
            .map_err(|err| StoreError::unavailable(err.to_string()).into())
    }
}
