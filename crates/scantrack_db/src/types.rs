//! Scan entities shared by every store backend and by the HTTP/CLI layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running quantity counter for one barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Store-assigned row identifier
    pub id: i64,
    /// Scanned barcode (unique)
    pub barcode: String,
    /// Running total, never negative
    pub quantity: i64,
    /// When the barcode was first seen
    #[serde(rename = "firstScanned")]
    pub first_scan: DateTime<Utc>,
    /// When the counter last changed
    #[serde(rename = "lastScanned")]
    pub last_scan: DateTime<Utc>,
    /// Operator behind the most recent scan
    pub responsible: String,
}

/// Immutable movement-log row written after each counter change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLogEntry {
    pub id: i64,
    /// Row id of the [`ScanRecord`] this entry belongs to
    pub scan_id: i64,
    pub barcode: String,
    /// Signed change requested by the scan
    pub delta: i64,
    /// Counter value right after the change
    pub quantity_after: i64,
    pub actor_name: String,
    pub created_at: DateTime<Utc>,
}

/// A log entry before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub scan_id: i64,
    pub barcode: String,
    pub delta: i64,
    pub quantity_after: i64,
    pub actor_name: String,
    pub created_at: DateTime<Utc>,
}

impl NewLogEntry {
    /// Describe the change that produced `record`.
    pub fn for_record(record: &ScanRecord, delta: i64) -> Self {
        Self {
            scan_id: record.id,
            barcode: record.barcode.clone(),
            delta,
            quantity_after: record.quantity,
            actor_name: record.responsible.clone(),
            created_at: record.last_scan,
        }
    }
}

/// A counter change to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanUpdate {
    pub barcode: String,
    pub responsible: String,
    pub delta: i64,
}

/// Aggregate counts across all tracked barcodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanTotals {
    /// Number of distinct barcodes
    pub total_codes: i64,
    /// Sum of every barcode's quantity
    pub total_products_scanned: i64,
}
