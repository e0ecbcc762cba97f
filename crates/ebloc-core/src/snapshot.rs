// ── Published portal data ──

use chrono::{DateTime, Utc};
use ebloc_api::{Endpoint, HomeRecord, MeterRecord, ReceiptRecord, RecordMap};
use serde::Serialize;

/// The three endpoint results of one completed refresh cycle.
///
/// Immutable once published. Endpoints that failed during the cycle
/// contribute an empty map and are listed in `failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub home: RecordMap<HomeRecord>,
    pub index: RecordMap<MeterRecord>,
    pub receipts: RecordMap<ReceiptRecord>,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<Endpoint>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            home: RecordMap::new(),
            index: RecordMap::new(),
            receipts: RecordMap::new(),
            fetched_at: Utc::now(),
            failed: Vec::new(),
        }
    }

    /// Whether every endpoint answered with data.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
