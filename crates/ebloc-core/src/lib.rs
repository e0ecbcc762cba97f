// ebloc-core: Refresh engine between ebloc-api and consumers (CLI).
//
// A `RefreshCoordinator` owns one account's portal session, polls the
// three data endpoints on a schedule and publishes immutable snapshots.
// The `projection` functions turn a snapshot into display values.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod projection;
pub mod session;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_REFRESH_INTERVAL, DEFAULT_TIMEOUT, PortalConfig, TlsVerification};
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use error::CoreError;
pub use fetcher::Fetched;
pub use projection::{
    AccountSummary, MeterReading, ReceiptLine, ReceiptsView, UNKNOWN, account_summary,
    format_meter_index, format_money, meter_reading, receipts,
};
pub use session::{AuthState, SessionManager};
pub use snapshot::Snapshot;

pub use ebloc_api::{
    Credentials, DEFAULT_BASE_URL, Endpoint, HomeRecord, MeterRecord, ReceiptRecord, RecordMap,
    mask_value, normalize_base_url,
};
