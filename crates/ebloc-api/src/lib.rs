// ebloc-api: Async Rust client for the e-bloc.ro owners portal

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod error;
mod login;
pub mod models;
pub mod transport;

pub use auth::{Credentials, mask_value};
pub use client::PortalClient;
pub use endpoint::{DEFAULT_BASE_URL, Endpoint, normalize_base_url};
pub use error::Error;
pub use login::SUCCESS_MARKER;
pub use models::{HomeRecord, MeterRecord, ReceiptRecord, RecordMap, parse_records};
pub use transport::{TlsMode, TransportConfig};
