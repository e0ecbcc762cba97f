// ── Fail-soft endpoint fetching ──
//
// One refresh cycle issues three independent data requests. A failing
// endpoint must not sink the others, so every error other than session
// expiry is logged here and degraded to an empty record map.

use ebloc_api::{Credentials, Endpoint, PortalClient, RecordMap};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::CoreError;

/// Outcome of a single endpoint request.
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    /// Records decoded from the response, possibly none.
    Data(RecordMap<T>),
    /// The request failed. The cause is logged where it happens.
    Failed,
    /// The portal answered with the login page.
    SessionExpired,
}

impl<T> Fetched<T> {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// The records, or an empty map for any non-data outcome.
    pub fn into_records(self) -> RecordMap<T> {
        match self {
            Self::Data(records) => records,
            Self::Failed | Self::SessionExpired => RecordMap::new(),
        }
    }
}

/// Request one endpoint, never failing.
pub async fn fetch<T: DeserializeOwned>(
    client: &PortalClient,
    endpoint: Endpoint,
    params: &[(&str, String)],
) -> Fetched<T> {
    match client.fetch(endpoint, params).await {
        Ok(records) => {
            debug!(%endpoint, records = records.len(), "endpoint fetched");
            Fetched::Data(records)
        }
        Err(ref e) if e.is_auth_expired() => {
            warn!(%endpoint, "session expired while fetching");
            Fetched::SessionExpired
        }
        Err(e) => {
            let transient = e.is_transient();
            let err = CoreError::FetchFailed {
                endpoint: endpoint.to_string(),
                message: CoreError::from(e).to_string(),
            };
            error!(%endpoint, transient, error = %err, "fetch failed, treating as empty");
            Fetched::Failed
        }
    }
}

/// Form parameters for an endpoint.
///
/// Every endpoint gets the association and apartment ids; the meter
/// index additionally takes the reading month.
pub fn endpoint_params(
    endpoint: Endpoint,
    credentials: &Credentials,
    month: &str,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("pIdAsoc", credentials.association_id.clone())];
    if endpoint == Endpoint::MeterIndex {
        params.push(("pLuna", month.to_owned()));
    }
    params.push(("pIdAp", credentials.apartment_id.clone()));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    fn creds() -> Credentials {
        Credentials::new("u", SecretString::from("p".to_string()), "4242", "17")
    }

    #[test]
    fn meter_index_params_include_month() {
        let params = endpoint_params(Endpoint::MeterIndex, &creds(), "2024-12");
        assert_eq!(
            params,
            vec![
                ("pIdAsoc", "4242".to_string()),
                ("pLuna", "2024-12".to_string()),
                ("pIdAp", "17".to_string()),
            ]
        );
    }

    #[test]
    fn other_endpoints_send_only_ids() {
        for endpoint in [Endpoint::HomeInfo, Endpoint::Receipts] {
            let params = endpoint_params(endpoint, &creds(), "2024-12");
            assert_eq!(
                params,
                vec![("pIdAsoc", "4242".to_string()), ("pIdAp", "17".to_string())]
            );
        }
    }

    #[test]
    fn non_data_outcomes_degrade_to_empty() {
        let failed: Fetched<ebloc_api::HomeRecord> = Fetched::Failed;
        assert!(!failed.is_data());
        assert!(failed.into_records().is_empty());
        let expired: Fetched<ebloc_api::HomeRecord> = Fetched::SessionExpired;
        assert!(expired.is_session_expired());
        assert!(expired.into_records().is_empty());
    }
}
