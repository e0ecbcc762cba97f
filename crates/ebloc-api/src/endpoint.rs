// Portal URLs and the fixed header values the portal expects.
//
// Paths are relative to the portal root so a mock server or mirror can
// stand in for `https://www.e-bloc.ro/`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Production portal root.
pub const DEFAULT_BASE_URL: &str = "https://www.e-bloc.ro/";

/// Desktop-browser user agent sent on every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

/// `Accept` header for the AJAX data endpoints.
pub const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// `Content-Type` of every POST body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub(crate) const LOGIN_PATH: &str = "index.php";

/// Referer the portal's own dashboard sends with AJAX calls.
pub(crate) const DATA_REFERER_PATH: &str = "index.php?page=19&t=1735328869";

/// One of the three AJAX data endpoints polled on every refresh.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Endpoint {
    /// Apartment summary: client code, balance, reading window.
    HomeInfo,
    /// Utility meter readings for a given month.
    MeterIndex,
    /// Payment receipts.
    Receipts,
}

impl Endpoint {
    /// Path relative to the portal root.
    pub fn path(self) -> &'static str {
        match self {
            Self::HomeInfo => "ajax/AjaxGetHomeApInfo.php",
            Self::MeterIndex => "ajax/AjaxGetIndexContoare.php",
            Self::Receipts => "ajax/AjaxGetPlatiChitanteToti.php",
        }
    }
}

/// Parse a portal root URL, normalising it to end with `/` so relative
/// paths join underneath it instead of replacing the last segment.
pub fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_names_are_kebab_case() {
        assert_eq!(Endpoint::HomeInfo.to_string(), "home-info");
        assert_eq!(Endpoint::MeterIndex.as_ref(), "meter-index");
        assert_eq!(Endpoint::Receipts.to_string(), "receipts");
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://mirror.example/portal").expect("valid URL");
        assert_eq!(url.as_str(), "https://mirror.example/portal/");
        assert_eq!(
            url.join(Endpoint::Receipts.path()).expect("join").as_str(),
            "https://mirror.example/portal/ajax/AjaxGetPlatiChitanteToti.php"
        );
    }

    #[test]
    fn default_base_url_joins_login_path() {
        let url = normalize_base_url(DEFAULT_BASE_URL).expect("valid URL");
        assert_eq!(
            url.join(LOGIN_PATH).expect("join").as_str(),
            "https://www.e-bloc.ro/index.php"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
