// Portal HTTP client
//
// Wraps `reqwest::Client` with portal URL construction, the fixed header
// sets the AJAX endpoints expect, and session-expiry detection. Login is
// implemented as an inherent method in `login.rs` to keep this module
// focused on transport mechanics.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::endpoint::{
    ACCEPT_JSON, BROWSER_USER_AGENT, DATA_REFERER_PATH, Endpoint, FORM_CONTENT_TYPE, LOGIN_PATH,
};
use crate::error::{Error, body_preview};
use crate::models::{RecordMap, parse_records};
use crate::transport::TransportConfig;

/// Raw HTTP client for the e-bloc owners portal.
///
/// Holds one `reqwest::Client` whose cookie jar carries the PHP session
/// between the login request and the AJAX data requests.
pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
    /// Cookie jar reference for inspecting the session cookie.
    cookie_jar: Option<Arc<Jar>>,
}

impl PortalClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (the portal session lives in a cookie). `base_url`
    /// must already be normalised with a trailing slash.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let cookie_jar = config.cookie_jar.clone();
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            cookie_jar,
        })
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The portal root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether the cookie jar currently holds any cookie for the portal.
    pub fn has_session_cookie(&self) -> bool {
        self.cookie_jar
            .as_ref()
            .and_then(|jar| jar.cookies(&self.base_url))
            .is_some()
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub fn login_url(&self) -> Url {
        self.join(LOGIN_PATH)
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Url {
        self.join(endpoint.path())
    }

    fn data_referer(&self) -> Url {
        self.join(DATA_REFERER_PATH)
    }

    fn join(&self, path: &str) -> Url {
        // All paths are static relative references; joining cannot fail.
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    // ── Data requests ────────────────────────────────────────────────

    /// POST the form parameters to a data endpoint and decode the records.
    ///
    /// Returns [`Error::SessionExpired`] when the portal answers with the
    /// login page (HTTP 401/403, a redirect onto the login URL, or a
    /// non-JSON body containing the login form). Any status other than 200
    /// is an [`Error::Http`]; undecodable bodies are [`Error::Deserialization`].
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        params: &[(&str, String)],
    ) -> Result<RecordMap<T>, Error> {
        let url = self.endpoint_url(endpoint);
        debug!(%endpoint, "POST {url}");

        let resp = self
            .http
            .post(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, ACCEPT_JSON)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(REFERER, self.data_referer().as_str())
            .form(params)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%endpoint, %status, "portal rejected session");
            return Err(Error::SessionExpired);
        }

        if resp.url().path() == self.login_url().path() {
            debug!(%endpoint, "request was redirected to the login page");
            return Err(Error::SessionExpired);
        }

        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        let body = resp.text().await?;
        trace!(%endpoint, bytes = body.len(), "response body received");

        parse_records(&body).map_err(|e| {
            if is_login_page(&body) {
                debug!(%endpoint, "received login form instead of data");
                Error::SessionExpired
            } else {
                e
            }
        })
    }
}

/// The login page carries the username input; data endpoints never do.
fn is_login_page(body: &str) -> bool {
    body.contains("pUser")
}
