// Portal authentication
//
// Form-based login against `index.php`. The portal always answers 200,
// even for bad credentials, so success is recognised by the owners
// dashboard title in the returned page. The PHP session cookie lands in
// the client's jar and is reused by the data requests.

use reqwest::StatusCode;
use reqwest::header::{REFERER, USER_AGENT};
use tracing::debug;

use crate::auth::Credentials;
use crate::client::PortalClient;
use crate::endpoint::BROWSER_USER_AGENT;
use crate::error::Error;

/// Text present only on the page served to an authenticated owner.
pub const SUCCESS_MARKER: &str = "Acces online proprietari";

impl PortalClient {
    /// Log in with the account credentials.
    ///
    /// Succeeds only when the portal answers 200 and the page contains
    /// [`SUCCESS_MARKER`]. Every other outcome, including transport
    /// failures, is reported as [`Error::Authentication`].
    pub async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
        let url = self.login_url();
        debug!("logging in at {}", url);

        let resp = self
            .http()
            .post(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(REFERER, url.as_str())
            .form(&credentials.login_form())
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("login request failed: {e}"),
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status})"),
            });
        }

        let body = resp.text().await.map_err(|e| Error::Authentication {
            message: format!("failed to read login response: {e}"),
        })?;

        if !body.contains(SUCCESS_MARKER) {
            return Err(Error::Authentication {
                message: "portal did not return the owners dashboard (wrong credentials?)".into(),
            });
        }

        debug!("login successful");
        Ok(())
    }
}
