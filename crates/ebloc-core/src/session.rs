// ── Portal session ──
//
// Owns the HTTP client (and with it the cookie jar) plus the
// authenticated flag. Only the refresh cycle touches it, under the
// coordinator's flight lock, so no interior locking is needed here.

use ebloc_api::transport::{TlsMode, TransportConfig};
use ebloc_api::{Credentials, PortalClient, mask_value};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::config::{PortalConfig, TlsVerification};
use crate::error::CoreError;

/// Whether the current session is believed to be logged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated,
}

/// Lazily-created portal session.
pub struct SessionManager {
    base_url: url::Url,
    transport: TransportConfig,
    client: Option<PortalClient>,
    state: AuthState,
}

impl SessionManager {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            transport: build_transport(config),
            client: None,
            state: AuthState::Unauthenticated,
        }
    }

    /// Create the HTTP session if none is open. Idempotent.
    pub fn ensure_session(&mut self) -> Result<(), CoreError> {
        if self.client.is_none() {
            debug!(base_url = %self.base_url, "opening portal session");
            self.client = Some(PortalClient::new(self.base_url.clone(), &self.transport)?);
        }
        Ok(())
    }

    /// The open session's client.
    pub fn client(&self) -> Result<&PortalClient, CoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| CoreError::Internal("portal session is not open".into()))
    }

    /// Log in, opening the session first if needed.
    ///
    /// On failure the session is marked unauthenticated and the error is
    /// returned as [`CoreError::AuthenticationFailed`].
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), CoreError> {
        self.ensure_session()?;
        if credentials.password.expose_secret().is_empty() {
            warn!("logging in with an empty password");
        }

        let result = self.client()?.login(credentials).await;
        match result {
            Ok(()) => {
                self.state = AuthState::Authenticated;
                info!(
                    user = %mask_value(&credentials.username),
                    association = %mask_value(&credentials.association_id),
                    apartment = %mask_value(&credentials.apartment_id),
                    "logged in to portal"
                );
                Ok(())
            }
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                warn!(
                    user = %mask_value(&credentials.username),
                    error = %e,
                    "portal login failed"
                );
                Err(match CoreError::from(e) {
                    auth @ CoreError::AuthenticationFailed { .. } => auth,
                    other => CoreError::AuthenticationFailed {
                        message: other.to_string(),
                    },
                })
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn auth_state(&self) -> AuthState {
        self.state
    }

    /// Forget the login; the next cycle authenticates again.
    pub fn invalidate(&mut self) {
        if self.is_authenticated() {
            debug!("invalidating portal session");
        }
        self.state = AuthState::Unauthenticated;
    }

    /// Drop the HTTP session and its cookies.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("portal session closed");
        }
        self.state = AuthState::Unauthenticated;
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }
}

/// Build a [`TransportConfig`] from the portal configuration.
fn build_transport(config: &PortalConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        cookie_jar: None, // PortalClient::new adds one automatically
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
