use crate::navigator::{Navigator, HOME_PATH, LOGIN_PATH};
use crate::session::{Session, SessionError};
use range_common::AdminIdentity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of gating a protected surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RedirectedToLogin,
}

/// Gates protected surfaces on the presence of a session and tears the
/// session down when the gateway reports it expired.
pub struct SessionGuard {
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
}

impl SessionGuard {
    pub fn new(session: Arc<Session>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn is_authed(&self) -> bool {
        self.session.is_present()
    }

    /// Synchronous check run before a protected surface renders. Never
    /// touches the network.
    pub fn require_auth(&self) -> Access {
        if self.is_authed() {
            return Access::Granted;
        }
        if !self.navigator.is_on_login() {
            self.navigator.navigate(LOGIN_PATH);
        }
        Access::RedirectedToLogin
    }

    pub fn login(&self, token: &str, identity: &AdminIdentity) -> Result<(), SessionError> {
        self.session.login(token, identity)?;
        self.navigator.navigate(HOME_PATH);
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.session.teardown()?;
        info!("Admin logged out");
        if !self.navigator.is_on_login() {
            self.navigator.navigate(LOGIN_PATH);
        }
        Ok(())
    }

    /// Reaction to an HTTP 401 from any protected call. Clears the session
    /// and sends the user to login unless they are already there. Returns
    /// whether a navigation happened.
    pub fn handle_expired(&self) -> bool {
        if let Err(e) = self.session.teardown() {
            error!("Failed to clear expired session: {}", e);
        }

        if self.navigator.is_on_login() {
            warn!("Session rejected while on login surface");
            return false;
        }

        warn!("Session expired, redirecting to login");
        self.navigator.navigate(LOGIN_PATH);
        true
    }
}
