//! Shared-credential authentication.
//!
//! A login is a lookup in the credentials table for a row whose `username`
//! and `password_hash` both match. On success the authenticated flag and
//! username are persisted through a [`SessionStore`] so later runs start
//! logged in; [`AuthService::logout`] clears them.

pub mod session;

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::AuthError;
use crate::remote::{Query, RemoteService};
use crate::storage::Config;

pub use session::{
    clear_session, restore_session, KeyringSessionStore, MemorySessionStore, PersistedSession,
    SessionStore,
};

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";
const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

/// Observable authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub username: Option<String>,
    pub is_logging_in: bool,
    /// User-facing message from the last failed login.
    pub error: Option<String>,
}

/// Settings for [`AuthService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOptions {
    pub credentials_table: String,
    pub session_key: String,
    pub hash_passwords: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            credentials_table: "auth_users".into(),
            session_key: "auth".into(),
            hash_passwords: false,
        }
    }
}

impl From<&Config> for AuthOptions {
    fn from(config: &Config) -> Self {
        Self {
            credentials_table: config.backend.credentials_table.clone(),
            session_key: config.auth.session_key.clone(),
            hash_passwords: config.auth.hash_passwords,
        }
    }
}

/// Lowercase hex SHA-256 of the password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Credential check plus session lifecycle.
pub struct AuthService<R: RemoteService, S: SessionStore> {
    remote: Arc<R>,
    sessions: S,
    options: AuthOptions,
    state: AuthState,
}

impl<R: RemoteService, S: SessionStore> AuthService<R, S> {
    /// Create the service and restore any persisted session.
    ///
    /// A payload that cannot be read or parsed is removed and the service
    /// starts logged out.
    pub fn init(remote: Arc<R>, sessions: S, options: AuthOptions) -> Self {
        let mut service = Self {
            remote,
            sessions,
            options,
            state: AuthState::default(),
        };
        service.restore();
        service
    }

    fn restore(&mut self) {
        if let Some(session) = restore_session(&self.sessions, &self.options.session_key) {
            tracing::debug!(username = ?session.username, "restored session");
            self.state.is_authenticated = session.is_authenticated;
            self.state.username = session.username;
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    pub fn username(&self) -> Option<&str> {
        self.state.username.as_deref()
    }

    /// Check the credentials and, on success, persist the session.
    ///
    /// Failures are reported twice: as the returned error and as
    /// `state().error`. A rejected login performs no session write.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        self.state.is_logging_in = true;
        self.state.error = None;

        let result = self.check_credentials(username, password).await;
        self.state.is_logging_in = false;

        let matched = match result {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                tracing::warn!(username, "login rejected");
                self.state.error = Some(INVALID_CREDENTIALS_MESSAGE.into());
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(username, error = %e, "login failed");
                self.state.error = Some(LOGIN_FAILED_MESSAGE.into());
                return Err(e);
            }
        };

        let payload = PersistedSession::authenticated(matched.clone()).to_json()?;
        if let Err(e) = self.sessions.set(&self.options.session_key, &payload) {
            tracing::error!(error = %e, "failed to persist session");
            self.state.error = Some(LOGIN_FAILED_MESSAGE.into());
            return Err(e.into());
        }

        tracing::info!(username = %matched, "logged in");
        self.state.is_authenticated = true;
        self.state.username = Some(matched);
        Ok(())
    }

    /// Returns the stored username when exactly one credential row matches.
    async fn check_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, AuthError> {
        let secret = if self.options.hash_passwords {
            hash_password(password)
        } else {
            password.to_string()
        };
        let query = Query::new()
            .eq("username", username)
            .eq("password_hash", secret);

        let rows = match self
            .remote
            .select(&self.options.credentials_table, &query)
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match rows.as_slice() {
            [row] => Ok(Some(
                row.get("username")
                    .and_then(|v| v.as_str())
                    .unwrap_or(username)
                    .to_string(),
            )),
            _ => Ok(None),
        }
    }

    /// Clear the in-memory state and the persisted session.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        if let Some(ref username) = self.state.username {
            tracing::info!(username = %username, "logged out");
        }
        self.state.is_authenticated = false;
        self.state.username = None;
        self.state.error = None;
        clear_session(&self.sessions, &self.options.session_key)?;
        Ok(())
    }
}
