pub mod auth;
pub mod card;
pub mod config;

use std::error::Error;
use std::sync::Arc;

use prioritycards_core::auth::{restore_session, KeyringSessionStore, PersistedSession, SessionStore};
use prioritycards_core::{Config, RestClient};

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Single-threaded runtime for one command invocation.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// HTTP client for the configured backend.
pub fn connect(config: &Config) -> CliResult<Arc<RestClient>> {
    let settings = config.backend_settings()?;
    Ok(Arc::new(RestClient::from_settings(&settings)?))
}

/// The stored session, if any. A corrupt payload reads as logged out and is
/// removed from the keyring.
pub fn current_session(config: &Config) -> Option<PersistedSession> {
    authenticated_session(&KeyringSessionStore::new(), &config.auth.session_key)
}

fn authenticated_session(sessions: &impl SessionStore, key: &str) -> Option<PersistedSession> {
    restore_session(sessions, key).filter(|s| s.is_authenticated)
}

/// Username of the logged-in user, or an error telling the user to log in.
pub fn require_login(config: &Config) -> CliResult<String> {
    current_session(config)
        .and_then(|s| s.username)
        .ok_or_else(|| "not logged in (run `prioritycards auth login`)".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prioritycards_core::auth::MemorySessionStore;

    #[test]
    fn corrupt_session_reads_as_logged_out_and_is_cleared() {
        let sessions = MemorySessionStore::new();
        sessions.set("auth", "not a session").unwrap();

        assert_eq!(authenticated_session(&sessions, "auth"), None);
        assert_eq!(sessions.get("auth").unwrap(), None);
    }

    #[test]
    fn only_authenticated_sessions_count() {
        let sessions = MemorySessionStore::new();
        sessions
            .set("auth", r#"{"isAuthenticated":false,"username":null}"#)
            .unwrap();
        assert_eq!(authenticated_session(&sessions, "auth"), None);

        let json = PersistedSession::authenticated("alice").to_json().unwrap();
        sessions.set("auth", &json).unwrap();
        let session = authenticated_session(&sessions, "auth").unwrap();
        assert_eq!(session.username.as_deref(), Some("alice"));
    }
}
