//! Session persistence.
//!
//! The authenticated flag and username are kept in a small key-value store
//! between runs. [`KeyringSessionStore`] uses the OS keyring;
//! [`MemorySessionStore`] lives for the process only.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

const KEYRING_SERVICE: &str = "prioritycards";

/// String key-value storage for session payloads.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Stored session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub is_authenticated: bool,
    pub username: Option<String>,
}

impl PersistedSession {
    pub fn authenticated(username: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            username: Some(username.into()),
        }
    }

    /// Parse a stored payload. An authenticated payload without a username is
    /// rejected as corrupt.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let session: PersistedSession = serde_json::from_str(raw)?;
        if session.is_authenticated && session.username.as_deref().map_or(true, str::is_empty) {
            return Err(SessionError::Backend(
                "authenticated session without username".into(),
            ));
        }
        Ok(session)
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Thin wrapper around the OS keyring.
pub struct KeyringSessionStore {
    service: String,
}

impl KeyringSessionStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entry = keyring::Entry::new(&self.service, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let entry = keyring::Entry::new(&self.service, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let entry = keyring::Entry::new(&self.service, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local session store.
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values().insert(key.to_string(), value.to_string());
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Read the session stored under `key`.
///
/// A store that cannot be read counts as no session. A payload that cannot be
/// parsed is removed so it does not shadow the next login.
pub fn restore_session<S: SessionStore + ?Sized>(
    sessions: &S,
    key: &str,
) -> Option<PersistedSession> {
    let raw = match sessions.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(error = %e, "session store unreadable");
            return None;
        }
    };
    match PersistedSession::parse(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable session");
            if let Err(e) = sessions.remove(key) {
                tracing::error!(error = %e, "failed to clear session");
            }
            None
        }
    }
}

/// Forget the session stored under `key`. Absent sessions are not an error.
pub fn clear_session<S: SessionStore + ?Sized>(
    sessions: &S,
    key: &str,
) -> Result<(), SessionError> {
    sessions.remove(key)?;
    tracing::debug!(key, "cleared session");
    Ok(())
}

impl<T: SessionStore + ?Sized> SessionStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_session_uses_camel_case() {
        let json = PersistedSession::authenticated("alice").to_json().unwrap();
        assert_eq!(json, r#"{"isAuthenticated":true,"username":"alice"}"#);
    }

    #[test]
    fn parse_rejects_malformed_payloads() {
        assert!(PersistedSession::parse("{not json").is_err());
        assert!(PersistedSession::parse(r#"{"isAuthenticated":true}"#).is_err());
        assert!(PersistedSession::parse(r#"{"isAuthenticated":true,"username":""}"#).is_err());
        assert_eq!(
            PersistedSession::parse(r#"{"isAuthenticated":false,"username":null}"#).unwrap(),
            PersistedSession {
                is_authenticated: false,
                username: None
            }
        );
    }

    #[test]
    fn memory_store_counts_writes() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("auth").unwrap(), None);
        store.set("auth", "v").unwrap();
        assert_eq!(store.get("auth").unwrap().as_deref(), Some("v"));
        store.remove("auth").unwrap();
        store.remove("auth").unwrap();
        assert_eq!(store.get("auth").unwrap(), None);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn restore_session_reads_a_valid_payload() {
        let store = MemorySessionStore::new();
        assert_eq!(restore_session(&store, "auth"), None);

        let json = PersistedSession::authenticated("alice").to_json().unwrap();
        store.set("auth", &json).unwrap();
        let session = restore_session(&store, "auth").unwrap();
        assert!(session.is_authenticated);
        assert_eq!(session.username.as_deref(), Some("alice"));
        assert!(store.get("auth").unwrap().is_some());
    }

    #[test]
    fn restore_session_clears_a_corrupt_payload() {
        let store = MemorySessionStore::new();
        store.set("auth", "{\"isAuthenticated\":tru").unwrap();

        assert_eq!(restore_session(&store, "auth"), None);
        assert_eq!(store.get("auth").unwrap(), None);
    }

    #[test]
    fn clear_session_is_idempotent() {
        let store = MemorySessionStore::new();
        store.set("auth", "x").unwrap();
        clear_session(&store, "auth").unwrap();
        clear_session(&store, "auth").unwrap();
        assert_eq!(store.get("auth").unwrap(), None);
    }
}
