use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::token;
use crate::models::UserProfile;

const ACCESS_TOKEN_KEY: &str = "insightx_access_token";
const REFRESH_TOKEN_KEY: &str = "insightx_refresh_token";
const USER_KEY: &str = "insightx_user";

/// Buffered session events per subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Session storage unavailable: {0}")]
    Unavailable(String),
}

/// Session-scoped key/value storage.
///
/// Implementations must drop their contents when the session ends and must
/// not share them with other sessions.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage; lives exactly as long as the session.
#[derive(Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    LoggedOut,
    /// The access token's expiry passed.
    Expired,
    /// The backend rejected the credentials and no refresh token was held.
    Unauthorized,
    RefreshFailed,
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionEndReason::LoggedOut => "logged out",
            SessionEndReason::Expired => "session expired",
            SessionEndReason::Unauthorized => "not authorized",
            SessionEndReason::RefreshFailed => "session refresh failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ended(SessionEndReason),
}

/// Holder of the current session's credentials.
/// Clone is cheap; clones share the same storage and event channel.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { storage, events }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn get_user(&self) -> Option<UserProfile> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored user profile is unreadable");
                None
            }
        }
    }

    /// Store the given credentials. Absent or empty fields keep their current
    /// values. Storage failures are logged, never returned.
    pub fn save(&self, access_token: &str, refresh_token: Option<&str>, user: Option<&UserProfile>) {
        let refresh_token = refresh_token.filter(|t| !t.is_empty());
        if !access_token.is_empty() {
            self.write(ACCESS_TOKEN_KEY, access_token);
        }
        if let Some(refresh_token) = refresh_token {
            self.write(REFRESH_TOKEN_KEY, refresh_token);
        }
        if let Some(user) = user {
            match serde_json::to_string(user) {
                Ok(json) => self.write(USER_KEY, &json),
                Err(e) => warn!(error = %e, "Failed to serialize user profile"),
            }
        }
        debug!(
            with_refresh = refresh_token.is_some(),
            with_user = user.is_some(),
            "Session credentials saved"
        );
    }

    /// Remove all credentials. Safe to call repeatedly.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key = key, error = %e, "Failed to clear session value");
            }
        }
    }

    /// Clear the session and tell subscribers why it ended.
    pub fn end_session(&self, reason: SessionEndReason) {
        self.clear();
        debug!(%reason, "Session ended");
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::Ended(reason));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_access_token_expired(&self, token: &str) -> bool {
        token::is_expired(token)
    }

    /// A session is valid when both an access token and a user are present.
    pub fn is_session_valid(&self) -> bool {
        self.get_access_token().is_some() && self.get_user().is_some()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read session value");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(key = key, error = %e, "Failed to save session value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::make_token;
    use chrono::{Duration, Utc};

    /// Storage that rejects every operation, like a locked-down browser.
    struct UnavailableStorage;

    impl SessionStorage for UnavailableStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    fn user(name: &str) -> UserProfile {
        UserProfile {
            name: name.to_string(),
            email: None,
        }
    }

    #[test]
    fn test_empty_store_reads_nothing() {
        let store = TokenStore::in_memory();
        assert_eq!(store.get_access_token(), None);
        assert_eq!(store.get_refresh_token(), None);
        assert_eq!(store.get_user(), None);
        assert!(!store.is_session_valid());
    }

    #[test]
    fn test_save_skips_empty_values() {
        let store = TokenStore::in_memory();
        store.save("T1", Some("R1"), Some(&user("A")));
        store.save("", Some(""), None);
        assert_eq!(store.get_access_token().as_deref(), Some("T1"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("R1"));

        let fresh = TokenStore::in_memory();
        fresh.save("", None, Some(&user("A")));
        assert_eq!(fresh.get_access_token(), None);
    }

    #[test]
    fn test_save_all_fields() {
        let store = TokenStore::in_memory();
        store.save("T1", Some("R1"), Some(&user("A")));

        assert_eq!(store.get_access_token().as_deref(), Some("T1"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("R1"));
        assert_eq!(store.get_user(), Some(user("A")));
        assert!(store.is_session_valid());
    }

    #[test]
    fn test_partial_save_keeps_other_fields() {
        let store = TokenStore::in_memory();
        store.save("T1", Some("R1"), Some(&user("A")));
        store.save("T2", None, None);

        assert_eq!(store.get_access_token().as_deref(), Some("T2"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("R1"));
        assert_eq!(store.get_user(), Some(user("A")));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = TokenStore::in_memory();
        store.save("T1", Some("R1"), Some(&user("A")));
        store.clear();
        store.clear();

        assert_eq!(store.get_access_token(), None);
        assert_eq!(store.get_refresh_token(), None);
        assert_eq!(store.get_user(), None);
    }

    #[test]
    fn test_session_valid_without_refresh_token() {
        let store = TokenStore::in_memory();
        store.save("T1", None, Some(&user("A")));
        assert!(store.is_session_valid());
    }

    #[test]
    fn test_session_invalid_without_user() {
        let store = TokenStore::in_memory();
        store.save("T1", Some("R1"), None);
        assert!(!store.is_session_valid());
    }

    #[test]
    fn test_unavailable_storage_does_not_panic() {
        let store = TokenStore::new(Arc::new(UnavailableStorage));
        store.save("T1", Some("R1"), Some(&user("A")));
        store.clear();
        assert_eq!(store.get_access_token(), None);
        assert!(!store.is_session_valid());
    }

    #[test]
    fn test_corrupt_user_reads_as_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(USER_KEY, "{not json").unwrap();
        let store = TokenStore::new(storage);
        assert_eq!(store.get_user(), None);
    }

    #[test]
    fn test_expiry_check_uses_token_claims() {
        let store = TokenStore::in_memory();
        assert!(!store.is_access_token_expired(&make_token(Utc::now() + Duration::hours(1))));
        assert!(store.is_access_token_expired(&make_token(Utc::now() - Duration::hours(1))));
        assert!(store.is_access_token_expired("garbage"));
    }

    #[test]
    fn test_end_session_clears_and_notifies() {
        let store = TokenStore::in_memory();
        let mut events = store.subscribe();
        store.save("T1", Some("R1"), Some(&user("A")));

        store.end_session(SessionEndReason::Expired);

        assert_eq!(store.get_access_token(), None);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Ended(SessionEndReason::Expired)
        );
    }

    #[test]
    fn test_clones_share_storage() {
        let store = TokenStore::in_memory();
        let other = store.clone();
        store.save("T1", None, None);
        assert_eq!(other.get_access_token().as_deref(), Some("T1"));
    }
}
