//! Typed session storage over a key-value backend

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::KeyValueStore;
use crate::message::ChatMessage;

const MESSAGE_KEY_SUFFIX: &str = "_message";

/// Well-known keys derived from a shared prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// Key holding the session record
    pub session: String,
    /// Key holding the persisted message sequence
    pub messages: String,
}

impl SessionKeys {
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            session: prefix.to_string(),
            messages: format!("{}{}", prefix, MESSAGE_KEY_SUFFIX),
        }
    }
}

/// JSON value storage keyed by name
///
/// Cloning is cheap; clones share the same backend.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    keys: SessionKeys,
}

impl SessionStore {
    /// Create a session store over `backend` using keys derived from `prefix`
    pub fn new(backend: Arc<dyn KeyValueStore>, prefix: &str) -> Self {
        Self {
            backend,
            keys: SessionKeys::from_prefix(prefix),
        }
    }

    /// The well-known keys this store uses
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Serialize `value` and store it under `key`, replacing any prior value
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> crate::Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)?;
        debug!(key, bytes = raw.len(), "Stored value");
        Ok(())
    }

    /// Read and deserialize the value under `key`
    ///
    /// Returns `Ok(None)` when nothing was ever written; a stored value that
    /// does not deserialize is an error, never confused with absence.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> crate::Result<Option<T>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, "Stored value is malformed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Remove the value under `key`
    pub fn delete(&self, key: &str) -> crate::Result<()> {
        self.backend.remove(key)?;
        debug!(key, "Deleted value");
        Ok(())
    }

    /// Load the persisted message sequence
    pub fn load_messages(&self) -> crate::Result<Option<Vec<ChatMessage>>> {
        self.read(&self.keys.messages)
    }

    /// Replace the persisted message sequence
    pub fn save_messages(&self, messages: &[ChatMessage]) -> crate::Result<()> {
        self.write(&self.keys.messages, messages)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SenderId;
    use crate::session::{FileStore, MemoryStore};
    use tempfile::TempDir;

    fn memory_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()), "parley_user")
    }

    fn sample_messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                message: "hi".to_string(),
                message_id: "a".to_string(),
                sender_id: Some(SenderId::Number(42)),
            },
            ChatMessage {
                message: "hello".to_string(),
                message_id: "b".to_string(),
                sender_id: Some(SenderId::from("u-7")),
            },
            ChatMessage {
                message: "anon".to_string(),
                message_id: "c".to_string(),
                sender_id: None,
            },
        ]
    }

    #[test]
    fn test_keys_from_prefix() {
        let keys = SessionKeys::from_prefix("app");
        assert_eq!(keys.session, "app");
        assert_eq!(keys.messages, "app_message");
    }

    #[test]
    fn test_message_round_trip() {
        let store = memory_store();
        let messages = sample_messages();

        store.write("history", &messages).unwrap();
        let loaded: Vec<ChatMessage> = store.read("history").unwrap().unwrap();
        assert_eq!(loaded, messages);
    }

    #[test]
    fn test_absent_is_distinct_from_empty() {
        let store = memory_store();
        assert_eq!(store.read::<Vec<ChatMessage>>("never").unwrap(), None);

        store.write::<[ChatMessage]>("empty", &[]).unwrap();
        assert_eq!(
            store.read::<Vec<ChatMessage>>("empty").unwrap(),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_write_overwrites() {
        let store = memory_store();
        store.write("k", &1u32).unwrap();
        store.write("k", &2u32).unwrap();
        assert_eq!(store.read::<u32>("k").unwrap(), Some(2));
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("parley_user_message", "{not json").unwrap();
        let store = SessionStore::new(backend, "parley_user");

        let err = store.load_messages().unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }

    #[test]
    fn test_delete_then_read_is_absent() {
        let store = memory_store();
        store.write("k", &"v").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.read::<String>("k").unwrap(), None);
    }

    #[test]
    fn test_file_backed_messages_survive_new_store() {
        let temp_dir = TempDir::new().unwrap();
        let messages = sample_messages();

        let store = SessionStore::new(Arc::new(FileStore::new(temp_dir.path())), "parley_user");
        store.save_messages(&messages).unwrap();

        let reopened =
            SessionStore::new(Arc::new(FileStore::new(temp_dir.path())), "parley_user");
        assert_eq!(reopened.load_messages().unwrap(), Some(messages));
    }
}
