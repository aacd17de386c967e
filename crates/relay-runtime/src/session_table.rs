//! Per-conversation dialog session ids.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// Builds a fresh session id of the form `{version_id}.{token}`.
pub fn generate_session_id(version_id: &str) -> String {
    format!("{version_id}.{}", Uuid::new_v4().simple())
}

#[derive(Debug)]
/// Maps a conversation key (the user's phone number) to its live session id.
pub struct SessionTable {
    version_id: String,
    sessions: Mutex<HashMap<String, String>>,
}

impl SessionTable {
    pub fn new(version_id: impl Into<String>) -> Self {
        Self {
            version_id: version_id.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    /// Returns the conversation's session id, creating one on first use.
    pub fn ensure(&self, conversation_key: &str) -> String {
        self.lock()
            .entry(conversation_key.to_string())
            .or_insert_with(|| generate_session_id(&self.version_id))
            .clone()
    }

    /// Removes the conversation's session and returns the ended id.
    ///
    /// The next `ensure` for the key generates a fresh id, so finished
    /// conversations hold no entry.
    pub fn retire(&self, conversation_key: &str) -> Option<String> {
        self.lock().remove(conversation_key)
    }

    pub fn current(&self, conversation_key: &str) -> Option<String> {
        self.lock().get(conversation_key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_session_ids_are_prefixed_with_version() {
        let id = generate_session_id("development");
        let (version, token) = id.split_once('.').expect("separator");
        assert_eq!(version, "development");
        assert_eq!(token.len(), 32);
        assert_ne!(generate_session_id("development"), id);
    }

    #[test]
    fn functional_ensure_is_stable_until_retired() {
        let table = SessionTable::new("v1");
        assert!(table.is_empty());
        let first = table.ensure("15551238888");
        assert_eq!(table.ensure("15551238888"), first);
        assert_eq!(table.current("15551238888").as_deref(), Some(first.as_str()));

        let ended = table.retire("15551238888");
        assert_eq!(ended.as_deref(), Some(first.as_str()));
        assert_eq!(table.current("15551238888"), None);
        let next = table.ensure("15551238888");
        assert_ne!(next, first);
        assert!(next.starts_with("v1."));
        assert_eq!(table.ensure("15551238888"), next);
    }

    #[test]
    fn unit_conversations_have_independent_sessions() {
        let table = SessionTable::new("v1");
        let a = table.ensure("1555000001");
        let b = table.ensure("1555000002");
        assert_ne!(a, b);
        table.retire("1555000001");
        assert_eq!(table.current("1555000002"), Some(b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn regression_ended_conversations_do_not_accumulate_entries() {
        let table = SessionTable::new("v1");
        for user in 0..50 {
            let key = format!("1555{user:06}");
            table.ensure(&key);
            table.retire(&key);
        }
        assert!(table.is_empty());
        assert_eq!(table.retire("1555"), None);
    }
}
