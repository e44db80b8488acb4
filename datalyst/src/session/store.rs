//! Bounded per-session message history.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::message::{Message, Role};
use crate::error::StorageResult;
use crate::state;

/// Number of trailing messages rendered by [`SessionStore::context_window`].
pub const CONTEXT_WINDOW_MESSAGES: usize = 5;

/// Default history bound per session.
pub const DEFAULT_MAX_HISTORY: usize = 10;

static EMPTY_HISTORY: VecDeque<Message> = VecDeque::new();

/// In-memory store of conversation sessions.
///
/// Every operation is total over unknown session ids: reads yield empty
/// results and writes create the session on demand. Only
/// [`restore`](Self::restore) can fail on a missing source.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, VecDeque<Message>>,
    current: Option<String>,
    max_history: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl SessionStore {
    /// Create an empty store keeping at most `max_history` messages per session.
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            current: None,
            max_history,
        }
    }

    /// The per-session history bound.
    #[must_use]
    pub const fn max_history(&self) -> usize {
        self.max_history
    }

    /// Initialize a session and make it current.
    ///
    /// Idempotent: an existing session keeps its history.
    pub fn create(&mut self, session_id: impl Into<String>) -> String {
        let session_id = session_id.into();
        self.sessions.entry(session_id.clone()).or_default();
        self.current = Some(session_id.clone());
        debug!(session_id = %session_id, "session_created");
        session_id
    }

    /// The current session id, if one was created.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Whether the id has been seen.
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of known sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Append a message, creating the session if needed and evicting the
    /// oldest entries beyond the history bound.
    pub fn append(
        &mut self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
        metadata: Option<Map<String, Value>>,
    ) {
        let history = self.sessions.entry(session_id.to_owned()).or_default();
        history.push_back(Message::new(role, content, metadata.unwrap_or_default()));

        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Ordered history of a session, oldest first. Unknown ids yield an
    /// empty sequence.
    #[must_use]
    pub fn history(&self, session_id: &str) -> &VecDeque<Message> {
        self.sessions.get(session_id).unwrap_or(&EMPTY_HISTORY)
    }

    /// Render the last few messages as `ROLE: content` lines, oldest first.
    ///
    /// Returns an empty string when there is no history.
    #[must_use]
    pub fn context_window(&self, session_id: &str) -> String {
        let history = self.history(session_id);
        let skip = history.len().saturating_sub(CONTEXT_WINDOW_MESSAGES);

        history
            .iter()
            .skip(skip)
            .map(Message::context_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reset a session's history without forgetting the id.
    pub fn clear(&mut self, session_id: &str) {
        self.sessions
            .entry(session_id.to_owned())
            .or_default()
            .clear();
        info!(session_id = %session_id, "history_cleared");
    }

    /// Write a session's messages to `destination` as a JSON array.
    ///
    /// An unknown session is written as an empty array.
    pub async fn persist(&self, session_id: &str, destination: &Path) -> StorageResult<()> {
        state::write_json(destination, self.history(session_id)).await?;
        info!(
            session_id = %session_id,
            messages = self.history(session_id).len(),
            path = %destination.display(),
            "session_saved"
        );
        Ok(())
    }

    /// Replace a session's history with the messages stored at `source`.
    ///
    /// Fails with [`StorageError::NotFound`](crate::error::StorageError::NotFound)
    /// if the file does not exist. Restored histories longer than the bound
    /// keep their newest messages.
    pub async fn restore(&mut self, session_id: &str, source: &Path) -> StorageResult<()> {
        let mut messages: VecDeque<Message> = state::read_json(source).await?;
        while messages.len() > self.max_history {
            messages.pop_front();
        }

        info!(
            session_id = %session_id,
            messages = messages.len(),
            path = %source.display(),
            "session_restored"
        );
        self.sessions.insert(session_id.to_owned(), messages);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    fn contents(store: &SessionStore, id: &str) -> Vec<String> {
        store
            .history(id)
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    #[test]
    fn test_history_is_bounded_and_keeps_newest() {
        let mut store = SessionStore::new(3);
        for i in 0..7 {
            store.append("s", Role::User, format!("m{i}"), None);
        }
        assert_eq!(contents(&store, "s"), vec!["m4", "m5", "m6"]);

        let mut store = SessionStore::new(10);
        for i in 0..4 {
            store.append("s", Role::User, format!("m{i}"), None);
        }
        assert_eq!(store.history("s").len(), 4);
    }

    #[test]
    fn test_unknown_session_reads_are_empty() {
        let store = SessionStore::default();
        assert!(store.history("nope").is_empty());
        assert_eq!(store.context_window("nope"), "");
        assert!(store.current().is_none());
    }

    #[test]
    fn test_append_creates_session_on_demand() {
        let mut store = SessionStore::default();
        store.append("fresh", Role::User, "hello", None);
        assert!(store.contains("fresh"));
        assert_eq!(store.history("fresh")[0].role, Role::User);
        // Implicit creation does not move the current pointer.
        assert!(store.current().is_none());
    }

    #[test]
    fn test_create_is_idempotent() {
        let mut store = SessionStore::default();
        let id = store.create("abc");
        store.append(&id, Role::User, "kept", None);
        store.create("other");
        assert_eq!(store.current(), Some("other"));

        store.create("abc");
        assert_eq!(store.current(), Some("abc"));
        assert_eq!(contents(&store, "abc"), vec!["kept"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_context_window() {
        let mut store = SessionStore::default();
        store.append("s", Role::User, "first", None);
        store.append("s", Role::Assistant, "second", None);
        assert_eq!(store.context_window("s"), "USER: first\nASSISTANT: second");

        for i in 0..6 {
            store.append("s", Role::User, format!("q{i}"), None);
        }
        let window = store.context_window("s");
        let lines: Vec<_> = window.lines().collect();
        assert_eq!(lines.len(), CONTEXT_WINDOW_MESSAGES);
        assert_eq!(lines[0], "USER: q1");
        assert_eq!(lines[4], "USER: q5");
    }

    #[test]
    fn test_clear_keeps_session_id() {
        let mut store = SessionStore::default();
        store.append("s", Role::User, "hello", None);
        store.clear("s");
        assert!(store.contains("s"));
        assert!(store.history("s").is_empty());
    }

    #[test]
    fn test_metadata_is_kept() {
        let mut store = SessionStore::default();
        let mut metadata = Map::new();
        metadata.insert("rows".into(), Value::from(3));
        store.append("s", Role::Assistant, "three rows", Some(metadata));
        assert_eq!(store.history("s")[0].metadata["rows"], 3);
    }

    #[tokio::test]
    async fn test_persist_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_state.json");

        let mut store = SessionStore::default();
        store.append("s", Role::User, "What is the total revenue?", None);
        let mut metadata = Map::new();
        metadata.insert("sql".into(), Value::from("SELECT SUM(total_price) FROM sales"));
        store.append("s", Role::Assistant, "Revenue is 42.", Some(metadata));
        store.persist("s", &path).await.unwrap();

        let mut restored = SessionStore::default();
        restored.append("s", Role::User, "will be replaced", None);
        restored.restore("s", &path).await.unwrap();

        assert_eq!(restored.history("s"), store.history("s"));
        assert_eq!(restored.context_window("s"), store.context_window("s"));
    }

    #[tokio::test]
    async fn test_restore_offsetless_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_state.json");
        tokio::fs::write(
            &path,
            r#"[{"role": "user", "content": "total sales?", "metadata": {},
                 "timestamp": "2025-03-01T10:00:00.123456"}]"#,
        )
        .await
        .unwrap();

        let mut store = SessionStore::default();
        store.restore("s", &path).await.unwrap();

        let history = store.history("s");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "total sales?");
        assert_eq!(history[0].timestamp.to_rfc3339(), "2025-03-01T10:00:00.123456+00:00");
    }

    #[tokio::test]
    async fn test_persist_unknown_session_writes_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");

        SessionStore::default().persist("ghost", &path).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[tokio::test]
    async fn test_restore_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::default();
        store.append("s", Role::User, "untouched", None);

        let err = store
            .restore("s", &dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(contents(&store, "s"), vec!["untouched"]);
    }
}
