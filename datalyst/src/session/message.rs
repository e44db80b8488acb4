//! Conversation messages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    User,
    /// The analyst's reply.
    Assistant,
}

impl Role {
    /// Lowercase role name as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Uppercase label used when rendering the context window.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Free-form metadata, e.g. the SQL behind an assistant reply.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Creation time (RFC 3339 when persisted; offset-less values read as UTC).
    #[serde(default, deserialize_with = "crate::state::lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message without metadata.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Map::new())
    }

    /// Create an assistant message without metadata.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Map::new())
    }

    /// Render as a `ROLE: content` line.
    #[must_use]
    pub fn context_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}
