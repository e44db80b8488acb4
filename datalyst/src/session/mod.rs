//! Session management for conversation state.
//!
//! A session is a bounded, ordered message history keyed by an opaque id.
//! Sessions are created explicitly with [`SessionStore::create`] or
//! implicitly by the first [`SessionStore::append`], and are never deleted,
//! only cleared. The most recent turns are rendered by
//! [`SessionStore::context_window`] and handed to the SQL generator so
//! follow-up questions can refer back to earlier ones.

mod message;
mod store;

pub use message::{Message, Role};
pub use store::{CONTEXT_WINDOW_MESSAGES, DEFAULT_MAX_HISTORY, SessionStore};
