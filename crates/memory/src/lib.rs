//! Persistent conversation memory for agentos.
//!
//! Conversations and their messages live in a single SQLite file:
//!
//! ```text
//! conversations (id, created_at, summary)
//!       │ 1
//!       │
//!       │ n
//! messages (id, conversation_id, role, content, metadata JSON, created_at)
//! ```

pub mod store;

pub use store::{ConversationId, ConversationStore, StoredMessage};
