//! Conversation storage using SQLite.

use std::path::Path;

use agentos_common::{AgentOsError, ChatMessage, Result, Role};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub type ConversationId = i64;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    summary TEXT
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id)
);
";

/// A message as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub created_at: String,
}

impl StoredMessage {
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

fn db_err(e: rusqlite::Error) -> AgentOsError {
    AgentOsError::Memory(e.to_string())
}

/// SQLite-backed conversation history.
///
/// Rows are ordered by insertion id, so messages saved within the same second
/// keep their order.
pub struct ConversationStore {
    conn: Mutex<Connection>,
}

impl ConversationStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!(db_path = %path.display(), "Opening conversation store");
        Self::init(Connection::open(path).map_err(db_err)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn create_conversation(&self) -> Result<ConversationId> {
        let conn = self.conn.lock();
        conn.execute("INSERT INTO conversations DEFAULT VALUES", [])
            .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        debug!(conversation_id = id, "Created conversation");
        Ok(id)
    }

    /// Most recent conversation started within the last hour, or a new one.
    pub fn get_or_create_conversation(&self) -> Result<ConversationId> {
        let recent: Option<ConversationId> = self
            .conn
            .lock()
            .query_row(
                "SELECT id FROM conversations
                 WHERE created_at > datetime('now', '-1 hour')
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match recent {
            Some(id) => {
                debug!(conversation_id = id, "Reusing recent conversation");
                Ok(id)
            }
            None => self.create_conversation(),
        }
    }

    pub fn save_message(
        &self,
        conversation_id: ConversationId,
        role: Role,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<()> {
        let metadata = metadata.map(serde_json::to_string).transpose()?;
        self.conn
            .lock()
            .execute(
                "INSERT INTO messages (conversation_id, role, content, metadata)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conversation_id, role.as_str(), content, metadata],
            )
            .map_err(db_err)?;
        debug!(conversation_id, role = role.as_str(), "Saved message");
        Ok(())
    }

    /// The last `limit` messages of a conversation, oldest first.
    pub fn get_conversation_messages(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>> {
        self.query_messages(
            "SELECT role, content, metadata, created_at FROM messages
             WHERE conversation_id = ?1
             ORDER BY id DESC LIMIT ?2",
            params![conversation_id, limit as i64],
        )
    }

    /// The last `limit` messages across all conversations, oldest first.
    pub fn get_recent_context(&self, limit: usize) -> Result<Vec<StoredMessage>> {
        self.query_messages(
            "SELECT role, content, metadata, created_at FROM messages
             ORDER BY id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    fn query_messages(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<StoredMessage>> {
        let rows: Vec<(String, String, Option<String>, String)> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params, |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;
            rows
        };

        let mut messages = rows
            .into_iter()
            .map(|(role, content, metadata, created_at)| -> Result<StoredMessage> {
                Ok(StoredMessage {
                    role: role.parse()?,
                    content,
                    metadata: metadata
                        .map(|m| serde_json::from_str(&m))
                        .transpose()?,
                    created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }
}
