//! # Local Store
//!
//! The authoritative on-device store for chats and messages.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         LOCAL STORE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sync Router / Restore Orchestrator / Upload Driver                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   LocalStore trait: upsert/get by id,             │
//! │  │   LocalStore    │   owner-scoped listing with lifecycle filters,    │
//! │  │    (trait)      │   archive/trash/restore/delete, local_only flip   │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SqliteStore   │   rusqlite behind Arc<Mutex<Connection>>          │
//! │  │                 │   - In-memory for tests                           │
//! │  │                 │   - File for production                           │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sync core never reaches into SQLite directly; everything goes
//! through the [`LocalStore`] trait so the surrounding application can
//! substitute its own persistence engine.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{Chat, Message};

/// Lifecycle filter for owner-scoped chat listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFilter {
    /// Not archived and not trashed
    Active,
    /// Archived, not trashed
    Archived,
    /// In the local trash
    Trashed,
    /// Everything, regardless of lifecycle state
    All,
}

/// Operations the sync core needs from on-device persistence.
///
/// All writes are upserts keyed by stable string id; the store must
/// guarantee atomic single-record writes (single-writer-per-id in
/// effect), which is all the concurrency the sync core relies on.
pub trait LocalStore: Send + Sync {
    /// Create or replace a chat by id
    fn upsert_chat(&self, chat: &Chat) -> Result<()>;

    /// Fetch a chat by id
    fn get_chat(&self, id: &str) -> Result<Option<Chat>>;

    /// List chats for an owner, newest `updated_at` first
    fn list_chats(&self, owner_id: &str, filter: ChatFilter) -> Result<Vec<Chat>>;

    /// Create or replace a message by id
    fn upsert_message(&self, message: &Message) -> Result<()>;

    /// Fetch a message by id
    fn get_message(&self, id: &str) -> Result<Option<Message>>;

    /// All messages in a chat, oldest first (full list, not paginated)
    fn messages_for_chat(&self, chat_id: &str) -> Result<Vec<Message>>;

    /// Clear the `local_only` flag on every message in a chat.
    ///
    /// Returns the number of rows flipped. Used by the one-way
    /// incognito-to-cloud transition.
    fn clear_local_only(&self, chat_id: &str) -> Result<usize>;

    /// Archive a chat; returns false if the id does not exist
    fn archive_chat(&self, id: &str, at: i64) -> Result<bool>;

    /// Clear a chat's archive marker
    fn unarchive_chat(&self, id: &str) -> Result<bool>;

    /// Move a chat to the local trash
    fn trash_chat(&self, id: &str, at: i64) -> Result<bool>;

    /// Pull a chat back out of the local trash
    fn restore_chat_from_trash(&self, id: &str) -> Result<bool>;

    /// Permanently delete a chat and all of its messages
    fn delete_chat_forever(&self, id: &str) -> Result<bool>;

    /// Soft-delete a single message
    fn soft_delete_message(&self, id: &str, at: i64) -> Result<bool>;
}
