//! # Mirror Store
//!
//! Transport-agnostic seam to the remote, per-user document store.
//!
//! ## Document Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MIRROR STORE                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  owner (user id)                                                        │
//! │  └── chats (collection)                                                 │
//! │      └── <chat_id> (CloudChat document)                                 │
//! │          ├── messages (paginated sub-collection)                        │
//! │          │   └── <message_id> (CloudMessage document)                   │
//! │          └── chunks                                                     │
//! │              └── <message_id> (ChunkBlob, bodies past the head limit)   │
//! │                                                                         │
//! │  Listing messages is cursor-based: pages are ordered by                 │
//! │  (created_at, id) and the cursor is an opaque token naming the last     │
//! │  record seen, so pages stay stable under concurrent inserts.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations wrap whatever transport the application uses; every
//! failure surfaces as [`Error::Transport`](crate::Error::Transport). The
//! Cloud Mirror Engine decides which of those to swallow and which to
//! propagate. Per-call timeouts are the implementation's responsibility.

mod memory;

pub use memory::MemoryMirror;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CloudChat, CloudMessage};

/// One page of a message listing
#[derive(Debug, Clone)]
pub struct MessagePage {
    /// Messages in `(created_at, id)` order
    pub messages: Vec<CloudMessage>,
    /// Cursor for the next page; None when this page is the last
    pub next_cursor: Option<String>,
}

/// Externally stored remainder of a long message body.
///
/// Keyed by `(chat_id, message_id)`. `parts` are ordered text segments;
/// concatenating `text_head` and every part yields the original body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkBlob {
    /// Ordered remainder segments
    pub parts: Vec<String>,
    /// Byte length of the full original text (head included)
    pub total_len: usize,
    /// Hex-encoded SHA-256 of the full original text
    pub checksum: String,
}

/// Document operations the sync core needs from the remote store.
///
/// All keys are `(owner_id, chat_id)` or `(owner_id, chat_id, message_id)`;
/// writes are idempotent create-or-replace by id.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Create or replace a chat document
    async fn put_chat(&self, owner_id: &str, chat: &CloudChat) -> Result<()>;

    /// Fetch a chat document
    async fn get_chat(&self, owner_id: &str, chat_id: &str) -> Result<Option<CloudChat>>;

    /// List every chat document for an owner (soft-deleted included)
    async fn list_chats(&self, owner_id: &str) -> Result<Vec<CloudChat>>;

    /// Set or clear a chat document's soft-delete marker.
    ///
    /// Returns false if the document does not exist.
    async fn set_chat_deleted(
        &self,
        owner_id: &str,
        chat_id: &str,
        deleted_at: Option<i64>,
    ) -> Result<bool>;

    /// Hard-delete a chat document, its message sub-collection, and any
    /// chunk blobs. Deleting a missing chat is not an error.
    async fn delete_chat(&self, owner_id: &str, chat_id: &str) -> Result<()>;

    /// Hard-delete several chats by id
    async fn delete_chats(&self, owner_id: &str, chat_ids: &[String]) -> Result<()> {
        for chat_id in chat_ids {
            self.delete_chat(owner_id, chat_id).await?;
        }
        Ok(())
    }

    /// Create or replace a message document
    async fn put_message(&self, owner_id: &str, chat_id: &str, message: &CloudMessage)
        -> Result<()>;

    /// List one page of a chat's messages.
    ///
    /// Pass the previous page's `next_cursor` to continue; callers loop
    /// until `next_cursor` is None or the page comes back empty.
    async fn list_messages(
        &self,
        owner_id: &str,
        chat_id: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<MessagePage>;

    /// Store the chunk blob for a long message body
    async fn put_chunk(
        &self,
        owner_id: &str,
        chat_id: &str,
        message_id: &str,
        blob: &ChunkBlob,
    ) -> Result<()>;

    /// Fetch the chunk blob for a message, if one exists
    async fn get_chunk(
        &self,
        owner_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<Option<ChunkBlob>>;
}
