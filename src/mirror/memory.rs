//! # In-Memory Mirror
//!
//! A complete [`MirrorStore`] backend held in process memory.
//!
//! Used as the test double for the sync core and as a development backend
//! when no remote store is configured. Message listings are kept in a
//! `BTreeMap` keyed by `(created_at, id)` so cursor pagination is ordered
//! and stable under concurrent inserts, the same contract a real remote
//! store must provide.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;

use super::{ChunkBlob, MessagePage, MirrorStore};
use crate::error::{Error, Result};
use crate::model::{CloudChat, CloudMessage};

/// Sort key for the message sub-collection
type MessageKey = (i64, String);

#[derive(Default)]
struct State {
    /// owner -> chat_id -> document
    chats: HashMap<String, BTreeMap<String, CloudChat>>,
    /// (owner, chat_id) -> ordered message documents
    messages: HashMap<(String, String), BTreeMap<MessageKey, CloudMessage>>,
    /// (owner, chat_id, message_id) -> chunk blob
    chunks: HashMap<(String, String, String), ChunkBlob>,
    /// Chat ids whose fetch is forced to fail (test hook)
    failing_chat_fetches: HashSet<String>,
}

/// In-memory Mirror Store
#[derive(Default)]
pub struct MemoryMirror {
    state: RwLock<State>,
}

impl MemoryMirror {
    /// Create an empty mirror
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `get_chat` for this chat id to fail with a transport error.
    ///
    /// Test hook for exercising partial-batch failure handling.
    pub fn fail_chat_fetch(&self, chat_id: &str) {
        self.state
            .write()
            .failing_chat_fetches
            .insert(chat_id.to_string());
    }

    /// Total number of chat documents stored for an owner
    pub fn chat_count(&self, owner_id: &str) -> usize {
        self.state
            .read()
            .chats
            .get(owner_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Total number of message documents stored for a chat
    pub fn message_count(&self, owner_id: &str, chat_id: &str) -> usize {
        self.state
            .read()
            .messages
            .get(&(owner_id.to_string(), chat_id.to_string()))
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

fn encode_cursor(key: &MessageKey) -> String {
    format!("{}:{}", key.0, key.1)
}

fn decode_cursor(cursor: &str) -> Result<MessageKey> {
    let (ts, id) = cursor
        .split_once(':')
        .ok_or_else(|| Error::Transport(format!("invalid pagination cursor '{}'", cursor)))?;
    let ts: i64 = ts
        .parse()
        .map_err(|_| Error::Transport(format!("invalid pagination cursor '{}'", cursor)))?;
    Ok((ts, id.to_string()))
}

#[async_trait]
impl MirrorStore for MemoryMirror {
    async fn put_chat(&self, owner_id: &str, chat: &CloudChat) -> Result<()> {
        let mut state = self.state.write();
        state
            .chats
            .entry(owner_id.to_string())
            .or_default()
            .insert(chat.id.clone(), chat.clone());
        Ok(())
    }

    async fn get_chat(&self, owner_id: &str, chat_id: &str) -> Result<Option<CloudChat>> {
        let state = self.state.read();
        if state.failing_chat_fetches.contains(chat_id) {
            return Err(Error::Transport(format!(
                "injected fetch failure for chat {}",
                chat_id
            )));
        }
        Ok(state
            .chats
            .get(owner_id)
            .and_then(|m| m.get(chat_id))
            .cloned())
    }

    async fn list_chats(&self, owner_id: &str) -> Result<Vec<CloudChat>> {
        let state = self.state.read();
        Ok(state
            .chats
            .get(owner_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_chat_deleted(
        &self,
        owner_id: &str,
        chat_id: &str,
        deleted_at: Option<i64>,
    ) -> Result<bool> {
        let mut state = self.state.write();
        match state.chats.get_mut(owner_id).and_then(|m| m.get_mut(chat_id)) {
            Some(chat) => {
                chat.cloud_deleted_at = deleted_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_chat(&self, owner_id: &str, chat_id: &str) -> Result<()> {
        let mut state = self.state.write();
        if let Some(chats) = state.chats.get_mut(owner_id) {
            chats.remove(chat_id);
        }
        state
            .messages
            .remove(&(owner_id.to_string(), chat_id.to_string()));
        state
            .chunks
            .retain(|(o, c, _), _| !(o == owner_id && c == chat_id));
        Ok(())
    }

    async fn put_message(
        &self,
        owner_id: &str,
        chat_id: &str,
        message: &CloudMessage,
    ) -> Result<()> {
        let mut state = self.state.write();
        let collection = state
            .messages
            .entry((owner_id.to_string(), chat_id.to_string()))
            .or_default();

        // Replace-by-id: drop any entry with the same id before inserting,
        // in case an edit moved its sort key.
        collection.retain(|_, m| m.id != message.id);
        collection.insert((message.created_at, message.id.clone()), message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        owner_id: &str,
        chat_id: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        let after = cursor.map(decode_cursor).transpose()?;

        let state = self.state.read();
        let collection = state
            .messages
            .get(&(owner_id.to_string(), chat_id.to_string()));

        let Some(collection) = collection else {
            return Ok(MessagePage {
                messages: Vec::new(),
                next_cursor: None,
            });
        };

        let mut page: Vec<CloudMessage> = match &after {
            Some(key) => collection
                .range((std::ops::Bound::Excluded(key.clone()), std::ops::Bound::Unbounded))
                .take(limit)
                .map(|(_, m)| m.clone())
                .collect(),
            None => collection.values().take(limit).cloned().collect(),
        };

        let next_cursor = if page.len() == limit {
            page.last()
                .map(|m| encode_cursor(&(m.created_at, m.id.clone())))
        } else {
            None
        };

        page.shrink_to_fit();
        Ok(MessagePage {
            messages: page,
            next_cursor,
        })
    }

    async fn put_chunk(
        &self,
        owner_id: &str,
        chat_id: &str,
        message_id: &str,
        blob: &ChunkBlob,
    ) -> Result<()> {
        self.state.write().chunks.insert(
            (
                owner_id.to_string(),
                chat_id.to_string(),
                message_id.to_string(),
            ),
            blob.clone(),
        );
        Ok(())
    }

    async fn get_chunk(
        &self,
        owner_id: &str,
        chat_id: &str,
        message_id: &str,
    ) -> Result<Option<ChunkBlob>> {
        Ok(self
            .state
            .read()
            .chunks
            .get(&(
                owner_id.to_string(),
                chat_id.to_string(),
                message_id.to_string(),
            ))
            .cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================
