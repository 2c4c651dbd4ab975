//! # Cloud Mirror Engine
//!
//! Stateless operation set over the Mirror Store: pushes local records as
//! cloud projections, reads them back, and manages the cloud-side
//! soft-delete lifecycle. Owns the chunking policy for long bodies.
//!
//! ## Failure Semantics
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ENGINE ERROR POLICY                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Mutating ops (upsert, soft/hard/batch delete, revive)                  │
//! │  ──────────────────────────────────────────────────────                 │
//! │  Mirror failures are logged and swallowed. The local write already      │
//! │  succeeded and is the source of truth; the user must not see a          │
//! │  spurious failure for a background mirror step. A later full upload     │
//! │  heals any divergence (every write is an upsert by stable id).          │
//! │                                                                         │
//! │  Read ops (fetch_chat, fetch_messages, fetch_cloud_chats, load text)    │
//! │  ───────────────────────────────────────────────────────────────        │
//! │  Errors propagate. Their callers (Restore) must know a pull failed.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation re-reads the sync-enabled predicate (signed-in AND
//! toggle on) at the moment it runs; nothing is cached.

use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use crate::mirror::{MessagePage, MirrorStore};
use crate::model::{Chat, CloudChat, CloudChatSummary, CloudMessage, Message};
use crate::settings::SettingsStore;
use crate::sync::chunking;
use crate::time::now_millis;

/// Stateless mirror operation set
pub struct CloudMirrorEngine {
    mirror: Arc<dyn MirrorStore>,
    auth: Arc<dyn AuthProvider>,
    settings: Arc<dyn SettingsStore>,
}

impl CloudMirrorEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        mirror: Arc<dyn MirrorStore>,
        auth: Arc<dyn AuthProvider>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            mirror,
            auth,
            settings,
        }
    }

    /// The sync-enabled predicate: a signed-in user AND the sync toggle.
    ///
    /// Read fresh on every operation so a mid-batch sign-out or toggle
    /// flip takes effect on the next record processed.
    pub fn sync_enabled(&self) -> bool {
        self.auth.current_user_id().is_some() && self.settings.cloud_sync_enabled()
    }

    /// Gate for read operations: restore and listing need an identity and
    /// an enabled mirror to pull from.
    ///
    /// Exposed so batch callers can fail fast before touching any record.
    pub fn ensure_readable(&self) -> Result<()> {
        if self.auth.current_user_id().is_none() {
            return Err(Error::Unauthenticated);
        }
        if !self.settings.cloud_sync_enabled() {
            return Err(Error::InvalidState("cloud sync is disabled".into()));
        }
        Ok(())
    }

    /// Log and drop a mirror failure on the mutating path
    fn swallow(op: &str, id: &str, result: Result<()>) {
        if let Err(e) = result {
            tracing::warn!("Mirror {} for {} failed (ignored): {}", op, id, e);
        }
    }

    // ========================================================================
    // PUSH (mutating; failures swallowed)
    // ========================================================================

    /// Idempotent create-or-replace of a chat document
    pub async fn upsert_chat(&self, owner_id: &str, chat: &Chat) -> Result<()> {
        if !self.sync_enabled() {
            return Ok(());
        }
        // Router-level routing should never let an incognito chat get
        // here; refuse anyway so the isolation invariant holds even for a
        // buggy caller.
        if chat.is_incognito {
            tracing::warn!("Refusing to mirror incognito chat {}", chat.id);
            return Ok(());
        }

        Self::swallow(
            "chat upsert",
            &chat.id,
            self.mirror.put_chat(owner_id, &chat.to_cloud()).await,
        );
        Ok(())
    }

    /// Idempotent create-or-replace of a message document.
    ///
    /// Long bodies are split first: a bounded `text_head` goes in the
    /// document and the remainder is stored as a chunk blob keyed by
    /// `(chat_id, message_id)`. The blob is written before the document
    /// so a reader never sees `has_chunks` pointing at nothing.
    pub async fn upsert_message(
        &self,
        owner_id: &str,
        chat_id: &str,
        message: &Message,
    ) -> Result<()> {
        if !self.sync_enabled() {
            return Ok(());
        }
        if message.local_only {
            tracing::warn!("Refusing to mirror local-only message {}", message.id);
            return Ok(());
        }

        let split = chunking::split_text(&message.text);

        if let Some(blob) = &split.blob {
            if let Err(e) = self
                .mirror
                .put_chunk(owner_id, chat_id, &message.id, blob)
                .await
            {
                // Without the blob the document must not claim chunks;
                // skip the whole write and let the next push retry.
                tracing::warn!(
                    "Mirror chunk upload for message {} failed (ignored): {}",
                    message.id,
                    e
                );
                return Ok(());
            }
        }

        let doc = CloudMessage {
            id: message.id.clone(),
            chat_id: chat_id.to_string(),
            owner_id: owner_id.to_string(),
            role: message.role,
            text_head: split.head,
            has_chunks: split.blob.is_some(),
            created_at: message.created_at,
            updated_at: message.updated_at,
            deleted_at: message.deleted_at,
        };

        Self::swallow(
            "message upsert",
            &message.id,
            self.mirror.put_message(owner_id, chat_id, &doc).await,
        );
        Ok(())
    }

    /// Soft-delete a chat in the cloud projection only
    pub async fn soft_delete_chat_in_cloud(&self, owner_id: &str, chat_id: &str) -> Result<()> {
        if !self.sync_enabled() {
            return Ok(());
        }
        Self::swallow(
            "soft delete",
            chat_id,
            self.mirror
                .set_chat_deleted(owner_id, chat_id, Some(now_millis()))
                .await
                .map(|_| ()),
        );
        Ok(())
    }

    /// Clear a chat's cloud soft-delete marker
    pub async fn revive_chat_in_cloud(&self, owner_id: &str, chat_id: &str) -> Result<()> {
        if !self.sync_enabled() {
            return Ok(());
        }
        Self::swallow(
            "revive",
            chat_id,
            self.mirror
                .set_chat_deleted(owner_id, chat_id, None)
                .await
                .map(|_| ()),
        );
        Ok(())
    }

    /// Hard-delete a chat document, its messages, and its chunk blobs
    pub async fn permanently_delete_chat(&self, owner_id: &str, chat_id: &str) -> Result<()> {
        if !self.sync_enabled() {
            return Ok(());
        }
        Self::swallow(
            "permanent delete",
            chat_id,
            self.mirror.delete_chat(owner_id, chat_id).await,
        );
        Ok(())
    }

    /// Hard-delete several chats (empty-trash with cloud delete)
    pub async fn batch_delete_chats(&self, owner_id: &str, chat_ids: &[String]) -> Result<()> {
        if !self.sync_enabled() {
            return Ok(());
        }
        Self::swallow(
            "batch delete",
            &format!("{} chats", chat_ids.len()),
            self.mirror.delete_chats(owner_id, chat_ids).await,
        );
        Ok(())
    }

    // ========================================================================
    // PULL (read; failures propagate)
    // ========================================================================

    /// Fetch a single cloud chat document
    pub async fn fetch_chat(&self, owner_id: &str, chat_id: &str) -> Result<Option<CloudChat>> {
        self.ensure_readable()?;
        self.mirror.get_chat(owner_id, chat_id).await
    }

    /// Ids of every cloud chat for an owner (soft-deleted included)
    pub async fn fetch_chat_ids(&self, owner_id: &str) -> Result<Vec<String>> {
        self.ensure_readable()?;
        let chats = self.mirror.list_chats(owner_id).await?;
        Ok(chats.into_iter().map(|c| c.id).collect())
    }

    /// Listing summaries for restore-picker UIs, newest first
    pub async fn fetch_cloud_chats(
        &self,
        owner_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<CloudChatSummary>> {
        self.ensure_readable()?;
        let mut summaries: Vec<CloudChatSummary> = self
            .mirror
            .list_chats(owner_id)
            .await?
            .iter()
            .filter(|c| include_deleted || !c.is_deleted())
            .map(|c| c.summary())
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// One page of a chat's cloud messages.
    ///
    /// Callers loop, feeding each page's `next_cursor` back in, until the
    /// cursor comes back None or a page comes back empty.
    pub async fn fetch_messages(
        &self,
        owner_id: &str,
        chat_id: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<MessagePage> {
        self.ensure_readable()?;
        self.mirror
            .list_messages(owner_id, chat_id, limit, cursor)
            .await
    }

    /// Recover a message's full text from its stored head.
    ///
    /// When `has_chunks` is false the head already is the full text;
    /// otherwise the chunk blob is fetched, concatenated, and verified.
    pub async fn load_message_text(
        &self,
        owner_id: &str,
        chat_id: &str,
        message_id: &str,
        head: &str,
        has_chunks: bool,
    ) -> Result<String> {
        self.ensure_readable()?;

        if !has_chunks {
            return Ok(head.to_string());
        }

        let blob = self
            .mirror
            .get_chunk(owner_id, chat_id, message_id)
            .await?
            .ok_or_else(|| {
                Error::Corrupted(format!(
                    "Message {} claims chunks but the blob is missing",
                    message_id
                ))
            })?;

        chunking::reassemble(head, &blob)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuth;
    use crate::mirror::{ChunkBlob, MemoryMirror};
    use crate::model::{ChatRole, CloudChat};
    use crate::settings::MemorySettings;
    use crate::sync::chunking::TEXT_HEAD_MAX_BYTES;
    use async_trait::async_trait;

    fn engine_parts() -> (Arc<MemoryMirror>, Arc<StaticAuth>, Arc<MemorySettings>) {
        (
            Arc::new(MemoryMirror::new()),
            Arc::new(StaticAuth::signed_in("user-1")),
            Arc::new(MemorySettings::sync_on()),
        )
    }

    fn engine(
        mirror: Arc<MemoryMirror>,
        auth: Arc<StaticAuth>,
        settings: Arc<MemorySettings>,
    ) -> CloudMirrorEngine {
        CloudMirrorEngine::new(mirror, auth, settings)
    }

    /// Mirror whose every call fails with a transport error
    struct BrokenMirror;

    #[async_trait]
    impl MirrorStore for BrokenMirror {
        async fn put_chat(&self, _: &str, _: &CloudChat) -> Result<()> {
            Err(Error::Transport("down".into()))
        }
        async fn get_chat(&self, _: &str, _: &str) -> Result<Option<CloudChat>> {
            Err(Error::Transport("down".into()))
        }
        async fn list_chats(&self, _: &str) -> Result<Vec<CloudChat>> {
            Err(Error::Transport("down".into()))
        }
        async fn set_chat_deleted(&self, _: &str, _: &str, _: Option<i64>) -> Result<bool> {
            Err(Error::Transport("down".into()))
        }
        async fn delete_chat(&self, _: &str, _: &str) -> Result<()> {
            Err(Error::Transport("down".into()))
        }
        async fn put_message(&self, _: &str, _: &str, _: &CloudMessage) -> Result<()> {
            Err(Error::Transport("down".into()))
        }
        async fn list_messages(
            &self,
            _: &str,
            _: &str,
            _: usize,
            _: Option<&str>,
        ) -> Result<MessagePage> {
            Err(Error::Transport("down".into()))
        }
        async fn put_chunk(&self, _: &str, _: &str, _: &str, _: &ChunkBlob) -> Result<()> {
            Err(Error::Transport("down".into()))
        }
        async fn get_chunk(&self, _: &str, _: &str, _: &str) -> Result<Option<ChunkBlob>> {
            Err(Error::Transport("down".into()))
        }
    }

    #[tokio::test]
    async fn test_upsert_chat_round_trip() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Plans", false);
        engine.upsert_chat("user-1", &chat).await.unwrap();

        let got = engine.fetch_chat("user-1", &chat.id).await.unwrap().unwrap();
        assert_eq!(got.title, "Plans");
        assert_eq!(got.updated_at, chat.updated_at);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Plans", false);
        let msg = Message::new(&chat.id, "user-1", ChatRole::User, "hi", false);

        for _ in 0..2 {
            engine.upsert_chat("user-1", &chat).await.unwrap();
            engine.upsert_message("user-1", &chat.id, &msg).await.unwrap();
        }

        assert_eq!(mirror.chat_count("user-1"), 1);
        assert_eq!(mirror.message_count("user-1", &chat.id), 1);
    }

    #[tokio::test]
    async fn test_disabled_sync_is_noop() {
        let (mirror, auth, settings) = engine_parts();
        settings.set_cloud_sync_enabled(false);
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Plans", false);
        engine.upsert_chat("user-1", &chat).await.unwrap();
        assert_eq!(mirror.chat_count("user-1"), 0);
    }

    #[tokio::test]
    async fn test_signed_out_is_noop() {
        let (mirror, auth, settings) = engine_parts();
        auth.sign_out();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Plans", false);
        engine.upsert_chat("user-1", &chat).await.unwrap();
        assert_eq!(mirror.chat_count("user-1"), 0);
    }

    #[tokio::test]
    async fn test_guest_owned_data_never_syncs() {
        use crate::model::GUEST_OWNER_ID;

        // Guest sessions count as signed out; nothing reaches the mirror.
        let (mirror, auth, settings) = engine_parts();
        auth.sign_out();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new(GUEST_OWNER_ID, "Guest chat", false);
        engine.upsert_chat(GUEST_OWNER_ID, &chat).await.unwrap();

        assert_eq!(mirror.chat_count(GUEST_OWNER_ID), 0);
    }

    #[tokio::test]
    async fn test_incognito_chat_never_mirrored() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Secret", true);
        let msg = Message::new(&chat.id, "user-1", ChatRole::User, "psst", true);

        engine.upsert_chat("user-1", &chat).await.unwrap();
        engine.upsert_message("user-1", &chat.id, &msg).await.unwrap();

        assert_eq!(mirror.chat_count("user-1"), 0);
        assert_eq!(mirror.message_count("user-1", &chat.id), 0);
    }

    #[tokio::test]
    async fn test_long_body_chunked_and_recovered() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Long", false);
        let text = "lorem ipsum ".repeat(2000); // well past the head limit
        let msg = Message::new(&chat.id, "user-1", ChatRole::Model, text.clone(), false);

        engine.upsert_chat("user-1", &chat).await.unwrap();
        engine.upsert_message("user-1", &chat.id, &msg).await.unwrap();

        let page = engine
            .fetch_messages("user-1", &chat.id, 10, None)
            .await
            .unwrap();
        let doc = &page.messages[0];
        assert!(doc.has_chunks);
        assert!(doc.text_head.len() <= TEXT_HEAD_MAX_BYTES);

        let full = engine
            .load_message_text("user-1", &chat.id, &doc.id, &doc.text_head, doc.has_chunks)
            .await
            .unwrap();
        assert_eq!(full, text);
    }

    #[tokio::test]
    async fn test_short_body_stored_whole() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror.clone(), auth, settings);

        let chat = Chat::new("user-1", "Short", false);
        let msg = Message::new(&chat.id, "user-1", ChatRole::User, "hello", false);

        engine.upsert_chat("user-1", &chat).await.unwrap();
        engine.upsert_message("user-1", &chat.id, &msg).await.unwrap();

        let page = engine
            .fetch_messages("user-1", &chat.id, 10, None)
            .await
            .unwrap();
        let doc = &page.messages[0];
        assert!(!doc.has_chunks);
        assert_eq!(doc.text_head, "hello");

        let full = engine
            .load_message_text("user-1", &chat.id, &doc.id, &doc.text_head, doc.has_chunks)
            .await
            .unwrap();
        assert_eq!(full, "hello");
    }

    #[tokio::test]
    async fn test_mutating_failures_are_swallowed() {
        let auth = Arc::new(StaticAuth::signed_in("user-1"));
        let settings = Arc::new(MemorySettings::sync_on());
        let engine = CloudMirrorEngine::new(Arc::new(BrokenMirror), auth, settings);

        let chat = Chat::new("user-1", "Plans", false);
        let msg = Message::new(&chat.id, "user-1", ChatRole::User, "hi", false);

        // None of these may surface the transport failure.
        engine.upsert_chat("user-1", &chat).await.unwrap();
        engine.upsert_message("user-1", &chat.id, &msg).await.unwrap();
        engine.soft_delete_chat_in_cloud("user-1", &chat.id).await.unwrap();
        engine.revive_chat_in_cloud("user-1", &chat.id).await.unwrap();
        engine.permanently_delete_chat("user-1", &chat.id).await.unwrap();
        engine
            .batch_delete_chats("user-1", &[chat.id.clone()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_read_failures_propagate() {
        let auth = Arc::new(StaticAuth::signed_in("user-1"));
        let settings = Arc::new(MemorySettings::sync_on());
        let engine = CloudMirrorEngine::new(Arc::new(BrokenMirror), auth, settings);

        assert!(engine.fetch_chat("user-1", "c1").await.unwrap_err().is_transport());
        assert!(engine.fetch_chat_ids("user-1").await.unwrap_err().is_transport());
        assert!(engine
            .fetch_messages("user-1", "c1", 10, None)
            .await
            .unwrap_err()
            .is_transport());
    }

    #[tokio::test]
    async fn test_reads_require_identity() {
        let (mirror, auth, settings) = engine_parts();
        auth.sign_out();
        let engine = engine(mirror, auth, settings);

        let err = engine.fetch_chat("user-1", "c1").await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));

        // The inline-body fast path is gated the same way as every
        // other read, even though it never touches the mirror.
        let err = engine
            .load_message_text("user-1", "c1", "m1", "head", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[tokio::test]
    async fn test_soft_delete_and_listing_filter() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror.clone(), auth, settings);

        let kept = Chat::new("user-1", "Kept", false);
        let deleted = Chat::new("user-1", "Deleted", false);
        engine.upsert_chat("user-1", &kept).await.unwrap();
        engine.upsert_chat("user-1", &deleted).await.unwrap();
        engine
            .soft_delete_chat_in_cloud("user-1", &deleted.id)
            .await
            .unwrap();

        let visible = engine.fetch_cloud_chats("user-1", false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, kept.id);

        let all = engine.fetch_cloud_chats("user-1", true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all
            .iter()
            .any(|s| s.id == deleted.id && s.cloud_deleted_at.is_some()));
    }

    #[tokio::test]
    async fn test_missing_chunk_blob_is_corruption() {
        let (mirror, auth, settings) = engine_parts();
        let engine = engine(mirror, auth, settings);

        let err = engine
            .load_message_text("user-1", "c1", "m1", "head", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Corrupted(_)));
    }
}
