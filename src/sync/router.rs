//! # Sync Router
//!
//! Decides, per write, whether a locally persisted chat/message also goes
//! to the Cloud Mirror Engine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ROUTING RULE                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  application write ──► Local Store (always, done before route())        │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                        SyncRouter::route                                │
//! │                              │                                          │
//! │             chat.is_incognito?                                          │
//! │              │yes                      │no                              │
//! │              ▼                         ▼                                │
//! │        message stays             upsert_chat + upsert_message           │
//! │        local_only; no            (best effort; mirror failures          │
//! │        cloud call                 are swallowed by the engine)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cloud-to-local direction is never routed here; only the Restore
//! Orchestrator pulls from the mirror.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Chat, Message};
use crate::store::LocalStore;
use crate::sync::engine::CloudMirrorEngine;

/// Routes local writes to the mirror according to the privacy flag
pub struct SyncRouter {
    local: Arc<dyn LocalStore>,
    engine: Arc<CloudMirrorEngine>,
}

impl SyncRouter {
    /// Create a router over the local store and mirror engine
    pub fn new(local: Arc<dyn LocalStore>, engine: Arc<CloudMirrorEngine>) -> Self {
        Self { local, engine }
    }

    /// Route one message append after it was durably written locally.
    ///
    /// Incognito chats terminate here with no cloud call. For everything
    /// else the chat and message projections are pushed best-effort.
    pub async fn route(&self, chat: &Chat, message: &Message) -> Result<()> {
        let expected_local_only = chat.is_incognito;

        // The caller stamps local_only from the chat flag at write time;
        // repair the row if the two ever disagree.
        if message.local_only != expected_local_only {
            let mut fixed = message.clone();
            fixed.local_only = expected_local_only;
            self.local.upsert_message(&fixed)?;
        }

        if chat.is_incognito {
            tracing::debug!("Chat {} is incognito; message {} stays local", chat.id, message.id);
            return Ok(());
        }

        self.engine.upsert_chat(&chat.owner_id, chat).await?;

        let mut outbound = message.clone();
        outbound.local_only = false;
        self.engine
            .upsert_message(&chat.owner_id, &chat.id, &outbound)
            .await?;

        Ok(())
    }

    /// One-way transition of an incognito chat into the cloud.
    ///
    /// Flips the chat flag and every message's `local_only`, then pushes
    /// the chat and all of its messages in creation order. This is the
    /// only synchronous bulk push outside the Initial Upload driver.
    ///
    /// Fails with [`Error::NotFound`] for an unknown id and
    /// [`Error::InvalidState`] if the chat is not incognito — both
    /// indicate caller error, not transient failure.
    pub async fn move_chat_to_cloud(&self, chat_id: &str) -> Result<()> {
        let mut chat = self
            .local
            .get_chat(chat_id)?
            .ok_or_else(|| Error::NotFound(format!("chat {}", chat_id)))?;

        if !chat.is_incognito {
            return Err(Error::InvalidState(format!(
                "chat {} is not incognito",
                chat_id
            )));
        }

        chat.is_incognito = false;
        chat.touch();
        self.local.upsert_chat(&chat)?;

        let flipped = self.local.clear_local_only(chat_id)?;
        tracing::info!(
            "Moving chat {} to cloud ({} messages flipped to syncable)",
            chat_id,
            flipped
        );

        self.engine.upsert_chat(&chat.owner_id, &chat).await?;
        for message in self.local.messages_for_chat(chat_id)? {
            self.engine
                .upsert_message(&chat.owner_id, chat_id, &message)
                .await?;
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuth;
    use crate::mirror::MemoryMirror;
    use crate::model::ChatRole;
    use crate::settings::MemorySettings;
    use crate::store::SqliteStore;

    struct Fixture {
        local: Arc<SqliteStore>,
        mirror: Arc<MemoryMirror>,
        router: SyncRouter,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(SqliteStore::open(None).unwrap());
        let mirror = Arc::new(MemoryMirror::new());
        let engine = Arc::new(CloudMirrorEngine::new(
            mirror.clone(),
            Arc::new(StaticAuth::signed_in("user-1")),
            Arc::new(MemorySettings::sync_on()),
        ));
        let router = SyncRouter::new(local.clone(), engine);
        Fixture {
            local,
            mirror,
            router,
        }
    }

    fn write_message(local: &SqliteStore, chat: &Chat, text: &str) -> Message {
        let msg = Message::new(&chat.id, &chat.owner_id, ChatRole::User, text, chat.is_incognito);
        local.upsert_message(&msg).unwrap();
        msg
    }

    #[tokio::test]
    async fn test_incognito_writes_never_reach_mirror() {
        let f = fixture();
        let chat = Chat::new("user-1", "Secret", true);
        f.local.upsert_chat(&chat).unwrap();

        for i in 0..5 {
            let msg = write_message(&f.local, &chat, &format!("m{}", i));
            f.router.route(&chat, &msg).await.unwrap();
        }

        assert_eq!(f.mirror.chat_count("user-1"), 0);
        assert_eq!(f.mirror.message_count("user-1", &chat.id), 0);
    }

    #[tokio::test]
    async fn test_regular_write_is_mirrored() {
        let f = fixture();
        let chat = Chat::new("user-1", "Plans", false);
        f.local.upsert_chat(&chat).unwrap();

        let msg = write_message(&f.local, &chat, "hello");
        f.router.route(&chat, &msg).await.unwrap();

        assert_eq!(f.mirror.chat_count("user-1"), 1);
        assert_eq!(f.mirror.message_count("user-1", &chat.id), 1);
    }

    #[tokio::test]
    async fn test_route_repairs_mismatched_flag() {
        let f = fixture();
        let chat = Chat::new("user-1", "Plans", false);
        f.local.upsert_chat(&chat).unwrap();

        // Caller wrote the row with a stale local_only snapshot
        let mut msg = Message::new(&chat.id, "user-1", ChatRole::User, "hi", true);
        f.local.upsert_message(&msg).unwrap();
        msg.local_only = true;

        f.router.route(&chat, &msg).await.unwrap();

        let stored = f.local.get_message(&msg.id).unwrap().unwrap();
        assert!(!stored.local_only);
        assert_eq!(f.mirror.message_count("user-1", &chat.id), 1);
    }

    #[tokio::test]
    async fn test_move_chat_to_cloud_unknown_id() {
        let f = fixture();
        let err = f.router.move_chat_to_cloud("missing-id").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_move_chat_to_cloud_requires_incognito() {
        let f = fixture();
        let chat = Chat::new("user-1", "Plans", false);
        f.local.upsert_chat(&chat).unwrap();

        let err = f.router.move_chat_to_cloud(&chat.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_move_chat_to_cloud_bulk_push() {
        let f = fixture();
        let chat = Chat::new("user-1", "Secret", true);
        f.local.upsert_chat(&chat).unwrap();
        for i in 0..3 {
            write_message(&f.local, &chat, &format!("m{}", i));
        }
        let before = f.local.get_chat(&chat.id).unwrap().unwrap().updated_at;

        f.router.move_chat_to_cloud(&chat.id).await.unwrap();

        let after = f.local.get_chat(&chat.id).unwrap().unwrap();
        assert!(!after.is_incognito);
        assert!(after.updated_at > before);
        assert!(f
            .local
            .messages_for_chat(&chat.id)
            .unwrap()
            .iter()
            .all(|m| !m.local_only));

        assert_eq!(f.mirror.chat_count("user-1"), 1);
        assert_eq!(f.mirror.message_count("user-1", &chat.id), 3);

        // One-way: a second call is a caller error
        let err = f.router.move_chat_to_cloud(&chat.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
