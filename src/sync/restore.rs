//! # Restore Orchestrator
//!
//! Pulls cloud chats back into the Local Store.
//!
//! ## Per-Chat Algorithm
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RESTORE (one chat id)                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. fetch cloud chat ──────────── absent ──► SKIPPED (not in cloud)     │
//! │  2. read local chat with same id                                        │
//! │  3. local exists, no force, local.updated_at >= cloud.updated_at        │
//! │        └──► SKIPPED (local is newer)   [LWW; ties favor local]          │
//! │  4. upsert local chat from cloud, revive trash/archive markers,         │
//! │     bump updated_at to the restore wall clock                           │
//! │  5. page through cloud messages (cursor loop), reassemble chunked       │
//! │     bodies, upsert locally                                              │
//! │  6. optionally clear the cloud soft-delete marker                       │
//! │  7. RESTORED (message count)                                            │
//! │                                                                         │
//! │  Any failure in 1-6 becomes that chat's ERROR entry; sibling chat       │
//! │  ids keep processing.                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `updated_at` bump in step 4 intentionally diverges from strict LWW:
//! the comparison in step 3 uses the original cloud stamp, but the written
//! copy is stamped with the restore time so it surfaces at the top of
//! recency-ordered views.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::model::CloudChat;
use crate::store::LocalStore;
use crate::sync::engine::CloudMirrorEngine;

/// Default page size for the message pull loop
pub const DEFAULT_RESTORE_PAGE_SIZE: usize = 100;

/// Switches for a restore batch
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Also restore messages that are soft-deleted in the cloud.
    ///
    /// Unlike chats, these rows are NOT revived: they land locally with
    /// their cloud delete marker intact, so content the user deleted
    /// never comes back as a visible message. Leave false to skip them
    /// entirely.
    pub include_deleted_messages: bool,
    /// Write the cloud copy even when the local copy is newer
    pub force_overwrite: bool,
    /// Clear the cloud soft-delete marker on chats restored from a
    /// deleted cloud state
    pub revive_in_cloud: bool,
}

/// Outcome for a single requested chat id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    /// Chat written locally, with the number of messages restored
    Restored {
        /// Messages upserted into the Local Store
        messages: usize,
    },
    /// Nothing written, with a human-readable reason
    Skipped {
        /// Why the chat was skipped
        reason: String,
    },
    /// The chat failed mid-restore; siblings were unaffected
    Errored {
        /// The failure message
        reason: String,
    },
}

/// Per-chat report within a restore batch
#[derive(Debug, Clone)]
pub struct ChatRestoreReport {
    /// The requested chat id
    pub chat_id: String,
    /// What happened to it
    pub status: RestoreStatus,
}

/// Summary of a restore batch
#[derive(Debug, Clone, Default)]
pub struct RestoreResult {
    /// One report per requested chat id, in request order
    pub reports: Vec<ChatRestoreReport>,
}

impl RestoreResult {
    /// Number of chats restored
    pub fn restored(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, RestoreStatus::Restored { .. }))
            .count()
    }

    /// Number of chats skipped
    pub fn skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, RestoreStatus::Skipped { .. }))
            .count()
    }

    /// Number of chats that errored
    pub fn errored(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, RestoreStatus::Errored { .. }))
            .count()
    }

    /// Total messages restored across the batch
    pub fn messages_restored(&self) -> usize {
        self.reports
            .iter()
            .map(|r| match r.status {
                RestoreStatus::Restored { messages } => messages,
                _ => 0,
            })
            .sum()
    }

    /// One-line summary for user-facing surfaces
    pub fn summary(&self) -> String {
        format!(
            "{} restored ({} messages), {} skipped, {} errored",
            self.restored(),
            self.messages_restored(),
            self.skipped(),
            self.errored()
        )
    }
}

/// Pulls cloud chats into the Local Store with conflict resolution
pub struct RestoreOrchestrator {
    local: Arc<dyn LocalStore>,
    engine: Arc<CloudMirrorEngine>,
    page_size: usize,
    cancelled: Arc<AtomicBool>,
}

impl RestoreOrchestrator {
    /// Create an orchestrator over the local store and mirror engine
    pub fn new(local: Arc<dyn LocalStore>, engine: Arc<CloudMirrorEngine>) -> Self {
        Self {
            local,
            engine,
            page_size: DEFAULT_RESTORE_PAGE_SIZE,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the message page size (tests exercise odd boundaries)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Flag that stops the batch before the next chat id.
    ///
    /// Cancellation never aborts a chat already in progress; that would
    /// leave it half-restored.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Restore the given cloud chat ids into the Local Store.
    ///
    /// Fails fast with [`Unauthenticated`](crate::Error::Unauthenticated)
    /// when no user is signed in; every other failure is captured in the
    /// failing chat's report and does not abort its siblings.
    pub async fn restore_chats(
        &self,
        owner_id: &str,
        chat_ids: &[String],
        options: RestoreOptions,
    ) -> Result<RestoreResult> {
        self.engine.ensure_readable()?;

        let mut result = RestoreResult::default();
        for chat_id in chat_ids {
            if self.cancelled.load(Ordering::Relaxed) {
                result.reports.push(ChatRestoreReport {
                    chat_id: chat_id.clone(),
                    status: RestoreStatus::Skipped {
                        reason: "cancelled before start".into(),
                    },
                });
                continue;
            }

            let status = match self.restore_one(owner_id, chat_id, options).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("Restore of chat {} failed: {}", chat_id, e);
                    RestoreStatus::Errored {
                        reason: e.to_string(),
                    }
                }
            };
            result.reports.push(ChatRestoreReport {
                chat_id: chat_id.clone(),
                status,
            });
        }

        tracing::info!("Restore batch finished: {}", result.summary());
        Ok(result)
    }

    async fn restore_one(
        &self,
        owner_id: &str,
        chat_id: &str,
        options: RestoreOptions,
    ) -> Result<RestoreStatus> {
        // 1. The cloud copy is the source for this operation.
        let Some(cloud_chat) = self.engine.fetch_chat(owner_id, chat_id).await? else {
            return Ok(RestoreStatus::Skipped {
                reason: "not found in cloud".into(),
            });
        };

        // 2-3. Last-write-wins against any existing local copy; a tie
        // keeps the local one.
        if !options.force_overwrite {
            if let Some(local_chat) = self.local.get_chat(chat_id)? {
                if local_chat.updated_at >= cloud_chat.updated_at {
                    return Ok(RestoreStatus::Skipped {
                        reason: format!(
                            "local copy is newer ({} >= {})",
                            local_chat.updated_at, cloud_chat.updated_at
                        ),
                    });
                }
            }
        }

        // 4. Write the chat revived, stamped with the restore wall clock
        // so it surfaces in recency views.
        let mut chat = cloud_chat.to_local();
        chat.revive_locally();
        chat.touch();
        self.local.upsert_chat(&chat)?;

        // 5. Pull every message page and rebuild full bodies.
        let restored = self.restore_messages(owner_id, &cloud_chat, options).await?;

        // 6. Optionally bring the cloud copy back too.
        if options.revive_in_cloud && cloud_chat.is_deleted() {
            self.engine.revive_chat_in_cloud(owner_id, chat_id).await?;
        }

        tracing::debug!("Restored chat {} with {} messages", chat_id, restored);
        Ok(RestoreStatus::Restored { messages: restored })
    }

    async fn restore_messages(
        &self,
        owner_id: &str,
        cloud_chat: &CloudChat,
        options: RestoreOptions,
    ) -> Result<usize> {
        let mut restored = 0usize;
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .engine
                .fetch_messages(owner_id, &cloud_chat.id, self.page_size, cursor.as_deref())
                .await?;

            if page.messages.is_empty() {
                break;
            }

            for doc in &page.messages {
                if doc.is_deleted() && !options.include_deleted_messages {
                    continue;
                }

                let text = self
                    .engine
                    .load_message_text(owner_id, &cloud_chat.id, &doc.id, &doc.text_head, doc.has_chunks)
                    .await?;

                // Restored messages come back revived; when deleted
                // messages are requested they keep their marker.
                let message = doc.to_local(text, options.include_deleted_messages);
                self.local.upsert_message(&message)?;
                restored += 1;
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(restored)
    }
}

// ============================================================================
// TESTS
// ============================================================================
