//! # Initial Upload
//!
//! One-shot full push of the Local Store into the mirror, run when a user
//! first enables cloud sync (or to heal divergence later; every write is
//! an upsert, so re-running is safe).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        INITIAL UPLOAD                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  list local chats (all lifecycle states)                                │
//! │       │  drop incognito chats                                           │
//! │       ▼                                                                 │
//! │  for each chat:                      re-check between chats:            │
//! │    push chat projection                - cancel flag                    │
//! │    push every non-local_only message   - sync still enabled             │
//! │    report progress (done, total)       (stop without error)             │
//! │                                                                         │
//! │  on full completion: record last-sync stats                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::settings::{SettingsStore, SyncStats};
use crate::store::{ChatFilter, LocalStore};
use crate::sync::engine::CloudMirrorEngine;
use crate::time::now_millis;

/// Counters for one upload run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Chats pushed
    pub chat_count: usize,
    /// Messages pushed across those chats
    pub message_count: usize,
    /// False when the run was stopped early by cancellation or a
    /// mid-batch sync disable
    pub completed: bool,
}

/// Drives the one-shot full push of local history into the mirror
pub struct InitialUploader {
    local: Arc<dyn LocalStore>,
    engine: Arc<CloudMirrorEngine>,
    settings: Arc<dyn SettingsStore>,
    cancelled: Arc<AtomicBool>,
}

impl InitialUploader {
    /// Create an uploader over the local store, mirror engine, and the
    /// settings used to record last-sync stats
    pub fn new(
        local: Arc<dyn LocalStore>,
        engine: Arc<CloudMirrorEngine>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            local,
            engine,
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run before the next chat; a chat already being
    /// pushed finishes.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Push every non-incognito local chat of `owner_id` to the mirror.
    ///
    /// A no-op returning default stats when sync is not enabled. The
    /// sync-enabled predicate is re-read between chats, so signing out or
    /// flipping the toggle mid-run stops the batch cleanly. `on_progress`
    /// is called after each chat with `(done, total)`.
    ///
    /// Last-sync stats are recorded only for a run that pushed every chat.
    pub async fn perform_initial_upload<F>(
        &self,
        owner_id: &str,
        mut on_progress: F,
    ) -> Result<UploadStats>
    where
        F: FnMut(usize, usize),
    {
        if !self.engine.sync_enabled() {
            tracing::debug!("Initial upload skipped; sync is not enabled");
            return Ok(UploadStats::default());
        }

        // Trashed and archived chats upload too; only incognito is private.
        let chats: Vec<_> = self
            .local
            .list_chats(owner_id, ChatFilter::All)?
            .into_iter()
            .filter(|c| !c.is_incognito)
            .collect();
        let total = chats.len();
        tracing::info!("Initial upload starting: {} chats", total);

        let mut stats = UploadStats {
            completed: true,
            ..Default::default()
        };

        for (index, chat) in chats.iter().enumerate() {
            if self.cancelled.load(Ordering::Relaxed) {
                tracing::info!("Initial upload cancelled after {} chats", index);
                stats.completed = false;
                break;
            }
            if !self.engine.sync_enabled() {
                tracing::info!("Initial upload stopped after {} chats; sync disabled", index);
                stats.completed = false;
                break;
            }

            self.engine.upsert_chat(owner_id, chat).await?;

            for message in self.local.messages_for_chat(&chat.id)? {
                // Rows written while the chat was incognito stay local
                // even after the chat itself became syncable.
                if message.local_only {
                    continue;
                }
                self.engine.upsert_message(owner_id, &chat.id, &message).await?;
                stats.message_count += 1;
            }

            stats.chat_count += 1;
            on_progress(index + 1, total);
        }

        if stats.completed {
            self.settings.set_last_sync_stats(SyncStats {
                chat_count: stats.chat_count,
                message_count: stats.message_count,
                timestamp: now_millis(),
            });
            tracing::info!(
                "Initial upload finished: {} chats, {} messages",
                stats.chat_count,
                stats.message_count
            );
        }

        Ok(stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================
