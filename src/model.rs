//! # Data Model
//!
//! Local chat/message records and their cloud projections.
//!
//! ## Record Relationships
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DATA MODEL                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Local Store (authoritative)          Mirror Store (projection)        │
//! │  ────────────────────────────          ──────────────────────────       │
//! │                                                                         │
//! │  ┌─────────────┐                       ┌─────────────┐                  │
//! │  │    Chat     │ ───── upsert ───────► │  CloudChat  │                  │
//! │  │ is_incognito│      (never if        │cloud_deleted│                  │
//! │  │ archived_at │       incognito)      │     _at     │                  │
//! │  │ deleted_    │                       └──────┬──────┘                  │
//! │  │ locally_at  │                              │ owns paginated          │
//! │  └──────┬──────┘                              ▼ sub-collection          │
//! │         │ owns                         ┌─────────────┐                  │
//! │         ▼                              │CloudMessage │                  │
//! │  ┌─────────────┐                       │ text_head   │                  │
//! │  │   Message   │ ───── upsert ───────► │ has_chunks  │──► chunk blob    │
//! │  │ local_only  │                       │ deleted_at  │    (chat_id,     │
//! │  │ deleted_at  │                       └─────────────┘     message_id)  │
//! │  └─────────────┘                                                        │
//! │                                                                         │
//! │  Local deletion (trash) and cloud soft-deletion are separate state     │
//! │  machines, reconciled only on explicit engine calls.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::now_millis;

/// Reserved owner id for the signed-out (guest) user.
///
/// Guest-owned data never syncs: the "sync enabled" predicate requires a
/// signed-in identity, and the guest id is never one.
pub const GUEST_OWNER_ID: &str = "guest";

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat as stored on-device (the authoritative copy)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Stable identifier, immutable after creation (UUID)
    pub id: String,
    /// Owner scope: a signed-in user id or [`GUEST_OWNER_ID`]
    pub owner_id: String,
    /// Display title
    pub title: String,
    /// Creation time (Unix ms)
    pub created_at: i64,
    /// Last modification time (Unix ms); only moves forward and is the
    /// sole input to conflict resolution during restore
    pub updated_at: i64,
    /// Once true the chat and its messages are local-only. Clearing the
    /// flag ("move to cloud") is a one-way transition.
    pub is_incognito: bool,
    /// When the chat was archived, if it is
    pub archived_at: Option<i64>,
    /// When the chat was moved to the local trash, if it is
    pub deleted_locally_at: Option<i64>,
    /// Preview of the newest message, display only
    pub last_message_preview: Option<String>,
    /// Timestamp of the newest message, display only
    pub last_message_at: Option<i64>,
}

impl Chat {
    /// Create a new active chat owned by `owner_id`
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>, is_incognito: bool) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            is_incognito,
            archived_at: None,
            deleted_locally_at: None,
            last_message_preview: None,
            last_message_at: None,
        }
    }

    /// Bump `updated_at` to the current wall clock.
    ///
    /// `updated_at` is monotonic: if the clock reads at or before the
    /// stored value the stamp advances by one millisecond instead.
    pub fn touch(&mut self) {
        let now = now_millis();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + 1
        };
    }

    /// Whether the chat sits in the local trash
    pub fn is_trashed(&self) -> bool {
        self.deleted_locally_at.is_some()
    }

    /// Clear local trash/archive markers (used when a cloud copy revives
    /// a locally trashed chat)
    pub fn revive_locally(&mut self) {
        self.deleted_locally_at = None;
        self.archived_at = None;
    }

    /// Build the cloud projection of this chat.
    ///
    /// `cloud_deleted_at` is a cloud-side lifecycle field and starts
    /// clear; soft-deleting in the cloud is an explicit engine call.
    pub fn to_cloud(&self) -> CloudChat {
        CloudChat {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            archived_at: self.archived_at,
            cloud_deleted_at: None,
            last_message_preview: self.last_message_preview.clone(),
            last_message_at: self.last_message_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatRole {
    /// The human user
    User,
    /// The model/assistant
    Model,
}

impl ChatRole {
    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "model" => Some(Self::Model),
            _ => None,
        }
    }
}

/// A message as stored on-device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id (UUID)
    pub id: String,
    /// Owning chat; must reference an existing chat with the same owner
    pub chat_id: String,
    /// Owner scope (same as the owning chat's)
    pub owner_id: String,
    /// Author role
    pub role: ChatRole,
    /// Full message body
    pub text: String,
    /// Creation time (Unix ms)
    pub created_at: i64,
    /// Last edit time, if edited
    pub updated_at: Option<i64>,
    /// Mirrors the owning chat's incognito state at write time. Used to
    /// skip the row during full-upload scans even if the chat flag later
    /// changes; chat-level dedupe corrects on the next push.
    pub local_only: bool,
    /// Soft delete at message granularity
    pub deleted_at: Option<i64>,
}

impl Message {
    /// Create a new message in `chat_id`
    pub fn new(
        chat_id: impl Into<String>,
        owner_id: impl Into<String>,
        role: ChatRole,
        text: impl Into<String>,
        local_only: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            owner_id: owner_id.into(),
            role,
            text: text.into(),
            created_at: now_millis(),
            updated_at: None,
            local_only,
            deleted_at: None,
        }
    }

    /// Whether the message is soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Cloud projections
// ---------------------------------------------------------------------------

/// The Mirror Store's chat document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudChat {
    /// Same id as the local chat
    pub id: String,
    /// Owner scope
    pub owner_id: String,
    /// Display title
    pub title: String,
    /// Creation time (Unix ms)
    pub created_at: i64,
    /// Last modification time (Unix ms), compared against the local copy
    /// during restore
    pub updated_at: i64,
    /// Archive marker mirrored from the local copy
    pub archived_at: Option<i64>,
    /// Cloud-side soft delete; independent of the local trash
    pub cloud_deleted_at: Option<i64>,
    /// Preview of the newest message, display only
    pub last_message_preview: Option<String>,
    /// Timestamp of the newest message, display only
    pub last_message_at: Option<i64>,
}

impl CloudChat {
    /// Whether the chat is soft-deleted in the cloud
    pub fn is_deleted(&self) -> bool {
        self.cloud_deleted_at.is_some()
    }

    /// Materialize a local chat from this projection.
    ///
    /// The result is active (no trash/archive markers beyond the mirrored
    /// archive state) and never incognito: a chat that reached the cloud
    /// was, by definition, not local-only.
    pub fn to_local(&self) -> Chat {
        Chat {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_incognito: false,
            archived_at: self.archived_at,
            deleted_locally_at: None,
            last_message_preview: self.last_message_preview.clone(),
            last_message_at: self.last_message_at,
        }
    }

    /// Build the listing summary used by restore-picker UIs
    pub fn summary(&self) -> CloudChatSummary {
        CloudChatSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at,
            last_message_at: self.last_message_at,
            last_message_preview: self.last_message_preview.clone(),
            cloud_deleted_at: self.cloud_deleted_at,
        }
    }
}

/// The Mirror Store's message document.
///
/// Long bodies are stored split: a bounded `text_head` inline plus an
/// external chunk blob keyed by `(chat_id, message_id)`. When
/// `has_chunks` is false, `text_head` is the full text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudMessage {
    /// Same id as the local message
    pub id: String,
    /// Owning chat document
    pub chat_id: String,
    /// Owner scope
    pub owner_id: String,
    /// Author role
    pub role: ChatRole,
    /// Full text, or a bounded prefix when `has_chunks` is true
    pub text_head: String,
    /// Whether the remainder lives in an external chunk blob
    pub has_chunks: bool,
    /// Creation time (Unix ms); also the pagination sort key
    pub created_at: i64,
    /// Last edit time, if edited
    pub updated_at: Option<i64>,
    /// Soft delete at message granularity
    pub deleted_at: Option<i64>,
}

impl CloudMessage {
    /// Whether the message is soft-deleted in the cloud
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Materialize a local message with the given full `text`.
    ///
    /// Local delete markers are cleared (restore revives) unless the
    /// caller explicitly keeps the cloud soft-delete marker.
    pub fn to_local(&self, text: String, keep_deleted_marker: bool) -> Message {
        Message {
            id: self.id.clone(),
            chat_id: self.chat_id.clone(),
            owner_id: self.owner_id.clone(),
            role: self.role,
            text,
            created_at: self.created_at,
            updated_at: self.updated_at,
            local_only: false,
            deleted_at: if keep_deleted_marker { self.deleted_at } else { None },
        }
    }
}

/// Lightweight listing entry for restore-picker UIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudChatSummary {
    /// Chat id
    pub id: String,
    /// Display title
    pub title: String,
    /// Last modification time (Unix ms)
    pub updated_at: i64,
    /// Timestamp of the newest message
    pub last_message_at: Option<i64>,
    /// Preview of the newest message
    pub last_message_preview: Option<String>,
    /// Cloud soft-delete marker, shown so the picker can offer revive
    pub cloud_deleted_at: Option<i64>,
}

// ============================================================================
// TESTS
// ============================================================================
