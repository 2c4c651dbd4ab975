//! # Database Schema
//!
//! SQL schema definitions for the reference Local Store.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │        chats         │        │       messages       │              │
//! │  ├──────────────────────┤        ├──────────────────────┤              │
//! │  │ id                   │◄───────│ chat_id              │              │
//! │  │ owner_id             │        │ id                   │              │
//! │  │ title                │        │ owner_id             │              │
//! │  │ created_at           │        │ role                 │              │
//! │  │ updated_at           │        │ text                 │              │
//! │  │ is_incognito         │        │ created_at           │              │
//! │  │ archived_at          │        │ updated_at           │              │
//! │  │ deleted_locally_at   │        │ local_only           │              │
//! │  │ last_message_preview │        │ deleted_at           │              │
//! │  │ last_message_at      │        └──────────────────────┘              │
//! │  └──────────────────────┘                                              │
//! │                                                                         │
//! │  ┌──────────────────────┐                                              │
//! │  │       settings       │   key/value; sync toggle and last-sync       │
//! │  ├──────────────────────┤   stats (stats stored as JSON)               │
//! │  │ key                  │                                              │
//! │  │ value                │                                              │
//! │  └──────────────────────┘                                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Chats table
-- The authoritative copy of every conversation on this device
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    -- Owner scope: signed-in user id or the reserved guest id
    owner_id TEXT NOT NULL,
    -- Display title
    title TEXT NOT NULL,
    -- When the chat was created (Unix ms)
    created_at INTEGER NOT NULL,
    -- Last modification (Unix ms, monotonic); LWW tie-break input
    updated_at INTEGER NOT NULL,
    -- Local-only flag; incognito chats never reach the mirror
    is_incognito INTEGER NOT NULL DEFAULT 0,
    -- Archive marker
    archived_at INTEGER,
    -- Local trash marker (soft delete)
    deleted_locally_at INTEGER,
    -- Display-only preview of the newest message
    last_message_preview TEXT,
    -- Display-only timestamp of the newest message
    last_message_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_chats_owner ON chats(owner_id, updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_chats_trashed ON chats(owner_id) WHERE deleted_locally_at IS NOT NULL;

-- Messages table
-- Message rows reference their owning chat and carry their own
-- soft-delete marker
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    -- Which chat this belongs to
    chat_id TEXT NOT NULL,
    -- Owner scope (same as the owning chat's)
    owner_id TEXT NOT NULL,
    -- Author role: 'user' or 'model'
    role TEXT NOT NULL,
    -- Full message body
    text TEXT NOT NULL,
    -- When the message was created (Unix ms); ordering key within a chat
    created_at INTEGER NOT NULL,
    -- Last edit (Unix ms)
    updated_at INTEGER,
    -- Snapshot of the chat's incognito state at write time
    local_only INTEGER NOT NULL DEFAULT 0,
    -- Soft delete marker
    deleted_at INTEGER,
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_owner ON messages(owner_id);

-- Settings table
-- Key/value storage for sync preferences and last-sync bookkeeping
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
