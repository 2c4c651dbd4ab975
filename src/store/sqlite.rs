//! # SQLite Store
//!
//! Reference [`LocalStore`] implementation on rusqlite. Also implements
//! [`SettingsStore`], keeping the sync toggle and last-sync stats in the
//! same database file as the chats.
//!
//! The connection lives behind an `Arc<Mutex<..>>`: SQLite serializes
//! writers anyway, and every operation here is a single statement or a
//! short statement pair, so one mutex is all the coordination needed.

use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::sync::Arc;

use super::schema;
use super::{ChatFilter, LocalStore};
use crate::error::{Error, Result};
use crate::model::{Chat, ChatRole, Message};
use crate::settings::{SettingsStore, SyncStats};

/// Settings key for the cloud sync toggle
const SETTING_CLOUD_SYNC_ENABLED: &str = "cloud_sync_enabled";

/// Settings key for the JSON-encoded stats of the last full upload
const SETTING_LAST_SYNC_STATS: &str = "last_sync_stats";

/// SQLite-backed Local Store
pub struct SqliteStore {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database.
    ///
    /// If `path` is None, creates an in-memory database (useful for
    /// testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory()
                .map_err(|e| Error::Database(format!("Failed to create in-memory database: {}", e)))?,
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::Database(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Local store schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) => {
                tracing::debug!("Local store schema version: {}", v);
            }
        }

        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(format!("Failed to read setting: {}", e))),
        }
    }

    fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| Error::Database(format!("Failed to write setting: {}", e)))?;

        Ok(())
    }

    fn read_last_sync_stats(&self) -> Result<Option<SyncStats>> {
        match self.get_setting(SETTING_LAST_SYNC_STATS)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_last_sync_stats(&self, stats: SyncStats) -> Result<()> {
        let json = serde_json::to_string(&stats)?;
        self.put_setting(SETTING_LAST_SYNC_STATS, &json)
    }
}

// ---------------------------------------------------------------------------
// SettingsStore implementation
// ---------------------------------------------------------------------------

/// The store doubles as the persisted [`SettingsStore`]: the toggle and
/// the last-sync stats live in the same database file as the chats they
/// describe. Stats are stored as a JSON value under a single settings key.
///
/// The trait surface is infallible, so storage failures here are logged
/// and read back as the absent/disabled state.
impl SettingsStore for SqliteStore {
    fn cloud_sync_enabled(&self) -> bool {
        match self.get_setting(SETTING_CLOUD_SYNC_ENABLED) {
            Ok(value) => value.as_deref() == Some("1"),
            Err(e) => {
                tracing::warn!("Failed to read sync toggle: {}", e);
                false
            }
        }
    }

    fn set_cloud_sync_enabled(&self, enabled: bool) {
        let value = if enabled { "1" } else { "0" };
        if let Err(e) = self.put_setting(SETTING_CLOUD_SYNC_ENABLED, value) {
            tracing::warn!("Failed to persist sync toggle: {}", e);
        }
    }

    fn set_last_sync_stats(&self, stats: SyncStats) {
        if let Err(e) = self.write_last_sync_stats(stats) {
            tracing::warn!("Failed to persist last-sync stats: {}", e);
        }
    }

    fn last_sync_stats(&self) -> Option<SyncStats> {
        match self.read_last_sync_stats() {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("Failed to read last-sync stats: {}", e);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn map_chat_row(row: &Row<'_>) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        is_incognito: row.get::<_, i64>(5)? != 0,
        archived_at: row.get(6)?,
        deleted_locally_at: row.get(7)?,
        last_message_preview: row.get(8)?,
        last_message_at: row.get(9)?,
    })
}

const CHAT_COLUMNS: &str = "id, owner_id, title, created_at, updated_at, is_incognito, \
     archived_at, deleted_locally_at, last_message_preview, last_message_at";

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role_str: String = row.get(3)?;
    let role = ChatRole::from_str(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown role '{}'", role_str).into(),
        )
    })?;

    Ok(Message {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        owner_id: row.get(2)?,
        role,
        text: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        local_only: row.get::<_, i64>(7)? != 0,
        deleted_at: row.get(8)?,
    })
}

const MESSAGE_COLUMNS: &str =
    "id, chat_id, owner_id, role, text, created_at, updated_at, local_only, deleted_at";

// ---------------------------------------------------------------------------
// LocalStore implementation
// ---------------------------------------------------------------------------

impl LocalStore for SqliteStore {
    fn upsert_chat(&self, chat: &Chat) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO chats (id, owner_id, title, created_at, updated_at, is_incognito,
                                archived_at, deleted_locally_at, last_message_preview, last_message_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                title = excluded.title,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                is_incognito = excluded.is_incognito,
                archived_at = excluded.archived_at,
                deleted_locally_at = excluded.deleted_locally_at,
                last_message_preview = excluded.last_message_preview,
                last_message_at = excluded.last_message_at",
            params![
                chat.id,
                chat.owner_id,
                chat.title,
                chat.created_at,
                chat.updated_at,
                chat.is_incognito as i64,
                chat.archived_at,
                chat.deleted_locally_at,
                chat.last_message_preview,
                chat.last_message_at,
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to upsert chat: {}", e)))?;

        Ok(())
    }

    fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            &format!("SELECT {} FROM chats WHERE id = ?", CHAT_COLUMNS),
            params![id],
            map_chat_row,
        );

        match result {
            Ok(chat) => Ok(Some(chat)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(format!("Failed to get chat: {}", e))),
        }
    }

    fn list_chats(&self, owner_id: &str, filter: ChatFilter) -> Result<Vec<Chat>> {
        let condition = match filter {
            ChatFilter::Active => "AND archived_at IS NULL AND deleted_locally_at IS NULL",
            ChatFilter::Archived => "AND archived_at IS NOT NULL AND deleted_locally_at IS NULL",
            ChatFilter::Trashed => "AND deleted_locally_at IS NOT NULL",
            ChatFilter::All => "",
        };

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM chats WHERE owner_id = ? {} ORDER BY updated_at DESC",
                CHAT_COLUMNS, condition
            ))
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![owner_id], map_chat_row)
            .map_err(|e| Error::Database(format!("Failed to query chats: {}", e)))?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(row.map_err(|e| Error::Database(format!("Failed to read chat: {}", e)))?);
        }

        Ok(chats)
    }

    fn upsert_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO messages (id, chat_id, owner_id, role, text, created_at,
                                   updated_at, local_only, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                chat_id = excluded.chat_id,
                owner_id = excluded.owner_id,
                role = excluded.role,
                text = excluded.text,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                local_only = excluded.local_only,
                deleted_at = excluded.deleted_at",
            params![
                message.id,
                message.chat_id,
                message.owner_id,
                message.role.as_str(),
                message.text,
                message.created_at,
                message.updated_at,
                message.local_only as i64,
                message.deleted_at,
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to upsert message: {}", e)))?;

        Ok(())
    }

    fn get_message(&self, id: &str) -> Result<Option<Message>> {
        let conn = self.conn.lock();

        let result = conn.query_row(
            &format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS),
            params![id],
            map_message_row,
        );

        match result {
            Ok(message) => Ok(Some(message)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(format!("Failed to get message: {}", e))),
        }
    }

    fn messages_for_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM messages WHERE chat_id = ? ORDER BY created_at, id",
                MESSAGE_COLUMNS
            ))
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![chat_id], map_message_row)
            .map_err(|e| Error::Database(format!("Failed to query messages: {}", e)))?;

        let mut messages = Vec::new();
        for row in rows {
            messages
                .push(row.map_err(|e| Error::Database(format!("Failed to read message: {}", e)))?);
        }

        Ok(messages)
    }

    fn clear_local_only(&self, chat_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE messages SET local_only = 0 WHERE chat_id = ? AND local_only = 1",
                params![chat_id],
            )
            .map_err(|e| Error::Database(format!("Failed to clear local_only flags: {}", e)))?;

        Ok(rows)
    }

    fn archive_chat(&self, id: &str, at: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("UPDATE chats SET archived_at = ? WHERE id = ?", params![at, id])
            .map_err(|e| Error::Database(format!("Failed to archive chat: {}", e)))?;
        Ok(rows > 0)
    }

    fn unarchive_chat(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("UPDATE chats SET archived_at = NULL WHERE id = ?", params![id])
            .map_err(|e| Error::Database(format!("Failed to unarchive chat: {}", e)))?;
        Ok(rows > 0)
    }

    fn trash_chat(&self, id: &str, at: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE chats SET deleted_locally_at = ? WHERE id = ?",
                params![at, id],
            )
            .map_err(|e| Error::Database(format!("Failed to trash chat: {}", e)))?;
        Ok(rows > 0)
    }

    fn restore_chat_from_trash(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE chats SET deleted_locally_at = NULL WHERE id = ?",
                params![id],
            )
            .map_err(|e| Error::Database(format!("Failed to restore chat: {}", e)))?;
        Ok(rows > 0)
    }

    fn delete_chat_forever(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();

        // Messages first; the FK cascade only applies when SQLite foreign
        // key enforcement is enabled, which we do not rely on.
        conn.execute("DELETE FROM messages WHERE chat_id = ?", params![id])
            .map_err(|e| Error::Database(format!("Failed to delete chat messages: {}", e)))?;

        let rows = conn
            .execute("DELETE FROM chats WHERE id = ?", params![id])
            .map_err(|e| Error::Database(format!("Failed to delete chat: {}", e)))?;

        Ok(rows > 0)
    }

    fn soft_delete_message(&self, id: &str, at: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE messages SET deleted_at = ? WHERE id = ?",
                params![at, id],
            )
            .map_err(|e| Error::Database(format!("Failed to soft-delete message: {}", e)))?;
        Ok(rows > 0)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chat, ChatRole, Message};

    fn store() -> SqliteStore {
        SqliteStore::open(None).unwrap()
    }

    fn chat(owner: &str) -> Chat {
        Chat::new(owner, "Test chat", false)
    }

    #[test]
    fn test_chat_round_trip() {
        let store = store();
        let mut c = chat("user-1");
        c.last_message_preview = Some("hi there".into());

        store.upsert_chat(&c).unwrap();
        let loaded = store.get_chat(&c.id).unwrap().unwrap();

        assert_eq!(loaded.id, c.id);
        assert_eq!(loaded.title, "Test chat");
        assert_eq!(loaded.last_message_preview.as_deref(), Some("hi there"));
        assert!(!loaded.is_incognito);
    }

    #[test]
    fn test_upsert_chat_is_idempotent() {
        let store = store();
        let mut c = chat("user-1");

        store.upsert_chat(&c).unwrap();
        c.title = "Renamed".into();
        store.upsert_chat(&c).unwrap();

        let all = store.list_chats("user-1", ChatFilter::All).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Renamed");
    }

    #[test]
    fn test_get_missing_chat_is_none() {
        let store = store();
        assert!(store.get_chat("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_chats_filters() {
        let store = store();

        let active = chat("user-1");
        let mut archived = chat("user-1");
        archived.archived_at = Some(100);
        let mut trashed = chat("user-1");
        trashed.deleted_locally_at = Some(200);
        let other_owner = chat("user-2");

        for c in [&active, &archived, &trashed, &other_owner] {
            store.upsert_chat(c).unwrap();
        }

        let got = store.list_chats("user-1", ChatFilter::Active).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, active.id);

        let got = store.list_chats("user-1", ChatFilter::Archived).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, archived.id);

        let got = store.list_chats("user-1", ChatFilter::Trashed).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, trashed.id);

        assert_eq!(store.list_chats("user-1", ChatFilter::All).unwrap().len(), 3);
    }

    #[test]
    fn test_message_round_trip_and_ordering() {
        let store = store();
        let c = chat("user-1");
        store.upsert_chat(&c).unwrap();

        let mut m1 = Message::new(&c.id, "user-1", ChatRole::User, "first", false);
        m1.created_at = 1000;
        let mut m2 = Message::new(&c.id, "user-1", ChatRole::Model, "second", false);
        m2.created_at = 2000;

        // Insert out of order; the listing must come back oldest first
        store.upsert_message(&m2).unwrap();
        store.upsert_message(&m1).unwrap();

        let msgs = store.messages_for_chat(&c.id).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].text, "first");
        assert_eq!(msgs[1].text, "second");
        assert_eq!(msgs[1].role, ChatRole::Model);
    }

    #[test]
    fn test_clear_local_only() {
        let store = store();
        let c = chat("user-1");
        store.upsert_chat(&c).unwrap();

        for i in 0..3 {
            let m = Message::new(&c.id, "user-1", ChatRole::User, format!("m{}", i), true);
            store.upsert_message(&m).unwrap();
        }

        assert_eq!(store.clear_local_only(&c.id).unwrap(), 3);
        assert!(store
            .messages_for_chat(&c.id)
            .unwrap()
            .iter()
            .all(|m| !m.local_only));

        // Second call flips nothing
        assert_eq!(store.clear_local_only(&c.id).unwrap(), 0);
    }

    #[test]
    fn test_trash_and_restore() {
        let store = store();
        let c = chat("user-1");
        store.upsert_chat(&c).unwrap();

        assert!(store.trash_chat(&c.id, 5000).unwrap());
        assert_eq!(
            store.get_chat(&c.id).unwrap().unwrap().deleted_locally_at,
            Some(5000)
        );

        assert!(store.restore_chat_from_trash(&c.id).unwrap());
        assert!(store.get_chat(&c.id).unwrap().unwrap().deleted_locally_at.is_none());

        assert!(!store.trash_chat("missing", 5000).unwrap());
    }

    #[test]
    fn test_delete_forever_removes_messages() {
        let store = store();
        let c = chat("user-1");
        store.upsert_chat(&c).unwrap();
        let m = Message::new(&c.id, "user-1", ChatRole::User, "bye", false);
        store.upsert_message(&m).unwrap();

        assert!(store.delete_chat_forever(&c.id).unwrap());
        assert!(store.get_chat(&c.id).unwrap().is_none());
        assert!(store.messages_for_chat(&c.id).unwrap().is_empty());
    }

    #[test]
    fn test_soft_delete_message() {
        let store = store();
        let c = chat("user-1");
        store.upsert_chat(&c).unwrap();
        let m = Message::new(&c.id, "user-1", ChatRole::User, "oops", false);
        store.upsert_message(&m).unwrap();

        assert!(store.soft_delete_message(&m.id, 7000).unwrap());
        assert_eq!(
            store.get_message(&m.id).unwrap().unwrap().deleted_at,
            Some(7000)
        );
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.db");
        let path = path.to_str().unwrap();

        let c = chat("user-1");
        {
            let store = SqliteStore::open(Some(path)).unwrap();
            store.upsert_chat(&c).unwrap();
        }

        let store = SqliteStore::open(Some(path)).unwrap();
        assert!(store.get_chat(&c.id).unwrap().is_some());
    }

    #[test]
    fn test_settings_round_trip() {
        let store = store();

        assert!(!store.cloud_sync_enabled());
        store.set_cloud_sync_enabled(true);
        assert!(store.cloud_sync_enabled());
        store.set_cloud_sync_enabled(false);
        assert!(!store.cloud_sync_enabled());

        assert!(store.last_sync_stats().is_none());
        store.set_last_sync_stats(SyncStats {
            chat_count: 3,
            message_count: 12,
            timestamp: 999,
        });
        let stats = store.last_sync_stats().unwrap();
        assert_eq!(stats.chat_count, 3);
        assert_eq!(stats.message_count, 12);
    }

    #[test]
    fn test_settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(Some(path)).unwrap();
            store.set_cloud_sync_enabled(true);
            store.set_last_sync_stats(SyncStats {
                chat_count: 1,
                message_count: 4,
                timestamp: 42,
            });
        }

        let store = SqliteStore::open(Some(path)).unwrap();
        assert!(store.cloud_sync_enabled());
        assert_eq!(store.last_sync_stats().unwrap().timestamp, 42);
    }

    #[test]
    fn test_corrupt_stats_row_reads_as_none() {
        let store = store();
        store.put_setting(SETTING_LAST_SYNC_STATS, "not json").unwrap();

        assert!(store.last_sync_stats().is_none());
    }
}
