//! # Settings
//!
//! Persisted sync preferences and last-sync bookkeeping.
//!
//! The "cloud sync enabled" toggle is one half of the sync-enabled
//! predicate (the other is a signed-in user); it is read fresh on every
//! operation, never cached by the sync core.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Stats recorded after a successful full upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Chats pushed
    pub chat_count: usize,
    /// Messages pushed across those chats
    pub message_count: usize,
    /// When the upload finished (Unix ms)
    pub timestamp: i64,
}

/// Settings collaborator consumed by the sync core
pub trait SettingsStore: Send + Sync {
    /// Whether the user has cloud sync switched on
    fn cloud_sync_enabled(&self) -> bool;

    /// Flip the cloud sync toggle
    fn set_cloud_sync_enabled(&self, enabled: bool);

    /// Record the outcome of a successful full upload
    fn set_last_sync_stats(&self, stats: SyncStats);

    /// Stats of the most recent successful full upload, if any
    fn last_sync_stats(&self) -> Option<SyncStats>;
}

/// In-process settings, for tests and embedding applications that persist
/// preferences elsewhere
#[derive(Default)]
pub struct MemorySettings {
    sync_enabled: RwLock<bool>,
    last_stats: RwLock<Option<SyncStats>>,
}

impl MemorySettings {
    /// Start with sync disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with sync enabled
    pub fn sync_on() -> Self {
        Self {
            sync_enabled: RwLock::new(true),
            last_stats: RwLock::new(None),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn cloud_sync_enabled(&self) -> bool {
        *self.sync_enabled.read()
    }

    fn set_cloud_sync_enabled(&self, enabled: bool) {
        *self.sync_enabled.write() = enabled;
    }

    fn set_last_sync_stats(&self, stats: SyncStats) {
        *self.last_stats.write() = Some(stats);
    }

    fn last_sync_stats(&self) -> Option<SyncStats> {
        *self.last_stats.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_and_stats() {
        let settings = MemorySettings::new();
        assert!(!settings.cloud_sync_enabled());

        settings.set_cloud_sync_enabled(true);
        assert!(settings.cloud_sync_enabled());

        assert!(settings.last_sync_stats().is_none());
        settings.set_last_sync_stats(SyncStats {
            chat_count: 2,
            message_count: 9,
            timestamp: 1234,
        });
        assert_eq!(settings.last_sync_stats().unwrap().message_count, 9);
    }
}
